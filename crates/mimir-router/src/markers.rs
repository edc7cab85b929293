// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intent marker tables and matching.
//!
//! Latin-script markers match whole words (a multi-word marker must appear
//! as a contiguous word sequence). CJK markers match as substrings since
//! those scripts do not separate words with spaces.

/// Recall and self-reference phrases (case-insensitive). Any one of these
/// marks a query as episodic.
pub const EPISODIC_MARKERS: &[&str] = &[
    // English
    "remember", "remind me", "you said", "i said", "i told you", "i mentioned",
    "we discussed", "we talked about", "about me", "my",
    // Indonesian
    "ingat", "ingatkan", "kamu bilang", "aku bilang", "saya bilang",
    "pernah bilang", "saya sebutkan", "tentang saya", "punya saya", "kesukaan saya",
    // Spanish
    "recuerdas", "recuerda", "acuérdate", "dijiste", "te dije", "mencioné",
    "hablamos", "mi", "mis",
    // French
    "souviens", "rappelle", "tu as dit", "je t'ai dit", "j'ai mentionné",
    "mon", "ma", "mes",
    // German
    "erinnerst", "erinnere", "du hast gesagt", "ich habe dir gesagt",
    "ich sagte", "mein", "meine", "meinen", "meiner",
    // Portuguese
    "lembra", "lembras", "lembre", "você disse", "eu disse", "eu te disse",
    "mencionei", "meu", "minha", "meus", "minhas",
    // Chinese
    "记得", "你说过", "我说过", "我告诉过你", "我的",
    // Japanese
    "覚えて", "言ったこと", "話したこと", "私の", "僕の",
];

/// Time and recall words that are everyday vocabulary on their own
/// ("precision vs recall", "earlier versions", "目の前に"). They mark a
/// query as episodic only when it also contains a [`PERSONAL_PRONOUNS`]
/// entry.
pub const CONTEXTUAL_EPISODIC_MARKERS: &[&str] = &[
    // English
    "recall", "earlier", "previously", "last time",
    // Indonesian
    "tadi", "sebelumnya", "kemarin",
    // Spanish
    "la última vez", "antes",
    // French
    "tout à l'heure", "plus tôt",
    // German
    "vorhin", "letztes mal",
    // Portuguese
    "da última vez",
    // Chinese
    "之前", "刚才", "上次",
    // Japanese
    "さっき", "前に",
];

/// First and second person pronouns that tie a contextual marker to the
/// conversation.
pub const PERSONAL_PRONOUNS: &[&str] = &[
    // English
    "i", "me", "you", "we", "us",
    // Indonesian
    "aku", "saya", "kamu", "kita", "kami", "anda",
    // Spanish
    "yo", "tú", "te", "nosotros",
    // French
    "je", "j", "tu", "moi", "toi", "nous", "vous",
    // German
    "ich", "du", "mir", "mich", "dir", "dich", "wir", "uns",
    // Portuguese
    "eu", "você", "voce", "nós",
    // Chinese
    "我", "你",
    // Japanese
    "私", "僕", "あなた",
];

/// Definition and how-to phrases (case-insensitive).
pub const KNOWLEDGE_MARKERS: &[&str] = &[
    // English
    "what is", "what are", "what does", "explain", "how to", "how do",
    "how does", "define", "definition of", "meaning of", "tell me about",
    "difference between", "why does",
    // Indonesian
    "apa itu", "apa yang dimaksud", "jelaskan", "bagaimana cara", "pengertian",
    "definisi", "mengapa", "kenapa",
    // Spanish
    "qué es", "que es", "qué son", "explica", "explícame", "cómo se",
    "cómo hacer", "definición de", "qué significa",
    // French
    "qu'est-ce que", "qu'est-ce qu", "c'est quoi", "explique", "expliquez",
    "comment faire", "comment fonctionne", "définition de",
    // German
    "was ist", "was sind", "erkläre", "erklär", "erklären sie", "wie funktioniert",
    "wie man", "definition von",
    // Portuguese
    "o que é", "o que são", "explique", "explica", "como fazer", "como funciona",
    "definição de", "o que significa",
    // Chinese
    "什么是", "是什么", "解释", "如何", "怎么", "为什么", "定义",
    // Japanese
    "とは", "説明して", "教えて", "方法", "仕組み", "なぜ",
];

/// A compiled marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// Contiguous lowercase word sequence.
    Words(Vec<String>),
    /// Raw substring (CJK scripts).
    Substring(String),
}

impl Marker {
    /// Compile a marker phrase. Returns `None` for phrases with no content.
    pub fn compile(phrase: &str) -> Option<Self> {
        let lower = phrase.trim().to_lowercase();
        if lower.is_empty() {
            return None;
        }
        if lower.chars().any(is_cjk) {
            return Some(Self::Substring(lower));
        }
        let words = tokenize(&lower);
        if words.is_empty() {
            None
        } else {
            Some(Self::Words(words))
        }
    }

    /// Whether this marker occurs in a query, given its lowercase text and
    /// its word tokens.
    pub fn matches(&self, lower: &str, words: &[String]) -> bool {
        match self {
            Self::Substring(s) => lower.contains(s.as_str()),
            Self::Words(seq) => {
                !seq.is_empty()
                    && words.len() >= seq.len()
                    && words.windows(seq.len()).any(|w| w == seq.as_slice())
            }
        }
    }

    /// Human-readable form for logging.
    pub fn phrase(&self) -> String {
        match self {
            Self::Substring(s) => s.clone(),
            Self::Words(seq) => seq.join(" "),
        }
    }
}

/// Split lowercase text into alphanumeric word tokens.
///
/// Apostrophes and hyphens split words, so "qu'est-ce" becomes
/// `["qu", "est", "ce"]` on both the marker and the query side.
pub fn tokenize(lower: &str) -> Vec<String> {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Han, Hiragana, Katakana and CJK punctuation/compatibility blocks.
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3000}'..='\u{303F}'
        | '\u{3040}'..='\u{309F}'
        | '\u{30A0}'..='\u{30FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FF66}'..='\u{FF9F}'
    )
}

//! Whole-word phrase matching over normalized customer text
//!
//! Both keyword rules and escalation lexicons match on word boundaries:
//! text is lower-cased and every non-alphanumeric character becomes a
//! separator, so `"I'm"` matches the phrase `"i m"` and `"hell"` never
//! matches inside `"hello"`.

/// Customer text reduced to space-separated lowercase words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    /// Words joined by single spaces, padded with one space on each side
    padded: String,
}

impl NormalizedText {
    pub fn new(text: &str) -> Self {
        Self {
            padded: format!(" {} ", normalize(text)),
        }
    }

    /// Whether the normalized text has no words at all.
    pub fn is_empty(&self) -> bool {
        self.padded.trim().is_empty()
    }

    /// Normalized text without the boundary padding.
    pub fn as_str(&self) -> &str {
        self.padded.trim()
    }

    /// Whether an already-normalized phrase occurs on word boundaries.
    fn contains_phrase(&self, phrase: &str) -> bool {
        !phrase.is_empty() && self.padded.contains(&format!(" {} ", phrase))
    }
}

/// Lower-case and split on anything that is not alphanumeric.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// An ordered set of phrases matched on word boundaries.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    /// Normalized phrases, deduplicated, declaration order preserved
    phrases: Vec<String>,
}

impl Lexicon {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for phrase in phrases {
            let normalized = normalize(phrase.as_ref());
            if !normalized.is_empty() && !out.contains(&normalized) {
                out.push(normalized);
            }
        }
        Self { phrases: out }
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    /// First phrase (in declaration order) present in the text.
    pub fn first_match(&self, text: &NormalizedText) -> Option<&str> {
        self.phrases
            .iter()
            .find(|p| text.contains_phrase(p))
            .map(String::as_str)
    }

    pub fn matches(&self, text: &NormalizedText) -> bool {
        self.first_match(text).is_some()
    }
}

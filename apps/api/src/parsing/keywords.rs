//! Keyword lists that drive the line-shape heuristics.
//!
//! Defaults are UK-biased. Deployments can extend (never replace) them via
//! `ROLE_KEYWORDS` / `LOCALITY_KEYWORDS`, see `Config`.

/// Words that mark a line as a role title.
pub const DEFAULT_ROLE_KEYWORDS: &[&str] = &[
    "manager",
    "analyst",
    "engineer",
    "consultant",
    "officer",
    "specialist",
    "assistant",
    "developer",
    "director",
    "executive",
    "coordinator",
    "administrator",
    "lead",
    "designer",
    "advisor",
    "associate",
    "supervisor",
    "technician",
    "intern",
    "tutor",
    "teacher",
    "head of",
];

/// Tokens that mark a header line as the contact line.
pub const DEFAULT_LOCALITY_KEYWORDS: &[&str] = &["linkedin", "london", "uk"];

/// Immutable keyword configuration shared by the segmenter and tokenizers.
#[derive(Debug, Clone)]
pub struct Heuristics {
    role_keywords: Vec<Vec<String>>,
    locality_keywords: Vec<Vec<String>>,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self::new(&[], &[])
    }
}

impl Heuristics {
    /// Builds the keyword sets from the defaults plus any extra entries.
    pub fn new(extra_roles: &[String], extra_localities: &[String]) -> Self {
        Self {
            role_keywords: phrase_set(DEFAULT_ROLE_KEYWORDS, extra_roles),
            locality_keywords: phrase_set(DEFAULT_LOCALITY_KEYWORDS, extra_localities),
        }
    }

    pub fn is_role_title(&self, line: &str) -> bool {
        let tokens = word_tokens(line);
        self.role_keywords
            .iter()
            .any(|phrase| contains_phrase(&tokens, phrase))
    }

    pub fn has_locality(&self, line: &str) -> bool {
        let tokens = word_tokens(line);
        self.locality_keywords
            .iter()
            .any(|phrase| contains_phrase(&tokens, phrase))
    }
}

fn phrase_set(defaults: &[&str], extra: &[String]) -> Vec<Vec<String>> {
    let mut phrases: Vec<Vec<String>> = Vec::new();
    for raw in defaults.iter().copied().chain(extra.iter().map(String::as_str)) {
        let words = word_tokens(raw);
        if !words.is_empty() && !phrases.contains(&words) {
            phrases.push(words);
        }
    }
    phrases
}

/// Lowercased alphanumeric words. Hyphens and apostrophes stay inside words.
pub fn word_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '\''))
        .map(|w| w.trim_matches(|c| c == '-' || c == '\''))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// True when `phrase` appears as a contiguous run of whole words in `tokens`.
pub fn contains_phrase<S: AsRef<str>>(tokens: &[String], phrase: &[S]) -> bool {
    if phrase.is_empty() || phrase.len() > tokens.len() {
        return false;
    }
    tokens.windows(phrase.len()).any(|window| {
        window
            .iter()
            .zip(phrase)
            .all(|(token, word)| token == word.as_ref())
    })
}

use regex::Regex;

/// Canonicalizes passage text before any comparison.
#[derive(Debug, Clone)]
pub struct Normalizer {
    enabled: bool,
    whitespace_run: Regex,
}

impl Normalizer {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            whitespace_run: Regex::new(r"\s+").expect("valid whitespace run regex"),
        }
    }

    /// Lowercases, turns line breaks into spaces, collapses whitespace runs and
    /// trims. Identity when normalization is disabled.
    pub fn normalize(&self, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }

        let lowered = text.to_lowercase().replace(['\n', '\r'], " ");
        self.whitespace_run
            .replace_all(&lowered, " ")
            .trim()
            .to_string()
    }

    pub fn normalize_all(&self, passages: &[String]) -> Vec<String> {
        passages
            .iter()
            .map(|passage| self.normalize(passage))
            .collect()
    }
}

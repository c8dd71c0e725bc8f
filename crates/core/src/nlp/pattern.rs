use regex::{Captures, Regex};

/// A compiled regex that degrades to "never matches" if its source is invalid.
///
/// Every pattern in this crate is a literal checked by the module tests, so the
/// degraded branch only exists to keep extraction infallible.
#[derive(Clone, Debug)]
pub struct Pattern {
    source: &'static str,
    regex: Option<Regex>,
}

impl Pattern {
    pub fn new(source: &'static str) -> Self {
        Self { source, regex: Regex::new(source).ok() }
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|regex| regex.is_match(text))
    }

    pub fn captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.regex.as_ref().and_then(|regex| regex.captures(text))
    }

    pub fn captures_iter<'t>(&self, text: &'t str) -> Vec<Captures<'t>> {
        match &self.regex {
            Some(regex) => regex.captures_iter(text).collect(),
            None => Vec::new(),
        }
    }

    pub fn replace_all(&self, text: &str, replacement: &str) -> String {
        match &self.regex {
            Some(regex) => regex.replace_all(text, replacement).into_owned(),
            None => text.to_string(),
        }
    }
}

/// Ordered pattern table; the first matching entry wins.
#[derive(Clone, Debug)]
pub struct PatternTable<T> {
    entries: Vec<(Pattern, T)>,
}

impl<T: Copy> PatternTable<T> {
    pub fn new(entries: &[(&'static str, T)]) -> Self {
        Self {
            entries: entries.iter().map(|(source, value)| (Pattern::new(source), *value)).collect(),
        }
    }

    pub fn first_match(&self, text: &str) -> Option<T> {
        self.entries.iter().find(|(pattern, _)| pattern.is_match(text)).map(|(_, value)| *value)
    }

    pub fn invalid_sources(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|(pattern, _)| !pattern.is_valid())
            .map(|(pattern, _)| pattern.source())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Pattern, PatternTable};

    #[test]
    fn invalid_pattern_never_matches() {
        let pattern = Pattern::new("(unclosed");
        assert!(!pattern.is_valid());
        assert!(!pattern.is_match("unclosed"));
        assert_eq!(pattern.replace_all("text", "x"), "text");
    }

    #[test]
    fn table_returns_first_match_in_order() {
        let table = PatternTable::new(&[(r"\bbrut\b", 1), (r"\bdoce\b", 2)]);
        assert_eq!(table.first_match("doce brut"), Some(1));
        assert_eq!(table.first_match("bem doce"), Some(2));
        assert_eq!(table.first_match("agua"), None);
        assert!(table.invalid_sources().is_empty());
    }
}

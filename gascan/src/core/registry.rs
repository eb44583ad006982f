//! Compiled-in registry of automation files shipped in the bundle.

/// Ordered set of automation names, e.g. `ping.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AutomationRegistry {
    names: Vec<String>,
}

impl AutomationRegistry {
    /// Build from a comma-delimited list, ignoring blank items.
    pub fn from_comma_list(list: &str) -> Self {
        let names = list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        Self { names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|known| known == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Newline-delimited listing for operators.
    pub fn listing(&self) -> String {
        self.names.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_list_and_skips_blanks() {
        let registry = AutomationRegistry::from_comma_list("ping.yaml, site.yaml,,");
        assert_eq!(registry.names(), ["ping.yaml", "site.yaml"]);
        assert!(registry.contains("site.yaml"));
        assert!(!registry.contains("site"));
        assert_eq!(registry.listing(), "ping.yaml\nsite.yaml");
    }

    #[test]
    fn empty_list_contains_nothing() {
        let registry = AutomationRegistry::from_comma_list("");
        assert!(registry.names().is_empty());
        assert!(!registry.contains(""));
    }
}

//! Run-mode facets for a single invocation.
//!
//! A [`RunMode`] is a set of [`Facet`]s. `Config`, `Test` and `Deploy` combine
//! freely; `InventoryQuery`, `Extract` and `Adhoc` are terminal facets that
//! replace whatever was selected before them.

use std::fmt;

/// One independent action the invocation may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Config,
    Deploy,
    Test,
    Extract,
    InventoryQuery,
    Adhoc,
}

impl Facet {
    pub const ALL: [Facet; 6] = [
        Facet::Config,
        Facet::Test,
        Facet::Deploy,
        Facet::InventoryQuery,
        Facet::Extract,
        Facet::Adhoc,
    ];

    fn bit(self) -> u8 {
        match self {
            Facet::Config => 1 << 0,
            Facet::Deploy => 1 << 1,
            Facet::Test => 1 << 2,
            Facet::Extract => 1 << 3,
            Facet::InventoryQuery => 1 << 4,
            Facet::Adhoc => 1 << 5,
        }
    }

    /// Terminal facets short-circuit to a dedicated branch.
    pub fn is_terminal(self) -> bool {
        matches!(self, Facet::Extract | Facet::InventoryQuery | Facet::Adhoc)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Facet::Config => "config",
            Facet::Deploy => "deploy",
            Facet::Test => "test",
            Facet::Extract => "extract",
            Facet::InventoryQuery => "inventory-query",
            Facet::Adhoc => "adhoc",
        }
    }
}

/// Set of facets selected for this invocation.
///
/// The empty set is legal: the archive is extracted and nothing else runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RunMode {
    facets: u8,
}

impl RunMode {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a combinable facet.
    ///
    /// Adding to a mode that already holds a terminal facet is a no-op, and a
    /// terminal facet goes through [`RunMode::replace_with`].
    #[must_use]
    pub fn with(self, facet: Facet) -> Self {
        if facet.is_terminal() {
            return self.replace_with(facet);
        }
        if self.terminal().is_some() {
            return self;
        }
        Self {
            facets: self.facets | facet.bit(),
        }
    }

    /// Discard every selected facet and keep only `facet`.
    #[must_use]
    pub fn replace_with(self, facet: Facet) -> Self {
        Self {
            facets: facet.bit(),
        }
    }

    pub fn contains(self, facet: Facet) -> bool {
        self.facets & facet.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.facets == 0
    }

    /// The terminal facet, if this mode is a dedicated branch.
    pub fn terminal(self) -> Option<Facet> {
        Facet::ALL
            .into_iter()
            .find(|facet| facet.is_terminal() && self.contains(*facet))
    }

    /// Whether a successful run deletes its workspace.
    pub fn auto_cleanup(self) -> bool {
        !self.contains(Facet::Extract) && !self.contains(Facet::Adhoc)
    }

    pub fn facets(self) -> impl Iterator<Item = Facet> {
        Facet::ALL
            .into_iter()
            .filter(move |facet| self.contains(*facet))
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.facets().map(Facet::as_str).collect();
        f.write_str(&names.join("+"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinable_facets_accumulate() {
        let mode = RunMode::empty()
            .with(Facet::Config)
            .with(Facet::Test)
            .with(Facet::Deploy);
        assert!(mode.contains(Facet::Config));
        assert!(mode.contains(Facet::Test));
        assert!(mode.contains(Facet::Deploy));
        assert_eq!(mode.terminal(), None);
        assert!(mode.auto_cleanup());
        assert_eq!(mode.to_string(), "config+test+deploy");
    }

    #[test]
    fn terminal_facet_replaces_everything() {
        let mode = RunMode::empty()
            .with(Facet::Config)
            .with(Facet::Deploy)
            .replace_with(Facet::InventoryQuery);
        assert_eq!(mode.facets().collect::<Vec<_>>(), vec![Facet::InventoryQuery]);
        assert_eq!(mode.terminal(), Some(Facet::InventoryQuery));
    }

    #[test]
    fn combinable_facet_after_terminal_is_ignored() {
        let mode = RunMode::empty().with(Facet::Extract).with(Facet::Deploy);
        assert!(!mode.contains(Facet::Deploy));
        assert_eq!(mode.terminal(), Some(Facet::Extract));
    }

    #[test]
    fn extract_and_adhoc_disable_auto_cleanup() {
        assert!(!RunMode::empty().with(Facet::Extract).auto_cleanup());
        assert!(!RunMode::empty().with(Facet::Adhoc).auto_cleanup());
        assert!(RunMode::empty().with(Facet::InventoryQuery).auto_cleanup());
    }

    #[test]
    fn empty_mode_displays_none() {
        assert_eq!(RunMode::empty().to_string(), "none");
        assert!(RunMode::empty().is_empty());
    }
}

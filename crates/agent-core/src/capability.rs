//! Capability sets: which external collaborators a role may call

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One external operation family a role can be granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Price history and fundamentals lookups
    FinancialLookup,
    /// News and search lookups
    NewsLookup,
    /// Reads and writes against the shared context store
    ContextStore,
}

impl Capability {
    /// Kebab-case name, as used in configuration and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::FinancialLookup => "financial-lookup",
            Capability::NewsLookup => "news-lookup",
            Capability::ContextStore => "context-store",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed set of capabilities attached to a role
///
/// Checks are enforced: [`CapabilitySet::ensure`] turns a missing capability
/// into [`Error::CapabilityViolation`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a capability
    pub fn with(mut self, capability: Capability) -> Self {
        self.0.insert(capability);
        self
    }

    /// Whether the capability is granted
    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// Fail with a capability violation unless `capability` is granted
    pub fn ensure(&self, role: &str, capability: Capability) -> Result<()> {
        if self.contains(capability) {
            Ok(())
        } else {
            Err(Error::CapabilityViolation {
                role: role.to_string(),
                capability,
            })
        }
    }

    /// Iterate in a stable order
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    /// Number of granted capabilities
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is granted
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Capability::as_str).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_granted() {
        let caps = CapabilitySet::new()
            .with(Capability::NewsLookup)
            .with(Capability::ContextStore);

        assert!(caps.ensure("researcher", Capability::NewsLookup).is_ok());
        assert!(caps.ensure("researcher", Capability::ContextStore).is_ok());
    }

    #[test]
    fn test_ensure_violation() {
        let caps: CapabilitySet = [Capability::ContextStore].into_iter().collect();

        let err = caps
            .ensure("reporter", Capability::FinancialLookup)
            .unwrap_err();
        assert_eq!(
            err,
            Error::CapabilityViolation {
                role: "reporter".to_string(),
                capability: Capability::FinancialLookup,
            }
        );
    }

    #[test]
    fn test_display_is_sorted() {
        let caps = CapabilitySet::new()
            .with(Capability::ContextStore)
            .with(Capability::FinancialLookup);
        assert_eq!(caps.to_string(), "{financial-lookup, context-store}");
        assert_eq!(caps.len(), 2);
    }

    #[test]
    fn test_serde_kebab_case() {
        let json = serde_json::to_string(&Capability::NewsLookup).unwrap();
        assert_eq!(json, "\"news-lookup\"");
    }
}

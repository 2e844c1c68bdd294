//! The residue a record asks about

use std::fmt;

use amide_host::ResidueLocator;

/// Residue requested by one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisTarget {
    /// Record identifier used in messages (UniProt accession or gene tag)
    pub identifier: String,
    /// Chain filter; `None` matches any chain
    pub chain: Option<String>,
    /// Requested sequence position
    pub position: i64,
}

impl AnalysisTarget {
    /// Create a target
    pub fn new(identifier: impl Into<String>, chain: Option<String>, position: i64) -> Self {
        Self {
            identifier: identifier.into(),
            chain,
            position,
        }
    }

    /// Locator of the requested residue
    pub fn locator(&self) -> ResidueLocator {
        ResidueLocator::new(self.chain.as_deref(), self.position)
    }

    /// Same identifier and position without a chain filter
    pub fn without_chain(&self) -> Self {
        Self {
            identifier: self.identifier.clone(),
            chain: None,
            position: self.position,
        }
    }
}

/// Renders as `P68871, /A@58`
impl fmt::Display for AnalysisTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.identifier, self.locator())
    }
}

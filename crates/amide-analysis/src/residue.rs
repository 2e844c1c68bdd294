//! Residue kinds under analysis

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reference SES of asparagine in a Gly-X-Gly tripeptide, Å²
pub const ASN_REFERENCE_AREA: f64 = 90.541;

/// Reference SES of glutamine in a Gly-X-Gly tripeptide, Å²
pub const GLN_REFERENCE_AREA: f64 = 106.534;

/// Amide-bearing residue kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AmideResidue {
    /// Asparagine
    Asn,
    /// Glutamine
    Gln,
}

impl AmideResidue {
    /// Parse a three-letter residue name; `None` for anything but ASN/GLN
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "ASN" => Some(AmideResidue::Asn),
            "GLN" => Some(AmideResidue::Gln),
            _ => None,
        }
    }

    /// Three-letter residue name
    pub fn name(&self) -> &'static str {
        match self {
            AmideResidue::Asn => "ASN",
            AmideResidue::Gln => "GLN",
        }
    }

    /// Side-chain amide nitrogen atom name
    pub fn side_chain_nitrogen(&self) -> &'static str {
        match self {
            AmideResidue::Asn => "ND2",
            AmideResidue::Gln => "NE2",
        }
    }

    /// Reference area used to normalize SES
    pub fn reference_area(&self) -> f64 {
        match self {
            AmideResidue::Asn => ASN_REFERENCE_AREA,
            AmideResidue::Gln => GLN_REFERENCE_AREA,
        }
    }

    /// Relative SES: `ses / reference_area`
    pub fn rel_sesa(&self, ses: f64) -> f64 {
        ses / self.reference_area()
    }
}

impl fmt::Display for AmideResidue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Backbone carbonyl carbon atom name
pub const CARBONYL_CARBON: &str = "C";

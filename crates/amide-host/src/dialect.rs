//! Host command dialect
//!
//! Builds the command strings sent to the host interpreter. The syntax is
//! that of ChimeraX: `#model/chain:residue@atom` specifiers, `open`,
//! `alphafold fetch`, `measure area` and friends. Every specifier is scoped
//! to a model number so commands never touch another open structure.

use crate::engine::{AtomLocator, ResidueLocator, StructureSource};

/// Attribute names used to read backbone torsions
pub const PHI_ATTRIBUTE: &str = "phi";
/// See [`PHI_ATTRIBUTE`]
pub const PSI_ATTRIBUTE: &str = "psi";

/// Quote a path or name for the host, escaping embedded quotes
fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\\\""))
}

/// Whether an identifier is a plain code the host reads unquoted
fn is_bare_code(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Residue specifier such as `#1/A:58` (or `#1:58` without a chain)
pub fn residue_spec(model: u32, residue: &ResidueLocator) -> String {
    match &residue.chain {
        Some(chain) => format!("#{}/{}:{}", model, chain, residue.position),
        None => format!("#{}:{}", model, residue.position),
    }
}

/// Atom specifier such as `#1/A:58@ND2`
pub fn atom_spec(model: u32, atom: &AtomLocator) -> String {
    format!("{}@{}", residue_spec(model, &atom.residue), atom.name)
}

/// Command that opens or fetches a structure
pub fn open(source: &StructureSource) -> String {
    match source {
        StructureSource::Experimental { id } if is_bare_code(id) => format!("open {}", id),
        StructureSource::Experimental { id } => format!("open {}", quote(id)),
        StructureSource::Predicted { accession } => format!("alphafold fetch {}", accession),
        StructureSource::LocalFile { path } => format!("open {}", quote(&path.to_string_lossy())),
    }
}

/// Delete every chain of a model except one
pub fn keep_only_chain(model: u32, chain: &str) -> String {
    format!("delete #{} & ~#{}/{}", model, model, chain)
}

/// Delete solvent from a model
pub fn delete_solvent(model: u32) -> String {
    format!("delete solvent & #{}", model)
}

/// Delete ligands from a model
pub fn delete_ligand(model: u32) -> String {
    format!("delete ligand & #{}", model)
}

/// Renumber a model to its UniProt reference sequence
pub fn renumber_to_uniprot(model: u32) -> String {
    format!("setattr #{} structures res_numbering uniprot", model)
}

/// Select a residue; the host answers with the selected residue names
pub fn select(model: u32, residue: &ResidueLocator) -> String {
    format!("select {}", residue_spec(model, residue))
}

/// Measure the distance between two atoms
pub fn distance(model: u32, from: &AtomLocator, to: &AtomLocator) -> String {
    format!("distance {} {}", atom_spec(model, from), atom_spec(model, to))
}

/// Compute the molecular surface around the current selection
pub fn surface_selection() -> String {
    "surface sel".to_string()
}

/// Measure the surface area of the current selection
pub fn measure_selection_area() -> String {
    "measure area sel includeMasked false".to_string()
}

/// Read a residue attribute
pub fn residue_attribute(model: u32, residue: &ResidueLocator, attribute: &str) -> String {
    format!("info residues {} attribute {}", residue_spec(model, residue), attribute)
}

/// Close one model
pub fn close(model: u32) -> String {
    format!("close #{}", model)
}

/// Close everything
pub fn close_all() -> String {
    "close all".to_string()
}

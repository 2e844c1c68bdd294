//! In-memory geometry engine
//!
//! Serves canned residues, areas, distances and torsions from fixtures
//! registered per structure source. Keeps handle accounting so callers can
//! check that structures are closed, and can inject communication failures.

use std::time::Duration;

use ahash::AHashMap;

use crate::engine::{
    AtomLocator, GeometryEngine, Preparation, ResidueLocator, StructureHandle, StructureSource,
    Torsion,
};
use crate::error::{HostError, HostResult};

/// One residue of a fixture structure
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureResidue {
    pub chain: String,
    pub position: i64,
    /// Three-letter residue name, e.g. `ASN`
    pub name: String,
    pub sesa: f64,
    /// Side-chain amide nitrogen to backbone C distance
    pub amide_distance: f64,
    pub torsion: Torsion,
}

impl FixtureResidue {
    /// Residue with zero area and distance and undefined torsion
    pub fn new(chain: &str, position: i64, name: &str) -> Self {
        Self {
            chain: chain.to_string(),
            position,
            name: name.to_string(),
            sesa: 0.0,
            amide_distance: 0.0,
            torsion: Torsion::default(),
        }
    }

    pub fn with_sesa(mut self, sesa: f64) -> Self {
        self.sesa = sesa;
        self
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.amide_distance = distance;
        self
    }

    pub fn with_torsion(mut self, phi: Option<f64>, psi: Option<f64>) -> Self {
        self.torsion = Torsion::new(phi, psi);
        self
    }

    fn side_chain_nitrogen(&self) -> Option<&'static str> {
        match self.name.as_str() {
            "ASN" => Some("ND2"),
            "GLN" => Some("NE2"),
            _ => None,
        }
    }
}

/// Residues of one structure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureFixture {
    residues: Vec<FixtureResidue>,
}

impl StructureFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a residue
    pub fn residue(mut self, residue: FixtureResidue) -> Self {
        self.residues.push(residue);
        self
    }

    fn find(&self, locator: &ResidueLocator) -> Option<&FixtureResidue> {
        self.residues.iter().find(|r| {
            r.position == locator.position
                && locator.chain.as_deref().map_or(true, |chain| r.chain == chain)
        })
    }

    fn keep_chain(&self, chain: &str) -> Self {
        Self {
            residues: self
                .residues
                .iter()
                .filter(|r| r.chain == chain)
                .cloned()
                .collect(),
        }
    }
}

/// Engine answering from fixtures
#[derive(Debug, Default)]
pub struct MemoryEngine {
    fixtures: AHashMap<StructureSource, StructureFixture>,
    open: AHashMap<u32, StructureFixture>,
    next_model: u32,
    max_open: usize,
    opened: Vec<(StructureSource, Preparation)>,
    pending_failures: usize,
    pending_close_failures: usize,
    lost_replies: usize,
    calls: usize,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the structure served for a source
    pub fn with_structure(mut self, source: StructureSource, fixture: StructureFixture) -> Self {
        self.fixtures.insert(source, fixture);
        self
    }

    /// Make the next `count` engine calls fail with a timeout
    ///
    /// Closing calls are failed through [`fail_next_closes`](Self::fail_next_closes).
    pub fn fail_next_calls(&mut self, count: usize) {
        self.pending_failures = count;
    }

    /// Make the next `count` `close_structure` calls time out, leaving the
    /// structure open
    pub fn fail_next_closes(&mut self, count: usize) {
        self.pending_close_failures = count;
    }

    /// Let the next `count` opens or closes take effect and then time out,
    /// as if the host's reply was lost
    pub fn lose_next_replies(&mut self, count: usize) {
        self.lost_replies = count;
    }

    /// Number of structures open right now
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Highest number of structures that were open at the same time
    pub fn max_open(&self) -> usize {
        self.max_open
    }

    /// Every open that took effect, in order
    pub fn opened(&self) -> &[(StructureSource, Preparation)] {
        &self.opened
    }

    /// Sources of every open that took effect, in order
    pub fn opened_sources(&self) -> Vec<&StructureSource> {
        self.opened.iter().map(|(source, _)| source).collect()
    }

    /// Engine calls made so far, failed ones included
    pub fn calls(&self) -> usize {
        self.calls
    }

    fn begin_call(&mut self) -> HostResult<()> {
        self.calls += 1;
        if self.pending_failures > 0 {
            self.pending_failures -= 1;
            return Err(HostError::Timeout(Duration::from_secs(120)));
        }
        Ok(())
    }

    fn end_call<T>(&mut self, value: T) -> HostResult<T> {
        if self.lost_replies > 0 {
            self.lost_replies -= 1;
            return Err(HostError::Timeout(Duration::from_secs(120)));
        }
        Ok(value)
    }

    fn structure(&self, handle: &StructureHandle) -> HostResult<&StructureFixture> {
        self.open
            .get(&handle.model())
            .ok_or(HostError::UnknownHandle(handle.model()))
    }

    fn residue(
        &self,
        handle: &StructureHandle,
        locator: &ResidueLocator,
    ) -> HostResult<&FixtureResidue> {
        self.structure(handle)?
            .find(locator)
            .ok_or_else(|| HostError::command(format!("no residue {}", locator)))
    }
}

impl GeometryEngine for MemoryEngine {
    fn open_structure(
        &mut self,
        source: &StructureSource,
        preparation: &Preparation,
    ) -> HostResult<StructureHandle> {
        self.begin_call()?;
        let fixture = self
            .fixtures
            .get(source)
            .ok_or_else(|| HostError::command(format!("cannot open {}", source)))?;
        let fixture = match &preparation.keep_chain {
            Some(chain) => fixture.keep_chain(chain),
            None => fixture.clone(),
        };

        self.next_model += 1;
        let model = self.next_model;
        self.open.insert(model, fixture);
        self.max_open = self.max_open.max(self.open.len());
        self.opened.push((source.clone(), preparation.clone()));
        self.end_call(StructureHandle::new(model, source.clone()))
    }

    fn close_structure(&mut self, handle: &StructureHandle) -> HostResult<()> {
        self.calls += 1;
        if self.pending_close_failures > 0 {
            self.pending_close_failures -= 1;
            return Err(HostError::Timeout(Duration::from_secs(120)));
        }
        self.open
            .remove(&handle.model())
            .ok_or(HostError::UnknownHandle(handle.model()))?;
        self.end_call(())
    }

    fn close_all(&mut self) -> HostResult<()> {
        self.calls += 1;
        self.open.clear();
        Ok(())
    }

    fn select_residue(
        &mut self,
        handle: &StructureHandle,
        residue: &ResidueLocator,
    ) -> HostResult<Vec<String>> {
        self.begin_call()?;
        Ok(self
            .structure(handle)?
            .find(residue)
            .map(|r| vec![r.name.clone()])
            .unwrap_or_default())
    }

    fn compute_distance(
        &mut self,
        handle: &StructureHandle,
        from: &AtomLocator,
        to: &AtomLocator,
    ) -> HostResult<f64> {
        self.begin_call()?;
        let residue = self.residue(handle, &from.residue)?;
        let nitrogen = residue.side_chain_nitrogen();
        if nitrogen != Some(from.name.as_str()) || to.name != "C" || to.residue != from.residue {
            return Err(HostError::command(format!(
                "no atoms {}@{} and {}@{}",
                from.residue, from.name, to.residue, to.name
            )));
        }
        Ok(residue.amide_distance)
    }

    fn compute_sesa(
        &mut self,
        handle: &StructureHandle,
        residue: &ResidueLocator,
    ) -> HostResult<f64> {
        self.begin_call()?;
        Ok(self.residue(handle, residue)?.sesa)
    }

    fn compute_backbone_torsion(
        &mut self,
        handle: &StructureHandle,
        residue: &ResidueLocator,
    ) -> HostResult<Torsion> {
        self.begin_call()?;
        Ok(self.residue(handle, residue)?.torsion)
    }
}

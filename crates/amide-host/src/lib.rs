//! Geometry engine access for amide batch analysis
//!
//! Surface areas, distances and backbone torsions are computed by an
//! external molecular visualization host. This crate provides:
//!
//! - [`GeometryEngine`] - the capability the analysis code is written against
//! - [`HostSession`] - the production engine, driving the host's command
//!   interpreter over a Unix domain socket
//! - [`MemoryEngine`] - a fixture-backed engine for tests
//! - [`CommandTranscript`] - a replayable record of every host command
//!
//! # Example
//!
//! ```no_run
//! use amide_host::{GeometryEngine, HostSession, HostSettings, Preparation, StructureSource};
//! use amide_host::ResidueLocator;
//!
//! let mut session = HostSession::connect(&HostSettings::default()).unwrap();
//! let handle = session
//!     .open_structure(&StructureSource::experimental("1a3n"), &Preparation::stripped())
//!     .unwrap();
//! let names = session
//!     .select_residue(&handle, &ResidueLocator::new(Some("A"), 58))
//!     .unwrap();
//! session.close_structure(&handle).unwrap();
//! ```

pub mod dialect;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod memory;
pub mod settings;
pub mod transcript;

#[cfg(unix)]
pub mod connection;
#[cfg(unix)]
pub mod session;

// Re-exports
pub use engine::{
    AtomLocator, GeometryEngine, Preparation, ResidueLocator, StructureHandle, StructureSource,
    Torsion,
};
pub use error::{HostError, HostResult};
pub use memory::{FixtureResidue, MemoryEngine, StructureFixture};
pub use settings::HostSettings;
pub use transcript::{CommandTranscript, TranscriptFormat};

#[cfg(unix)]
pub use connection::{establish_connection, HostConnection};
#[cfg(unix)]
pub use session::HostSession;

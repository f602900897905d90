//! # deck_core - Girder Analysis and Design Engine
//!
//! `deck_core` answers three questions about a bridge deck girder carrying a
//! train of axles: what its cross-section's properties are, how safe it is
//! wherever the train stands, and which section in a family of candidates
//! carries the heaviest train. Inputs and results are JSON-serializable so a
//! study can be stored, diffed and re-run.
//!
//! ## Design Philosophy
//!
//! - **Explicit load cases**: analysis never depends on hidden train state
//! - **JSON-First**: sections, studies, sweeps and outcomes are serde types
//! - **Rich Errors**: a bad query is told apart from a bad configuration
//!
//! ## Quick Start
//!
//! ```rust
//! use deck_core::calculations::{BeamModel, GirderSection, SafetyEvaluator, Train};
//! use deck_core::materials::Material;
//! use deck_core::section::{CrossSection, GirderParams};
//!
//! let section = CrossSection::girder(GirderParams::default()).unwrap();
//! let model = BeamModel::new(1200.0, Train::default(), GirderSection::uniform(section), 400.0)
//!     .unwrap();
//! let material = Material::matboard();
//! let evaluator = SafetyEvaluator::new(&model, &material);
//!
//! let max = evaluator.maximum_load(4.0).unwrap();
//! assert!(max.load > 0.0);
//! ```
//!
//! ## Modules
//!
//! - [`section`] - Cross-section geometry: primitives, composites, presets
//! - [`calculations`] - Moving-load beam model and safety evaluation
//! - [`search`] - Grid and evolutionary search over section parameters
//! - [`study`] - Study documents: bridge, material, settings, search
//! - [`materials`] - Material record
//! - [`equations`] - Closed-form formulas
//! - [`errors`] - Structured error types
//! - [`file_io`] - Study files with atomic saves and locking

pub mod calculations;
pub mod equations;
pub mod errors;
pub mod file_io;
pub mod materials;
pub mod search;
pub mod section;
pub mod study;

// Re-export commonly used types at crate root for convenience
pub use errors::{DeckError, DeckResult};
pub use file_io::{load_study, save_study, FileLock};
pub use study::{Study, StudyMetadata, StudySettings};

//! # Girder Calculations
//!
//! The moving-load analysis of a girder and the safety checks built on it.
//!
//! - [`beam_analysis`] - Reactions, shear and moment under a train of axles,
//!   sampled diagrams and force envelopes
//! - [`evaluation`] - Safety factors per failure mode, train sweeps, dead
//!   zones and the maximum carried load
//!
//! Inputs and results are JSON-serializable, so a sweep or envelope can be
//! written out and plotted elsewhere.

pub mod beam_analysis;
pub mod evaluation;

// Re-export commonly used types
pub use beam_analysis::{
    BeamModel, ForceEnvelope, GirderSection, LoadCase, Reactions, SectionProperties, Train,
};
pub use evaluation::{FailureMode, MaximumLoad, SafetyEvaluator, SafetySweep};

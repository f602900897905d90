//! # Structural Mechanics Equations
//!
//! Closed-form formulas used by the section engine and the beam model.
//! Keeping them in one place makes each one checkable against a textbook
//! without reading the surrounding bookkeeping.
//!
//! ## Modules
//!
//! - [`beam`] - Reactions and stresses for a simply supported girder
//! - [`section`] - Rectangle and circle properties, circular segments
//! - [`plate`] - Thin-plate buckling of flanges and webs
//!
//! ## Sign Conventions
//!
//! - **Loads**: Positive downward (gravity direction)
//! - **Moment**: Positive causes tension on bottom fiber (sagging)
//! - **Shear**: Positive when left side moves up relative to right
//! - **Reactions**: Positive upward (resisting gravity)
//!
//! ## Units
//!
//! Any consistent set; the crate uses mm, N and MPa throughout.

pub mod beam;
pub mod plate;
pub mod section;

pub use beam::{bending_stress, far_reaction, shear_flow_stress};
pub use plate::{
    plate_buckling_stress, shear_buckling_stress, FLANGE_BOTH_EDGES_K, FLANGE_ONE_EDGE_K,
    WEB_FLEXURE_K,
};
pub use section::{
    circle_area, circle_moment_of_inertia, circular_segment_area, circular_segment_first_moment,
    rectangular_area, rectangular_moment_of_inertia,
};

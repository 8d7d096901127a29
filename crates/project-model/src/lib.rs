//! Reelsmith Project Model
//!
//! Defines the data contracts the composer consumes:
//! - **Sources:** media files referenced by id, with a resolvable location
//! - **Timeline:** ordered video entries plus independently placed audio
//!   overlays and narration
//! - **Shape:** the target aspect ratio of the rendered output
//!
//! Trim windows and offsets are expressed in floating-point seconds here;
//! the composer converts them to its exact time base at consumption.

pub mod location;
pub mod project;
pub mod shape;

pub use location::*;
pub use project::*;
pub use shape::*;

//! 2-D geometry for the arena simulation: shape primitives, exact
//! narrow-phase tests, cardinal-orientation transforms, and the discrete
//! vertical-layer helpers used for collision/visibility filtering.
#![deny(warnings, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
#![allow(
    clippy::cast_precision_loss,
    clippy::float_cmp,
    clippy::many_single_char_names,
    clippy::must_use_candidate,
    clippy::similar_names
)]

pub mod collision;
pub mod hitbox;
pub mod layer;
pub mod math;

pub use hitbox::{Distance, Hitbox, SegmentHit};
pub use math::Orientation;

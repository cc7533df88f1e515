//! `net_core`: bit-packed wire protocol for world deltas.
//!
//! Scope
//! - Typed, precision-bounded bit-stream primitives (`bits`)
//! - Per-object full/partial delta payloads (`object`)
//! - The per-tick update packet with optional sections (`update`)
//! - Versioned length framing for the outbound byte stream (`frame`)
//!
//! Both ends are built from the same protocol definition, so writing an
//! out-of-range value is a programmer error (panic); a truncated inbound
//! buffer is a recoverable decode error (drop the packet, keep the
//! connection).
#![deny(warnings, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

pub mod bits;
pub mod frame;
pub mod object;
pub mod update;

/// Bits for an object id on the wire. Ids are assigned monotonically and are
/// never recycled while registered, so they get a full 16 bits.
pub const OBJECT_ID_BITS: u32 = 16;
/// Bits for an object category tag.
pub const OBJECT_CATEGORY_BITS: u32 = 3;
/// Bits per axis of a quantized position.
pub const POSITION_BITS: u32 = 16;
/// Upper bound of either world axis; positions encode over `[0, MAX_WORLD_DIM]`.
pub const MAX_WORLD_DIM: f32 = 1024.0;
/// Object scale quantization range and width.
pub const MIN_OBJECT_SCALE: f32 = 0.25;
pub const MAX_OBJECT_SCALE: f32 = 2.0;
pub const SCALE_BITS: u32 = 8;
/// Bullet variance quantization width over `[0, 1]`.
pub const VARIANCE_BITS: u32 = 4;
/// Signed layer index, biased; covers `[-15, 16]`.
pub const LAYER_BITS: u32 = 5;
pub const LAYER_BIAS: i32 = 15;

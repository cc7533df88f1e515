//! data_runtime: definition schemas and loaders.
//!
//! Definitions are read from TOML under the workspace `data/` directory when
//! present, with in-code defaults otherwise, so the server and tests run
//! without any on-disk data. Def registries hand out dense `u16` ids that
//! double as the wire representation.
#![deny(warnings, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
#![allow(
    clippy::cast_lossless,
    clippy::must_use_candidate,
    clippy::struct_excessive_bools
)]

pub mod defs {
    pub mod obstacles;
    pub mod weapons;
}
pub mod hitbox_spec;
pub mod loot;

pub(crate) fn data_root() -> std::path::PathBuf {
    let here = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let ws = here.join("../../data");
    if ws.is_dir() { ws } else { here.join("data") }
}

//! Scene assembly
//!
//! Turns fetched payloads into a live backend scene:
//! - [`assembly`]: import, shadow registration, material enhancement
//! - [`intercept`]: routes importer image requests to fetched payloads
//! - [`material`]: near-black and colour-encoding fixes
//! - [`light`]: the standard light rig and its HDRI snapshot
//! - [`metadata`]: the optional per-model JSON resource
//! - [`handle`]: the caller-owned [`SceneHandle`]

pub mod assembly;
pub mod handle;
pub mod intercept;
pub mod light;
pub mod material;
pub mod metadata;

pub use assembly::{Assembled, AssemblyOptions, assemble};
pub use handle::SceneHandle;
pub use intercept::TextureInterceptor;
pub use light::{Light, LightKind, LightRig, LightSnapshot};
pub use material::enhance_material;
pub use metadata::ModelMetadata;

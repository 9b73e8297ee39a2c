#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod assets;
pub mod backend;
pub mod config;
pub mod effects;
pub mod errors;
pub mod pipeline;
pub mod scene;

pub use assets::{
    AssetTransport, FileTransport, LoadManifest, MemoryTransport, ResourceDescriptor,
    ResourceRole, TransportVariant,
};
pub use backend::{Capabilities, CapabilityProfile, HeadlessBackend, RenderBackend};
pub use config::{ModelConfig, PipelineSettings, ViewerConfig};
pub use effects::{EffectKind, EffectPhase, EffectState, QualityTier};
pub use errors::{ErrorClass, Result, VisionError};
pub use pipeline::{CancellationToken, LoadProgress, ProgressSink, Viewer};
pub use scene::SceneHandle;

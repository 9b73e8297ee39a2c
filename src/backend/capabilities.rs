//! Capability negotiation.
//!
//! The backend reports raw [`Capabilities`] once at startup; they are folded
//! into a [`CapabilityProfile`] that every effect consults instead of probing
//! the engine at each call site.

use serde::{Deserialize, Serialize};

/// Raw feature report from a rendering backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Multi-render-target depth/normal prepass (needed by the modern SSAO path).
    pub geometry_buffer: bool,
    /// Any screen-space ambient occlusion at all.
    pub ssao: bool,
    /// Prefiltered HDR environment textures.
    pub hdr_environment: bool,
    /// Floating-point render targets.
    pub float_render_targets: bool,
    pub max_texture_size: u32,
}

impl Capabilities {
    /// A WebGPU/WebGL2-class device.
    #[must_use]
    pub fn modern() -> Self {
        Self {
            geometry_buffer: true,
            ssao: true,
            hdr_environment: true,
            float_render_targets: true,
            max_texture_size: 8192,
        }
    }

    /// A WebGL1-class device.
    #[must_use]
    pub fn legacy() -> Self {
        Self {
            geometry_buffer: false,
            ssao: true,
            hdr_environment: false,
            float_render_targets: false,
            max_texture_size: 4096,
        }
    }

    /// A device that cannot run any post-process.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            geometry_buffer: false,
            ssao: false,
            hdr_environment: false,
            float_render_targets: false,
            max_texture_size: 2048,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::modern()
    }
}

/// Which implementation of each effect to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityProfile {
    Modern,
    Legacy,
}

/// SSAO implementation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SsaoVariant {
    /// Geometry-buffer based, supports higher sample counts.
    GeometryBuffer,
    /// Depth-only fallback.
    DepthOnly,
}

/// Environment texture encoding the backend should build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvironmentFormat {
    /// Prefiltered cube map with roughness mips.
    Prefiltered,
    /// Plain equirectangular LDR fallback.
    Equirectangular,
}

impl CapabilityProfile {
    #[must_use]
    pub fn negotiate(caps: &Capabilities) -> Self {
        if caps.geometry_buffer && caps.float_render_targets && caps.hdr_environment {
            Self::Modern
        } else {
            Self::Legacy
        }
    }

    #[must_use]
    pub fn ssao_variant(self) -> SsaoVariant {
        match self {
            Self::Modern => SsaoVariant::GeometryBuffer,
            Self::Legacy => SsaoVariant::DepthOnly,
        }
    }

    /// Upper bound applied to SSAO preset sample counts.
    #[must_use]
    pub fn max_ssao_samples(self) -> u32 {
        match self {
            Self::Modern => 64,
            Self::Legacy => 16,
        }
    }

    #[must_use]
    pub fn environment_format(self) -> EnvironmentFormat {
        match self {
            Self::Modern => EnvironmentFormat::Prefiltered,
            Self::Legacy => EnvironmentFormat::Equirectangular,
        }
    }
}

//! Material enhancement.
//!
//! Exported architectural models frequently arrive with near-black base
//! colours (the exporter wrote the diffuse map but zeroed the factor) and
//! with texture colour encodings left to guesswork. Enhancement fixes both,
//! once per material, right after import.

use glam::{Vec3, Vec4};

use crate::backend::{ColorEncoding, MaterialDesc};

/// Neutral grey used for untextured materials with no usable colour.
pub const NEUTRAL_GREY: Vec3 = Vec3::splat(0.8);

/// What [`enhance_material`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Enhancement {
    pub lifted_base_color: bool,
    pub tagged_textures: usize,
}

impl Enhancement {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.lifted_base_color || self.tagged_textures > 0
    }
}

/// A colour is near-black when its brightest channel is below `threshold`.
#[inline]
#[must_use]
pub fn is_near_black(color: Vec4, threshold: f32) -> bool {
    color.truncate().max_element() < threshold
}

pub fn enhance_material(material: &mut MaterialDesc, near_black_threshold: f32) -> Enhancement {
    let mut result = Enhancement::default();

    if is_near_black(material.base_color, near_black_threshold) {
        let lifted = if material.base_color_texture.is_some() {
            Vec3::ONE
        } else {
            NEUTRAL_GREY
        };
        material.base_color = lifted.extend(material.base_color.w);
        result.lifted_base_color = true;
    }

    // Colour data is sRGB, normal data is linear.
    for (binding, encoding) in [
        (material.base_color_texture.as_mut(), ColorEncoding::Srgb),
        (material.normal_texture.as_mut(), ColorEncoding::Linear),
    ] {
        if let Some(binding) = binding
            && binding.encoding != encoding
        {
            binding.encoding = encoding;
            result.tagged_textures += 1;
        }
    }

    if result.changed() {
        log::trace!("Enhanced material '{}': {result:?}", material.name);
    }
    result
}

//! `KHR_materials_pbrSpecularGlossiness` -> metallic-roughness conversion
//!
//! Factors are converted exactly; textures are carried over without pixel
//! conversion (the diffuse texture stands in for base color when the
//! material has none).

use crate::error::Result;
use crate::extension::DocumentExtension;
use crate::json::KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS;
use crate::model::{Document, SpecGloss};

/// Specular reflectance of dielectrics
const DIELECTRIC_SPECULAR: f32 = 0.04;
const EPSILON: f32 = 1e-5;

/// Metallic-roughness factors equivalent to a spec-gloss material
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetallicRoughness {
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
}

/// Perceived brightness of a linear RGB color
pub fn perceived_brightness(color: [f32; 3]) -> f32 {
    let [r, g, b] = color;
    (0.299 * r * r + 0.587 * g * g + 0.114 * b * b).sqrt()
}

/// Solve for the metallic value that reproduces both diffuse and specular brightness
pub fn solve_metallic(diffuse: f32, specular: f32, one_minus_specular_strength: f32) -> f32 {
    if specular <= DIELECTRIC_SPECULAR {
        return 0.0;
    }
    let a = DIELECTRIC_SPECULAR;
    let b = diffuse * one_minus_specular_strength / (1.0 - DIELECTRIC_SPECULAR) + specular
        - 2.0 * DIELECTRIC_SPECULAR;
    let c = DIELECTRIC_SPECULAR - specular;
    let discriminant = (b * b - 4.0 * a * c).max(0.0);
    ((-b + discriminant.sqrt()) / (2.0 * a)).clamp(0.0, 1.0)
}

pub fn to_metallic_roughness(spec_gloss: &SpecGloss) -> MetallicRoughness {
    let [dr, dg, db, alpha] = spec_gloss.diffuse_factor;
    let diffuse = [dr, dg, db];
    let specular = spec_gloss.specular_factor;

    let one_minus_specular_strength = 1.0 - specular.iter().copied().fold(0.0, f32::max);
    let metallic = solve_metallic(
        perceived_brightness(diffuse),
        perceived_brightness(specular),
        one_minus_specular_strength,
    );
    let one_minus_metallic = 1.0 - metallic;

    let diffuse_scale =
        one_minus_specular_strength / (1.0 - DIELECTRIC_SPECULAR) / one_minus_metallic.max(EPSILON);
    let specular_scale = 1.0 / metallic.max(EPSILON);
    let blend = metallic * metallic;

    let mut base_color = [0.0, 0.0, 0.0, alpha];
    for i in 0..3 {
        let from_diffuse = diffuse[i] * diffuse_scale;
        let from_specular = (specular[i] - DIELECTRIC_SPECULAR * one_minus_metallic) * specular_scale;
        base_color[i] = (from_diffuse + (from_specular - from_diffuse) * blend).clamp(0.0, 1.0);
    }

    MetallicRoughness {
        base_color,
        metallic,
        roughness: 1.0 - spec_gloss.glossiness_factor.clamp(0.0, 1.0),
    }
}

/// Built-in extension filling metallic-roughness factors from spec-gloss data
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecGlossConversion;

impl DocumentExtension for SpecGlossConversion {
    fn name(&self) -> &str {
        "spec_gloss_conversion"
    }

    fn supported_extensions(&self) -> &[&str] {
        &[KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS]
    }

    fn post_parse(&self, document: &mut Document) -> Result<()> {
        let mut converted = 0;
        for material in &mut document.materials {
            let Some(spec_gloss) = &material.spec_gloss else {
                continue;
            };
            let factors = to_metallic_roughness(spec_gloss);
            material.base_color_factor = factors.base_color;
            material.metallic_factor = factors.metallic;
            material.roughness_factor = factors.roughness;
            if material.base_color_texture.is_none() {
                material.base_color_texture = spec_gloss.diffuse_texture;
            }
            converted += 1;
        }
        if converted > 0 {
            tracing::debug!("Converted {} spec-gloss material(s)", converted);
        }
        Ok(())
    }
}

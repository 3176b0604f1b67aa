//! Point lights and spotlights for a fixed-size uniform block
//!
//! The shader declares arrays of `MAX_POINT_LIGHTS` and `MAX_SPOTLIGHTS`
//! entries. Lights beyond those limits are ignored.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Floats per packed point light: position (3), color (3), length (1)
pub const POINT_LIGHT_FLOATS: usize = 7;
/// Floats per packed spotlight: position (3), color (3), length (1), target (3), angle (1), hardness (1)
pub const SPOTLIGHT_FLOATS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    /// Maximum distance the light reaches
    pub length: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spotlight {
    pub position: Vec3,
    pub color: Vec3,
    pub length: f32,
    /// Point the cone is aimed at
    pub target: Vec3,
    /// Cone angle
    pub angle: f32,
    /// Falloff exponent at the cone edge
    pub hardness: f32,
}

/// Array sizes compiled into the shader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightLimits {
    pub max_point_lights: usize,
    pub max_spotlights: usize,
}

impl Default for LightLimits {
    fn default() -> Self {
        Self {
            max_point_lights: 10,
            max_spotlights: 10,
        }
    }
}

impl LightLimits {
    /// Preprocessor lines prepended to the shader source
    pub fn shader_defines(&self) -> String {
        format!(
            "#define MAX_POINT_LIGHTS {}\n#define MAX_SPOTLIGHTS {}\n",
            self.max_point_lights, self.max_spotlights
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightSet {
    pub ambient: Vec3,
    pub directional_color: Vec3,
    pub directional_direction: Vec3,
    pub point_lights: Vec<PointLight>,
    pub spotlights: Vec<Spotlight>,
}

impl Default for LightSet {
    fn default() -> Self {
        Self {
            ambient: Vec3::ZERO,
            directional_color: Vec3::ZERO,
            directional_direction: Vec3::NEG_Z,
            point_lights: Vec::new(),
            spotlights: Vec::new(),
        }
    }
}

/// Flat uniform data for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightUniforms {
    #[serde(rename = "ambientLight")]
    pub ambient: [f32; 3],
    #[serde(rename = "dirLightColor")]
    pub directional_color: [f32; 3],
    #[serde(rename = "dirLightDirection")]
    pub directional_direction: [f32; 3],
    #[serde(rename = "pointLightCount")]
    pub point_light_count: u32,
    /// `POINT_LIGHT_FLOATS` values per light
    #[serde(rename = "pointLights")]
    pub point_lights: Vec<f32>,
    #[serde(rename = "spotlightCount")]
    pub spotlight_count: u32,
    /// `SPOTLIGHT_FLOATS` values per light
    pub spotlights: Vec<f32>,
}

impl LightSet {
    /// Pack up to the configured number of each light kind
    pub fn uniforms(&self, limits: &LightLimits) -> LightUniforms {
        if self.point_lights.len() > limits.max_point_lights {
            log::debug!(
                "ignoring {} point lights over the limit of {}",
                self.point_lights.len() - limits.max_point_lights,
                limits.max_point_lights
            );
        }
        if self.spotlights.len() > limits.max_spotlights {
            log::debug!(
                "ignoring {} spotlights over the limit of {}",
                self.spotlights.len() - limits.max_spotlights,
                limits.max_spotlights
            );
        }

        let point_lights: Vec<&PointLight> = self.point_lights.iter().take(limits.max_point_lights).collect();
        let mut point_data = Vec::with_capacity(point_lights.len() * POINT_LIGHT_FLOATS);
        for light in &point_lights {
            point_data.extend_from_slice(&light.position.to_array());
            point_data.extend_from_slice(&light.color.to_array());
            point_data.push(light.length);
        }

        let spotlights: Vec<&Spotlight> = self.spotlights.iter().take(limits.max_spotlights).collect();
        let mut spot_data = Vec::with_capacity(spotlights.len() * SPOTLIGHT_FLOATS);
        for light in &spotlights {
            spot_data.extend_from_slice(&light.position.to_array());
            spot_data.extend_from_slice(&light.color.to_array());
            spot_data.push(light.length);
            spot_data.extend_from_slice(&light.target.to_array());
            spot_data.push(light.angle);
            spot_data.push(light.hardness);
        }

        LightUniforms {
            ambient: self.ambient.to_array(),
            directional_color: self.directional_color.to_array(),
            directional_direction: self.directional_direction.to_array(),
            point_light_count: point_lights.len() as u32,
            point_lights: point_data,
            spotlight_count: spotlights.len() as u32,
            spotlights: spot_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f32) -> PointLight {
        PointLight { position: Vec3::new(x, 0.0, 0.0), color: Vec3::ONE, length: 5.0 }
    }

    #[test]
    fn test_excess_lights_ignored() {
        let lights = LightSet {
            point_lights: (0..12).map(|i| point(i as f32)).collect(),
            ..Default::default()
        };
        let uniforms = lights.uniforms(&LightLimits::default());
        assert_eq!(uniforms.point_light_count, 10);
        assert_eq!(uniforms.point_lights.len(), 10 * POINT_LIGHT_FLOATS);
        // the first ten are kept in order
        assert_eq!(uniforms.point_lights[9 * POINT_LIGHT_FLOATS], 9.0);
        assert_eq!(uniforms.spotlight_count, 0);
    }

    #[test]
    fn test_spotlight_packing() {
        let lights = LightSet {
            spotlights: vec![Spotlight {
                position: Vec3::new(1.0, 2.0, 3.0),
                color: Vec3::new(0.5, 0.5, 0.5),
                length: 20.0,
                target: Vec3::ZERO,
                angle: 0.3,
                hardness: 4.0,
            }],
            ..Default::default()
        };
        let limits = LightLimits { max_point_lights: 0, max_spotlights: 1 };
        let uniforms = lights.uniforms(&limits);
        assert_eq!(
            uniforms.spotlights,
            vec![1.0, 2.0, 3.0, 0.5, 0.5, 0.5, 20.0, 0.0, 0.0, 0.0, 0.3, 4.0]
        );
    }

    #[test]
    fn test_limits_from_json_and_defines() {
        let limits: LightLimits = serde_json::from_str(r#"{"max_spotlights": 4}"#).unwrap();
        assert_eq!(limits.max_point_lights, 10);
        assert_eq!(
            limits.shader_defines(),
            "#define MAX_POINT_LIGHTS 10\n#define MAX_SPOTLIGHTS 4\n"
        );
    }
}

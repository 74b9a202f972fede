//! Render configuration applied on the next frame

use super::shading::{RenderMode, ShaderType};
use crate::gfx::resources::LightConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub render_mode: RenderMode,
    pub shader_type: ShaderType,
    /// RGBA clear color
    pub background_color: [f32; 4],
    pub wireframe_color: [f32; 4],
    /// Point diameter in pixels
    pub point_size: f32,
    /// Specular exponent of the lit program
    pub shininess: f32,
    pub light: LightConfig,
}

impl Default for RenderSettings {
    fn default() -> Self {
        let gray = 50.0 / 255.0;
        Self {
            render_mode: RenderMode::Solid,
            shader_type: ShaderType::Lit,
            background_color: [gray, gray, gray, 1.0],
            wireframe_color: [1.0, 1.0, 1.0, 1.0],
            point_size: 5.0,
            shininess: 32.0,
            light: LightConfig::default(),
        }
    }
}

impl RenderSettings {
    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    pub fn with_shader_type(mut self, shader_type: ShaderType) -> Self {
        self.shader_type = shader_type;
        self
    }

    pub fn with_background_color(mut self, color: [f32; 4]) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_wireframe_color(mut self, color: [f32; 4]) -> Self {
        self.wireframe_color = color;
        self
    }

    /// Sizes below one pixel are raised to one
    pub fn with_point_size(mut self, size: f32) -> Self {
        self.point_size = size.max(1.0);
        self
    }

    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess.max(0.0);
        self
    }

    pub fn with_light(mut self, light: LightConfig) -> Self {
        self.light = light;
        self
    }

    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.background_color;
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = RenderSettings::default();
        assert_eq!(settings.render_mode, RenderMode::Solid);
        assert_eq!(settings.shader_type, ShaderType::Lit);
        assert_eq!(settings.point_size, 5.0);
        assert_eq!(settings.shininess, 32.0);
        assert_eq!(settings.light.position, [5.0, 5.0, 5.0]);
        assert_eq!(settings.clear_color().a, 1.0);
    }

    #[test]
    fn test_point_size_floor() {
        let settings = RenderSettings::default().with_point_size(0.0);
        assert_eq!(settings.point_size, 1.0);
    }
}

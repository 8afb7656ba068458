use super::TransformConfig;

/// Uniform names the renderer uploads to. Absent uniforms are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformNames {
    pub model: String,
    pub view: String,
    pub projection: String,
    pub time: String,
    pub texture: String,
}

impl Default for UniformNames {
    fn default() -> Self {
        Self {
            model: "u_Model".to_string(),
            view: "u_View".to_string(),
            projection: "u_Projection".to_string(),
            time: "u_Time".to_string(),
            texture: "u_Texture".to_string(),
        }
    }
}

/// Renderer configuration.
///
/// Defaults: dark grey clear color, no depth test, static identity
/// transforms, `u_*` uniform names, texture unit 0.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub clear_color: [f32; 4],
    pub depth_test: bool,
    pub transform: TransformConfig,
    pub uniforms: UniformNames,
    pub texture_unit: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.1, 0.1, 0.12, 1.0],
            depth_test: false,
            transform: TransformConfig::default(),
            uniforms: UniformNames::default(),
            texture_unit: 0,
        }
    }
}

impl RendererConfig {
    pub fn clear_color(mut self, rgba: [f32; 4]) -> Self {
        self.clear_color = rgba;
        self
    }

    pub fn depth_test(mut self, enabled: bool) -> Self {
        self.depth_test = enabled;
        self
    }

    pub fn transform(mut self, transform: TransformConfig) -> Self {
        self.transform = transform;
        self
    }

    pub fn uniforms(mut self, uniforms: UniformNames) -> Self {
        self.uniforms = uniforms;
        self
    }

    pub fn texture_unit(mut self, unit: u32) -> Self {
        self.texture_unit = unit;
        self
    }
}

use sceneconfig::SceneConfig;

/// Multi-sample anti-aliasing preference for the particle pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Use the highest sample count the surface supports, up to 4.
    #[default]
    Auto,
    Off,
    Samples(u32),
}

/// Everything the window loop needs to open a surface and run a sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub surface_size: (u32, u32),
    pub title: String,
    pub vsync: bool,
    /// Clear color as sRGB components in `[0, 1]`.
    pub background: [f32; 3],
    pub antialiasing: Antialiasing,
    pub scene: SceneConfig,
}

impl RendererConfig {
    pub fn from_scene_config(scene: SceneConfig) -> Self {
        let window = &scene.window;
        Self {
            surface_size: (window.width, window.height),
            title: window.title.clone(),
            vsync: window.vsync,
            background: window.background,
            antialiasing: Antialiasing::default(),
            scene,
        }
    }

    /// Background converted for the sRGB surface, which expects linear values.
    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b] = self.background.map(srgb_to_linear);
        wgpu::Color { r, g, b, a: 1.0 }
    }
}

fn srgb_to_linear(component: f32) -> f64 {
    let c = component.clamp(0.0, 1.0) as f64;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_settings_carry_over() {
        let mut scene = SceneConfig::default();
        scene.window.width = 800;
        scene.window.height = 600;
        scene.window.vsync = false;
        let config = RendererConfig::from_scene_config(scene);
        assert_eq!(config.surface_size, (800, 600));
        assert!(!config.vsync);
        assert_eq!(config.title, "Morphosis");
        assert_eq!(config.antialiasing, Antialiasing::Auto);
    }

    #[test]
    fn background_becomes_an_opaque_clear_color() {
        let config = RendererConfig::from_scene_config(SceneConfig::default());
        let color = config.clear_color();
        assert_eq!(color.a, 1.0);
        assert!(color.b > 0.009 && color.b < 0.011);
    }

    #[test]
    fn srgb_endpoints_are_preserved() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-9);
        assert!(srgb_to_linear(0.5) < 0.5);
    }
}

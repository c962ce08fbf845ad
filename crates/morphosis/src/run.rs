use anyhow::{Context, Result};
use renderer::{Renderer, RendererConfig};
use sceneconfig::SceneConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::paths::{AppPaths, ConfigOrigin};

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let (mut scene, origin) = load_scene(&paths, &args)?;
    apply_overrides(&mut scene, &args);
    scene
        .validate()
        .context("configuration is invalid after applying command-line overrides")?;

    tracing::debug!(
        origin = ?origin,
        image = %scene.assets.image.display(),
        model = %scene.assets.model.display(),
        "resolved scene configuration"
    );

    let mut config = RendererConfig::from_scene_config(scene);
    config.antialiasing = args.antialias;
    tracing::info!(
        width = config.surface_size.0,
        height = config.surface_size.1,
        vsync = config.vsync,
        "bootstrapping morphosis"
    );
    Renderer::new(config).run()
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads the scene from wherever the lookup order lands.
pub fn load_scene(paths: &AppPaths, args: &RunArgs) -> Result<(SceneConfig, ConfigOrigin)> {
    let origin = paths.resolve_config(args.config.config.as_deref());
    let scene = match origin.path() {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => SceneConfig::default(),
    };
    Ok((scene, origin))
}

pub fn apply_overrides(scene: &mut SceneConfig, args: &RunArgs) {
    if let Some((width, height)) = args.size {
        scene.window.width = width;
        scene.window.height = height;
    }
    if let Some(seed) = args.seed {
        scene.sequence.seed = seed;
    }
    if let Some(vsync) = args.vsync {
        scene.window.vsync = vsync;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["morphosis"];
        full.extend_from_slice(argv);
        Cli::try_parse_from(full).unwrap().run
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut scene = SceneConfig::default();
        let args = run_args(&["--size", "320x200", "--seed", "99", "--vsync", "off"]);
        apply_overrides(&mut scene, &args);
        assert_eq!((scene.window.width, scene.window.height), (320, 200));
        assert_eq!(scene.sequence.seed, 99);
        assert!(!scene.window.vsync);
    }

    #[test]
    fn absent_flags_keep_config_values() {
        let mut scene = SceneConfig::default();
        let before = scene.clone();
        apply_overrides(&mut scene, &run_args(&[]));
        assert_eq!(scene, before);
    }
}

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration for a sequence run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SceneConfig {
    pub version: u32,
    #[serde(default)]
    pub window: WindowSettings,
    #[serde(default)]
    pub assets: AssetSettings,
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub sequence: SequenceSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub vsync: bool,
    pub background: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetSettings {
    pub image: PathBuf,
    pub model: PathBuf,
}

/// Constants for the attractor integrator.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub gravity: f32,
    pub particle_mass: f32,
    pub attractor_mass: f32,
    pub distance_floor: f32,
    pub distance_ceiling: f32,
    pub seed_radius: f32,
    pub seed_speed: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SequenceSettings {
    pub seed: u64,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub point_exit_delay: Duration,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub message_delay: Duration,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            window: WindowSettings::default(),
            assets: AssetSettings::default(),
            simulation: SimulationSettings::default(),
            sequence: SequenceSettings::default(),
        }
    }
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 900,
            title: "Morphosis".to_string(),
            vsync: true,
            background: [0.008, 0.067, 0.098],
        }
    }
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            image: PathBuf::from("assets/image.jpg"),
            model: PathBuf::from("assets/head.gltf"),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            gravity: 25.0,
            particle_mass: 10.0,
            attractor_mass: 1000.0,
            distance_floor: 100_000.0,
            distance_ceiling: 1.0e12,
            seed_radius: 600.0,
            seed_speed: 0.5,
        }
    }
}

impl Default for SequenceSettings {
    fn default() -> Self {
        Self {
            seed: 7,
            point_exit_delay: Duration::from_millis(500),
            message_delay: Duration::from_secs(10),
        }
    }
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl SceneConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SceneConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        if let Some(base) = path.parent() {
            config.assets.rebase(base);
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero (got {}x{})",
                self.window.width, self.window.height
            )));
        }

        if self
            .window
            .background
            .iter()
            .any(|channel| !(0.0..=1.0).contains(channel))
        {
            return Err(ConfigError::Invalid(
                "window.background channels must be within [0, 1]".into(),
            ));
        }

        if self.assets.image.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("assets.image must not be empty".into()));
        }
        if self.assets.model.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("assets.model must not be empty".into()));
        }

        let sim = &self.simulation;
        for (name, value) in [
            ("gravity", sim.gravity),
            ("particle_mass", sim.particle_mass),
            ("attractor_mass", sim.attractor_mass),
            ("distance_floor", sim.distance_floor),
            ("seed_radius", sim.seed_radius),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "simulation.{name} must be a positive number"
                )));
            }
        }

        if !(sim.distance_ceiling > sim.distance_floor) {
            return Err(ConfigError::Invalid(format!(
                "simulation.distance_ceiling ({}) must exceed distance_floor ({})",
                sim.distance_ceiling, sim.distance_floor
            )));
        }

        if !sim.seed_speed.is_finite() || sim.seed_speed < 0.0 {
            return Err(ConfigError::Invalid(
                "simulation.seed_speed must be >= 0".into(),
            ));
        }

        Ok(())
    }
}

impl AssetSettings {
    /// Resolves relative asset paths against the directory holding the config file.
    fn rebase(&mut self, base: &Path) {
        for path in [&mut self.image, &mut self.model] {
            if path.is_relative() && !base.as_os_str().is_empty() {
                *path = base.join(&*path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[window]
width = 1280
height = 720
vsync = false

[assets]
image = "pictures/portrait.png"
model = "models/head.glb"

[simulation]
gravity = 30
attractor_mass = 2000.0

[sequence]
seed = 99
point_exit_delay = "750ms"
message_delay = 4
"#;

    #[test]
    fn parses_sample_config() {
        let config = SceneConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.window.width, 1280);
        assert!(!config.window.vsync);
        assert_eq!(config.window.title, "Morphosis");
        assert_eq!(config.assets.model, PathBuf::from("models/head.glb"));
        assert_eq!(config.simulation.gravity, 30.0);
        assert_eq!(config.simulation.particle_mass, 10.0);
        assert_eq!(config.sequence.seed, 99);
        assert_eq!(config.sequence.point_exit_delay, Duration::from_millis(750));
        assert_eq!(config.sequence.message_delay, Duration::from_secs(4));
    }

    #[test]
    fn empty_sections_fall_back_to_defaults() {
        let config = SceneConfig::from_toml_str("version = 1").unwrap();
        assert_eq!(config, SceneConfig::default());
    }

    #[test]
    fn rejects_unknown_version() {
        let err = SceneConfig::from_toml_str("version = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_inverted_distance_clamp() {
        let err = SceneConfig::from_toml_str(
            r#"
version = 1

[simulation]
distance_floor = 10.0
distance_ceiling = 5.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("distance_ceiling")));
    }

    #[test]
    fn rejects_non_positive_mass() {
        let err = SceneConfig::from_toml_str(
            r#"
version = 1

[simulation]
particle_mass = 0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_negative_duration() {
        let err = SceneConfig::from_toml_str(
            r#"
version = 1

[sequence]
point_exit_delay = -1
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn serialized_config_round_trips() {
        let config = SceneConfig::from_toml_str(SAMPLE).unwrap();
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("point_exit_delay = \"750ms\""));
        let reparsed = SceneConfig::from_toml_str(&text).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn load_resolves_assets_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.toml");
        fs::write(&path, SAMPLE).unwrap();
        let config = SceneConfig::load(&path).unwrap();
        assert_eq!(config.assets.image, dir.path().join("pictures/portrait.png"));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SceneConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use renderer::Antialiasing;

#[derive(Parser, Debug)]
#[command(
    name = "morphosis",
    author,
    version,
    about = "Particle sequence player",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Scene configuration file (TOML). Falls back to `$MORPHOSIS_CONFIG`.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Window size override, e.g. `1280x720`.
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Seed for every random draw in the sequence.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Present with vsync: `on` or `off`.
    #[arg(long, value_name = "on|off", value_parser = parse_switch)]
    pub vsync: Option<bool>,

    /// MSAA sample count: `auto`, `off`, or an explicit count (2, 4, 8, 16).
    #[arg(
        long,
        value_name = "SAMPLES",
        value_parser = parse_antialias,
        default_value = "auto"
    )]
    pub antialias: Antialiasing,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect the scene configuration.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved configuration as TOML.
    Show,
    /// Print where the default configuration file lives.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(Antialiasing::Auto),
        "off" | "none" | "disable" | "disabled" | "0" => Ok(Antialiasing::Off),
        _ => {
            let samples: u32 = normalized.parse().map_err(|_| {
                format!("invalid anti-alias sample count '{trimmed}'; use auto/off or 2/4/8/16")
            })?;

            if samples == 1 {
                return Ok(Antialiasing::Off);
            }

            if !matches!(samples, 2 | 4 | 8 | 16) {
                return Err(format!(
                    "unsupported sample count {samples}; supported values are 2, 4, 8, or 16"
                ));
            }

            Ok(Antialiasing::Samples(samples))
        }
    }
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{value}'; expected WIDTHxHEIGHT"))?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{}'", h.trim()))?;
    if width == 0 || height == 0 {
        return Err("window size must be greater than zero".into());
    }
    Ok((width, height))
}

pub fn parse_switch(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(format!("expected on or off, got '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_antialias_modes() {
        assert_eq!(parse_antialias("auto").unwrap(), Antialiasing::Auto);
        assert_eq!(parse_antialias("OFF").unwrap(), Antialiasing::Off);
        assert_eq!(parse_antialias("1").unwrap(), Antialiasing::Off);
        assert_eq!(parse_antialias("4").unwrap(), Antialiasing::Samples(4));
        assert!(parse_antialias("3").is_err());
        assert!(parse_antialias("").is_err());
    }

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_size(" 800X600 ").unwrap(), (800, 600));
        assert!(parse_size("0x600").is_err());
        assert!(parse_size("1280").is_err());
        assert!(parse_size("widex720").is_err());
    }

    #[test]
    fn parses_switches() {
        assert!(parse_switch("on").unwrap());
        assert!(!parse_switch("Off").unwrap());
        assert!(parse_switch("maybe").is_err());
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "morphosis",
            "--config",
            "scene.toml",
            "--size",
            "640x480",
            "--seed",
            "7",
            "--vsync",
            "off",
            "--antialias",
            "off",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(
            cli.run.config.config.as_deref(),
            Some(std::path::Path::new("scene.toml"))
        );
        assert_eq!(cli.run.size, Some((640, 480)));
        assert_eq!(cli.run.seed, Some(7));
        assert_eq!(cli.run.vsync, Some(false));
        assert_eq!(cli.run.antialias, Antialiasing::Off);
    }

    #[test]
    fn config_subcommand_accepts_a_file() {
        let cli = Cli::try_parse_from(["morphosis", "config", "show", "--config", "a.toml"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigCommand {
                action: ConfigAction::Show
            }))
        ));
        assert_eq!(
            cli.run.config.config.as_deref(),
            Some(std::path::Path::new("a.toml"))
        );
    }
}

mod cli;
mod paths;
mod run;

use anyhow::Result;
use cli::{Command, ConfigAction, RunArgs};
use paths::{AppPaths, ConfigOrigin};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Config(config_cmd)) => handle_config_command(config_cmd.action, &cli.run),
        None => run::run(cli.run),
    }
}

fn handle_config_command(action: ConfigAction, args: &RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    match action {
        ConfigAction::Show => run_config_show(&paths, args),
        ConfigAction::Where => run_config_where(&paths),
    }
}

fn run_config_show(paths: &AppPaths, args: &RunArgs) -> Result<()> {
    let (mut scene, origin) = run::load_scene(paths, args)?;
    run::apply_overrides(&mut scene, args);
    match &origin {
        ConfigOrigin::Defaults => println!("# built-in defaults"),
        other => {
            if let Some(path) = other.path() {
                println!("# loaded from {}", path.display());
            }
        }
    }
    print!("{}", scene.to_toml_string()?);
    Ok(())
}

fn run_config_where(paths: &AppPaths) -> Result<()> {
    let file = paths.default_config_file();
    let status = if file.is_file() { "" } else { " (not present)" };
    println!("{}{status}", file.display());
    Ok(())
}

mod cli;
mod options;
mod paths;
mod run;

use anyhow::Result;
use cli::{Command, ConfigAction, RunArgs};
use paths::AppPaths;

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
    let config_file = args.config.clone().unwrap_or_else(|| paths.config_file());

    match action {
        ConfigAction::Show => {
            let config = options::resolve(args, &paths.config_file())?;
            print!("{}", options::effective_config(&config).to_toml_string()?);
        }
        ConfigAction::Where => {
            let status = if config_file.exists() { "" } else { " (not present)" };
            println!("{}{status}", config_file.display());
        }
    }
    Ok(())
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use planeconfig::{parse_antialias, parse_fps, AntialiasSetting, FpsValue};

#[derive(Parser, Debug)]
#[command(
    name = "noiseplane",
    author,
    version,
    about = "Pointer-reactive noise plane rendered with wgpu",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Configuration file to load instead of `<config dir>/config.toml`.
    #[arg(long, value_name = "FILE", env = "NOISEPLANE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Frame rate: `auto` follows the display, a number fixes the tick rate.
    #[arg(long, value_name = "FPS|auto", value_parser = parse_fps)]
    pub fps: Option<FpsValue>,

    /// Override the pixel density instead of following the monitor scale factor.
    #[arg(long, value_name = "RATIO")]
    pub pixel_density: Option<f32>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<AntialiasSetting>,

    /// Fixed vertical field of view in degrees; derived from the window height when unset.
    #[arg(long, value_name = "DEGREES")]
    pub fov: Option<f32>,

    /// Camera distance from the plane.
    #[arg(long, value_name = "DISTANCE")]
    pub perspective: Option<f32>,

    /// Near clipping plane.
    #[arg(long, value_name = "DISTANCE")]
    pub near: Option<f32>,

    /// Far clipping plane.
    #[arg(long, value_name = "DISTANCE")]
    pub far: Option<f32>,

    /// Initial window size in logical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Window title.
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Start with the animation paused (space toggles it).
    #[arg(long)]
    pub paused: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect the configuration file and the settings it resolves to.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration after defaults and overrides.
    Show,
    /// Print the path of the configuration file.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid window width".to_string())?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid window height".to_string())?;
    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".into());
    }
    Ok((width, height))
}

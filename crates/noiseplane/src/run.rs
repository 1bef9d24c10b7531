use anyhow::Result;
use renderer::Renderer;
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::options;
use crate::paths::AppPaths;

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    tracing::debug!(
        config_dir = %paths.config_dir().display(),
        explicit = ?args.config,
        "resolved noiseplane paths"
    );

    let config = options::resolve(&args, &paths.config_file())?;
    tracing::info!(
        width = config.window_size.0,
        height = config.window_size.1,
        fps = ?config.options.fps,
        antialias = ?config.options.surface.antialias,
        pixel_density = ?config.options.surface.pixel_density,
        "starting renderer"
    );

    let mut renderer = Renderer::new(config);
    renderer.run()
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

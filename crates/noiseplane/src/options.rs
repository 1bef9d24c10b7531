//! Layers the configuration file, command-line overrides and renderer
//! defaults into the [`RendererConfig`] handed to the renderer.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use planeconfig::{
    AntialiasSetting, CameraSection, FpsValue, PlaneConfig, SurfaceSection, WindowSection,
};
use renderer::{
    Antialiasing, CameraOverrides, FpsSetting, ManagerOverrides, RendererConfig, SurfaceOverrides,
};

use crate::cli::RunArgs;

/// Reads the configuration file.
///
/// An explicit path must exist. The default location is optional and falls
/// back to an empty configuration when absent.
pub fn load_config(explicit: Option<&Path>, default_path: &Path) -> Result<PlaneConfig> {
    let (path, required) = match explicit {
        Some(path) => (path, true),
        None => (default_path, false),
    };

    if !required && !path.exists() {
        tracing::debug!(path = %path.display(), "no configuration file; using defaults");
        return Ok(PlaneConfig::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration {}", path.display()))?;
    let config = PlaneConfig::from_toml_str(&contents)
        .with_context(|| format!("failed to load configuration {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Collects the command-line flags that were actually given.
pub fn overrides_from_args(args: &RunArgs) -> PlaneConfig {
    PlaneConfig {
        fps: args.fps,
        camera: CameraSection {
            fov: args.fov,
            perspective: args.perspective,
            near: args.near,
            far: args.far,
        },
        surface: SurfaceSection {
            pixel_density: args.pixel_density,
            antialias: args.antialias,
        },
        window: WindowSection {
            width: args.size.map(|(width, _)| width),
            height: args.size.map(|(_, height)| height),
            title: args.title.clone(),
        },
        ..PlaneConfig::default()
    }
}

/// Loads the file, applies `args` on top and validates the result.
pub fn resolve(args: &RunArgs, default_path: &Path) -> Result<RendererConfig> {
    let mut config = load_config(args.config.as_deref(), default_path)?;
    config.merge(&overrides_from_args(args));
    config
        .validate()
        .context("command-line overrides produced an invalid configuration")?;

    let mut renderer_config = to_renderer_config(&config);
    let camera = renderer_config.options.camera;
    if camera.far <= camera.near {
        bail!(
            "camera far plane ({}) must be greater than the near plane ({})",
            camera.far,
            camera.near
        );
    }
    renderer_config.start_paused = args.paused;
    Ok(renderer_config)
}

fn fps_setting(value: FpsValue) -> FpsSetting {
    match value {
        FpsValue::Auto => FpsSetting::Auto,
        FpsValue::Fixed(rate) => FpsSetting::from_rate(rate),
    }
}

fn antialiasing(setting: AntialiasSetting) -> Antialiasing {
    match setting {
        AntialiasSetting::Auto => Antialiasing::Auto,
        AntialiasSetting::Off => Antialiasing::Off,
        other => other
            .samples()
            .map(Antialiasing::Samples)
            .unwrap_or(Antialiasing::Auto),
    }
}

pub fn to_renderer_config(config: &PlaneConfig) -> RendererConfig {
    let overrides = ManagerOverrides {
        camera: CameraOverrides {
            fov: config.camera.fov,
            perspective: config.camera.perspective,
            near: config.camera.near,
            far: config.camera.far,
        },
        surface: SurfaceOverrides {
            pixel_density: config.surface.pixel_density,
            antialias: config.surface.antialias.map(antialiasing),
        },
        fps: config.fps.map(fps_setting),
    };

    let defaults = RendererConfig::default();
    RendererConfig {
        window_size: (
            config.window.width.unwrap_or(defaults.window_size.0),
            config.window.height.unwrap_or(defaults.window_size.1),
        ),
        title: config.window.title.clone().unwrap_or(defaults.title),
        options: overrides.resolve(),
        start_paused: defaults.start_paused,
    }
}

/// Describes `config` with every renderer default written out.
///
/// Pixel density and field of view stay unset when they follow the monitor
/// scale factor and the window height.
pub fn effective_config(config: &RendererConfig) -> PlaneConfig {
    let options = &config.options;
    PlaneConfig {
        fps: Some(match options.fps {
            FpsSetting::Auto => FpsValue::Auto,
            FpsSetting::Fixed(rate) => FpsValue::Fixed(rate),
        }),
        camera: CameraSection {
            fov: options.camera.fov,
            perspective: Some(options.camera.perspective),
            near: Some(options.camera.near),
            far: Some(options.camera.far),
        },
        surface: SurfaceSection {
            pixel_density: options.surface.pixel_density,
            antialias: Some(match options.surface.antialias {
                Antialiasing::Auto => AntialiasSetting::Auto,
                Antialiasing::Off => AntialiasSetting::Off,
                Antialiasing::Samples(samples) => {
                    AntialiasSetting::from_samples(samples).unwrap_or(AntialiasSetting::Auto)
                }
            }),
        },
        window: WindowSection {
            width: Some(config.window_size.0),
            height: Some(config.window_size.1),
            title: Some(config.title.clone()),
        },
        ..PlaneConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_default_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(None, &dir.path().join("config.toml")).unwrap();
        assert_eq!(config, PlaneConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = load_config(Some(&missing), &dir.path().join("config.toml")).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn invalid_file_reports_its_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[camera]\nnear = -1\n").unwrap();
        let err = load_config(None, &path).unwrap_err();
        assert!(format!("{err:#}").contains("camera.near"));
    }

    #[test]
    fn flags_override_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "fps = 30\n[camera]\nperspective = 900\nnear = 2\n[window]\ntitle = \"file\"\n",
        )
        .unwrap();

        let args = RunArgs {
            perspective: Some(600.0),
            size: Some((640, 480)),
            paused: true,
            ..RunArgs::default()
        };
        let config = resolve(&args, &path).unwrap();

        assert_eq!(config.options.fps, FpsSetting::Fixed(30.0));
        assert_eq!(config.options.camera.perspective, 600.0);
        assert_eq!(config.options.camera.near, 2.0);
        assert_eq!(config.window_size, (640, 480));
        assert_eq!(config.title, "file");
        assert!(config.start_paused);
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let dir = TempDir::new().unwrap();
        let args = RunArgs {
            near: Some(50.0),
            far: Some(10.0),
            ..RunArgs::default()
        };
        assert!(resolve(&args, &dir.path().join("config.toml")).is_err());
    }

    #[test]
    fn near_plane_is_checked_against_the_default_far_plane() {
        let dir = TempDir::new().unwrap();
        let args = RunArgs {
            near: Some(20_000.0),
            ..RunArgs::default()
        };
        let err = resolve(&args, &dir.path().join("config.toml")).unwrap_err();
        assert!(err.to_string().contains("far plane"), "{err}");
    }

    #[test]
    fn far_plane_from_file_is_checked_against_near_flag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[camera]\nfar = 50\n").unwrap();
        let args = RunArgs {
            near: Some(60.0),
            ..RunArgs::default()
        };
        assert!(resolve(&args, &path).is_err());
    }

    #[test]
    fn antialias_and_fps_map_onto_renderer_settings() {
        assert_eq!(antialiasing(AntialiasSetting::Samples8), Antialiasing::Samples(8));
        assert_eq!(antialiasing(AntialiasSetting::Off), Antialiasing::Off);
        assert_eq!(fps_setting(FpsValue::Auto), FpsSetting::Auto);
        assert_eq!(fps_setting(FpsValue::Fixed(24.0)), FpsSetting::Fixed(24.0));
    }

    #[test]
    fn effective_config_spells_out_defaults() {
        let effective = effective_config(&to_renderer_config(&PlaneConfig::default()));
        assert_eq!(effective.fps, Some(FpsValue::Auto));
        assert_eq!(effective.camera.fov, None);
        assert_eq!(effective.camera.perspective, Some(800.0));
        assert_eq!(effective.camera.near, Some(1.0));
        assert_eq!(effective.camera.far, Some(10_000.0));
        assert_eq!(effective.surface.antialias, Some(AntialiasSetting::Auto));
        assert_eq!(effective.window.width, Some(1280));
        assert!(effective.validate().is_ok());
    }
}

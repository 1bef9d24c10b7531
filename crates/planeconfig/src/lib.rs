use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;

/// Slowest fixed frame rate accepted in a configuration.
pub const MIN_FPS: f32 = 0.1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialise configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Frame rate: follow the display (`"auto"`) or a fixed number of frames per
/// second. A rate of `0` is read as `auto`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FpsValue {
    #[default]
    Auto,
    Fixed(f32),
}

impl Serialize for FpsValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FpsValue::Auto => serializer.serialize_str("auto"),
            FpsValue::Fixed(rate) => serializer.serialize_f64(f64::from(*rate)),
        }
    }
}

fn fps_from_number(value: f64) -> Result<FpsValue, String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("fps must be 'auto' or a non-negative number, got {value}"));
    }
    if value == 0.0 {
        Ok(FpsValue::Auto)
    } else {
        Ok(FpsValue::Fixed(value as f32))
    }
}

/// Parses `auto` or a frame rate in frames per second.
pub fn parse_fps(raw: &str) -> Result<FpsValue, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    if normalized == "auto" {
        return Ok(FpsValue::Auto);
    }
    let value: f64 = normalized
        .parse()
        .map_err(|_| format!("invalid fps '{raw}'; expected 'auto' or a number"))?;
    fps_from_number(value)
}

impl<'de> Deserialize<'de> for FpsValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;
        impl<'de> de::Visitor<'de> for Visitor {
            type Value = FpsValue;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("\"auto\" or a frame rate in frames per second")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                parse_fps(v).map_err(E::custom)
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                fps_from_number(v as f64).map_err(E::custom)
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                fps_from_number(v as f64).map_err(E::custom)
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                fps_from_number(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntialiasSetting {
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

impl AntialiasSetting {
    pub fn from_samples(samples: u32) -> Option<Self> {
        match samples {
            0 | 1 => Some(Self::Off),
            2 => Some(Self::Samples2),
            4 => Some(Self::Samples4),
            8 => Some(Self::Samples8),
            16 => Some(Self::Samples16),
            _ => None,
        }
    }

    /// MSAA sample count, or `None` for `auto`.
    pub fn samples(self) -> Option<u32> {
        match self {
            Self::Auto => None,
            Self::Off => Some(1),
            Self::Samples2 => Some(2),
            Self::Samples4 => Some(4),
            Self::Samples8 => Some(8),
            Self::Samples16 => Some(16),
        }
    }
}

impl Serialize for AntialiasSetting {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::Off => serializer.serialize_str("off"),
            other => serializer.serialize_u32(other.samples().unwrap_or(1)),
        }
    }
}

impl<'de> Deserialize<'de> for AntialiasSetting {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Str(String),
            Num(i64),
        }

        match Helper::deserialize(deserializer)? {
            Helper::Str(raw) => parse_antialias(&raw).map_err(de::Error::custom),
            Helper::Num(value) => {
                if value < 0 {
                    return Err(de::Error::custom("antialias value must be non-negative"));
                }
                parse_antialias(&value.to_string()).map_err(de::Error::custom)
            }
        }
    }
}

pub fn parse_antialias(raw: &str) -> Result<AntialiasSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(AntialiasSetting::Auto),
        "off" | "none" | "disable" | "disabled" | "0" | "1" => Ok(AntialiasSetting::Off),
        "2" => Ok(AntialiasSetting::Samples2),
        "4" => Ok(AntialiasSetting::Samples4),
        "8" => Ok(AntialiasSetting::Samples8),
        "16" => Ok(AntialiasSetting::Samples16),
        other => Err(format!("invalid antialias setting '{other}'")),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CameraSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fov: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perspective: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub near: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub far: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SurfaceSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_density: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub antialias: Option<AntialiasSetting>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WindowSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// On-disk configuration. Every setting is optional; unset values fall back
/// to the renderer's defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlaneConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<FpsValue>,
    #[serde(default)]
    pub camera: CameraSection,
    #[serde(default)]
    pub surface: SurfaceSection,
    #[serde(default)]
    pub window: WindowSection,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            fps: None,
            camera: CameraSection::default(),
            surface: SurfaceSection::default(),
            window: WindowSection::default(),
        }
    }
}

fn check_positive(name: &str, value: Option<f32>) -> Result<(), ConfigError> {
    match value {
        Some(value) if !value.is_finite() || value <= 0.0 => Err(ConfigError::Invalid(format!(
            "{name} must be a finite number greater than zero, got {value}"
        ))),
        _ => Ok(()),
    }
}

impl PlaneConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: PlaneConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
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

        if let Some(FpsValue::Fixed(rate)) = self.fps {
            check_positive("fps", Some(rate))?;
            if rate < MIN_FPS {
                return Err(ConfigError::Invalid(format!(
                    "fps must be at least {MIN_FPS} or 'auto', got {rate}"
                )));
            }
        }

        let camera = &self.camera;
        if let Some(fov) = camera.fov {
            if !fov.is_finite() || fov <= 0.0 || fov >= 180.0 {
                return Err(ConfigError::Invalid(format!(
                    "camera.fov must be between 0 and 180 degrees, got {fov}"
                )));
            }
        }
        check_positive("camera.perspective", camera.perspective)?;
        check_positive("camera.near", camera.near)?;
        check_positive("camera.far", camera.far)?;
        if let (Some(near), Some(far)) = (camera.near, camera.far) {
            if far <= near {
                return Err(ConfigError::Invalid(format!(
                    "camera.far ({far}) must be greater than camera.near ({near})"
                )));
            }
        }

        check_positive("surface.pixel_density", self.surface.pixel_density)?;

        for (name, value) in [("window.width", self.window.width), ("window.height", self.window.height)] {
            if value == Some(0) {
                return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
            }
        }
        if let Some(title) = &self.window.title {
            if title.trim().is_empty() {
                return Err(ConfigError::Invalid("window.title may not be empty".into()));
            }
        }

        Ok(())
    }

    /// Overlays every value set in `overrides` on top of `self`.
    pub fn merge(&mut self, overrides: &PlaneConfig) {
        fn take<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        take(&mut self.fps, &overrides.fps);
        take(&mut self.camera.fov, &overrides.camera.fov);
        take(&mut self.camera.perspective, &overrides.camera.perspective);
        take(&mut self.camera.near, &overrides.camera.near);
        take(&mut self.camera.far, &overrides.camera.far);
        take(&mut self.surface.pixel_density, &overrides.surface.pixel_density);
        take(&mut self.surface.antialias, &overrides.surface.antialias);
        take(&mut self.window.width, &overrides.window.width);
        take(&mut self.window.height, &overrides.window.height);
        take(&mut self.window.title, &overrides.window.title);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1
fps = 30

[camera]
perspective = 900
near = 2.5
far = 5000

[surface]
pixel_density = 2
antialias = "4"

[window]
width = 1024
height = 768
title = "drift"
"#;

    #[test]
    fn parses_sample_config() {
        let config = PlaneConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.version, 1);
        assert_eq!(config.fps, Some(FpsValue::Fixed(30.0)));
        assert_eq!(config.camera.perspective, Some(900.0));
        assert_eq!(config.camera.fov, None);
        assert_eq!(config.surface.pixel_density, Some(2.0));
        assert_eq!(config.surface.antialias, Some(AntialiasSetting::Samples4));
        assert_eq!(config.window.title.as_deref(), Some("drift"));
    }

    #[test]
    fn empty_file_is_a_valid_config() {
        let config = PlaneConfig::from_toml_str("").expect("parse empty");
        assert_eq!(config, PlaneConfig::default());
    }

    #[test]
    fn fps_accepts_auto_numbers_and_zero() {
        let auto = PlaneConfig::from_toml_str("fps = \"auto\"").unwrap();
        assert_eq!(auto.fps, Some(FpsValue::Auto));
        let zero = PlaneConfig::from_toml_str("fps = 0").unwrap();
        assert_eq!(zero.fps, Some(FpsValue::Auto));
        let float = PlaneConfig::from_toml_str("fps = 24.5").unwrap();
        assert_eq!(float.fps, Some(FpsValue::Fixed(24.5)));
        assert!(PlaneConfig::from_toml_str("fps = -1").is_err());
        assert!(PlaneConfig::from_toml_str("fps = \"fast\"").is_err());
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = PlaneConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_inverted_clipping_planes() {
        let err = PlaneConfig::from_toml_str("[camera]\nnear = 10\nfar = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_fps_below_minimum() {
        let err = PlaneConfig::from_toml_str("fps = 1e-20").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(PlaneConfig::from_toml_str("fps = 0.1").is_ok());
    }

    #[test]
    fn rejects_non_positive_density() {
        let err = PlaneConfig::from_toml_str("[surface]\npixel_density = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = PlaneConfig::from_toml_str("[camera]\nzoom = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn merge_overlays_only_set_values() {
        let mut config = PlaneConfig::from_toml_str(SAMPLE).unwrap();
        let overrides = PlaneConfig {
            fps: Some(FpsValue::Auto),
            camera: CameraSection {
                fov: Some(45.0),
                ..CameraSection::default()
            },
            ..PlaneConfig::default()
        };
        config.merge(&overrides);
        assert_eq!(config.fps, Some(FpsValue::Auto));
        assert_eq!(config.camera.fov, Some(45.0));
        assert_eq!(config.camera.perspective, Some(900.0));
        assert_eq!(config.window.width, Some(1024));
    }

    #[test]
    fn serialises_back_to_parseable_toml() {
        let config = PlaneConfig::from_toml_str(SAMPLE).unwrap();
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("fps = 30.0"), "{rendered}");
        assert!(rendered.contains("antialias = 4"), "{rendered}");
        assert_eq!(PlaneConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn antialias_aliases() {
        assert_eq!(parse_antialias("MAX"), Ok(AntialiasSetting::Auto));
        assert_eq!(parse_antialias("none"), Ok(AntialiasSetting::Off));
        assert_eq!(parse_antialias("16"), Ok(AntialiasSetting::Samples16));
        assert!(parse_antialias("3").is_err());
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::homography::HeightPolicy;
use crate::mapper::DEFAULT_CIRCLE_SAMPLES;
use crate::resolve::ResolverConfig;

/// Tunables for a rectification run, loadable from TOML.
///
/// ```toml
/// circle_samples = 24
/// out_of_frame_warn = 0.4
/// height = { fixed = 900 }
///
/// [resolver]
/// dedup_tolerance = 3.0
/// min_area = 5000.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifyConfig {
    pub resolver: ResolverConfig,
    pub height: HeightPolicy,
    /// Boundary samples per mapped circle.
    pub circle_samples: usize,
    /// Out-of-frame share above which a warning diagnostic is raised.
    pub out_of_frame_warn: f64,
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            height: HeightPolicy::default(),
            circle_samples: DEFAULT_CIRCLE_SAMPLES,
            out_of_frame_warn: 0.5,
        }
    }
}

impl RectifyConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Range-check every field. Call again after overriding fields in code.
    pub fn validate(&self) -> Result<()> {
        if !(self.resolver.dedup_tolerance >= 0.0) {
            return Err(Error::Config(format!(
                "resolver.dedup_tolerance must be non-negative, got {}",
                self.resolver.dedup_tolerance
            )));
        }
        if !(self.resolver.min_area >= 0.0) {
            return Err(Error::Config(format!(
                "resolver.min_area must be non-negative, got {}",
                self.resolver.min_area
            )));
        }
        if self.circle_samples < 3 {
            return Err(Error::Config(format!(
                "circle_samples must be at least 3, got {}",
                self.circle_samples
            )));
        }
        if !(0.0..=1.0).contains(&self.out_of_frame_warn) {
            return Err(Error::Config(format!(
                "out_of_frame_warn must lie in [0, 1], got {}",
                self.out_of_frame_warn
            )));
        }
        if self.height == HeightPolicy::Fixed(0) {
            return Err(Error::Config("height = { fixed = 0 } is not a valid height".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        assert_eq!(RectifyConfig::from_toml_str("").unwrap(), RectifyConfig::default());
    }

    #[test]
    fn partial_override() {
        let config = RectifyConfig::from_toml_str(
            r#"
            circle_samples = 24
            height = "aspect_normalized"

            [resolver]
            min_area = 5000.0
            "#,
        )
        .unwrap();
        assert_eq!(config.circle_samples, 24);
        assert_eq!(config.height, HeightPolicy::AspectNormalized);
        assert_eq!(config.resolver.min_area, 5000.0);
        assert_eq!(config.resolver.dedup_tolerance, 5.0);
        assert_eq!(config.out_of_frame_warn, 0.5);
    }

    #[test]
    fn fixed_height_table() {
        let config = RectifyConfig::from_toml_str("height = { fixed = 900 }").unwrap();
        assert_eq!(config.height, HeightPolicy::Fixed(900));
    }

    #[test]
    fn rejects_bad_values() {
        for bad in [
            "circle_samples = 2",
            "out_of_frame_warn = 1.5",
            "height = { fixed = 0 }",
            "[resolver]\nmin_area = -1.0",
            "height = \"sideways\"",
        ] {
            assert!(
                matches!(RectifyConfig::from_toml_str(bad), Err(Error::Config(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rectify.toml");
        std::fs::write(&path, "out_of_frame_warn = 0.25\n").unwrap();
        assert_eq!(RectifyConfig::load(&path).unwrap().out_of_frame_warn, 0.25);
    }

    #[test]
    fn overrides_are_validated() {
        let mut config = RectifyConfig::default();
        config.resolver.min_area = f64::NAN;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = RectifyConfig::default();
        config.resolver.dedup_tolerance = -2.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = RectifyConfig {
            height: HeightPolicy::Fixed(0),
            ..RectifyConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(RectifyConfig::default().validate().is_ok());
    }
}

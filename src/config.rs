//! Parser configuration
//!
//! `defaults/opgram.default.toml` is embedded into the crate so that the documented defaults
//! and [`ParserConfig::default`] never drift apart. [`ParserConfig::load`] layers a user file
//! and key overrides on top of them.

use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/opgram.default.toml");

/// Everything a [`Parser`](crate::Parser) can be tuned with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParserConfig {
    pub limits: LimitsConfig,
    pub diagnostics: DiagnosticsConfig,
}

/// Resource guards applied per parse call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LimitsConfig {
    /// Enclosures nested deeper than this fail with a limit error
    pub max_depth: usize,
    /// Inputs longer than this fail with a limit error; 0 disables the check
    pub max_input_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiagnosticsConfig {
    pub excerpt_width: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            limits: LimitsConfig {
                max_depth: 256,
                max_input_bytes: 0,
            },
            diagnostics: DiagnosticsConfig { excerpt_width: 80 },
        }
    }
}

impl ParserConfig {
    /// The embedded defaults, then `file` when one is given, then `overrides` as dotted keys
    /// (`"limits.max_depth"`). A named file that does not exist is an error.
    pub fn load(file: Option<&Path>, overrides: &[(&str, i64)]) -> Result<Self, ConfigError> {
        let mut layers =
            Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        if let Some(path) = file {
            layers = layers.add_source(File::from(path).format(FileFormat::Toml));
        }
        for &(key, value) in overrides {
            layers = layers.set_override(key, value)?;
        }

        let config: Self = layers.build()?.try_deserialize()?;
        tracing::debug!(
            file = ?file,
            max_depth = config.limits.max_depth,
            max_input_bytes = config.limits.max_input_bytes,
            excerpt_width = config.diagnostics.excerpt_width,
            "parser configuration loaded"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_defaults_match_default_impl() {
        let config = ParserConfig::load(None, &[]).expect("defaults to deserialize");
        assert_eq!(config, ParserConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = ParserConfig::load(None, &[("limits.max_depth", 4)]).expect("config to build");
        assert_eq!(config.limits.max_depth, 4);
        assert_eq!(config.diagnostics.excerpt_width, 80);
    }

    #[test]
    fn test_file_layer() {
        let path = std::env::temp_dir().join(format!("opgram-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[diagnostics]\nexcerpt_width = 40").unwrap();

        let config = ParserConfig::load(Some(path.as_path()), &[("limits.max_input_bytes", 1024)]);
        std::fs::remove_file(&path).unwrap();
        let config = config.unwrap();
        assert_eq!(config.diagnostics.excerpt_width, 40);
        assert_eq!(config.limits.max_input_bytes, 1024);
        assert_eq!(config.limits.max_depth, 256);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ParserConfig::load(Some(Path::new("/nonexistent/opgram.toml")), &[]);
        assert!(result.is_err());
    }
}

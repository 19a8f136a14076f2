//! Configuration management for saykit.
//!
//! Loads config from YAML files in standard locations. Every field has a
//! default, so a missing or partial file is fine.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Result, SayError};
use crate::platform::{Engine, Platform};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `auto` or an engine name (`say`, `festival`, `espeak-ng`, `sapi`).
    pub engine: String,
    /// Replaces the engine's default executable.
    pub program: Option<String>,
    pub voice: Option<String>,
    pub speed: Option<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: "auto".into(),
            program: None,
            voice: None,
            speed: None,
        }
    }
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./saykit.yaml
    /// 2. ~/.config/saykit/config.yaml
    /// 3. /etc/saykit/config.yaml
    pub fn load(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("saykit.yaml")),
                dirs::home_dir().map(|h| h.join(".config/saykit/config.yaml")),
                Some(PathBuf::from("/etc/saykit/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", config_path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        serde_yml::from_str(contents).map_err(|e| SayError::Config(e.to_string()))
    }

    /// The configured engine, with `auto` resolved for the current OS.
    pub fn engine(&self) -> Result<Engine> {
        match self.engine.trim() {
            "" | "auto" => Ok(Engine::native()),
            name => name.parse(),
        }
    }

    pub fn platform(&self) -> Result<Box<dyn Platform>> {
        Ok(self.engine()?.platform(self.program.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_to_native_engine() {
        let config = Config::default();
        assert_eq!(config.engine().unwrap(), Engine::native());
        assert!(config.voice.is_none());
        assert!(config.speed.is_none());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = Config::parse("voice: Alex\nspeed: 1.25\n").unwrap();
        assert_eq!(config.engine, "auto");
        assert_eq!(config.voice.as_deref(), Some("Alex"));
        assert_eq!(config.speed, Some(1.25));
    }

    #[test]
    fn engine_and_program_from_yaml() {
        let config = Config::parse("engine: espeak-ng\nprogram: /usr/local/bin/espeak-ng\n").unwrap();
        assert_eq!(config.engine().unwrap(), Engine::EspeakNg);
        assert_eq!(config.platform().unwrap().name(), "espeak-ng");
    }

    #[test]
    fn unknown_engine_is_a_config_error() {
        let config = Config::parse("engine: dectalk\n").unwrap();
        assert!(matches!(config.engine(), Err(SayError::Config(_))));
    }

    #[test]
    fn load_reads_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "engine: festival\nvoice: kal_diphone").unwrap();

        let config = Config::load(Some(file.path()));
        assert_eq!(config.engine().unwrap(), Engine::Festival);
        assert_eq!(config.voice.as_deref(), Some("kal_diphone"));
    }

    #[test]
    fn load_falls_back_on_bad_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "speed: [not, a, number").unwrap();

        assert_eq!(Config::load(Some(file.path())), Config::default());
    }
}

//! Layered configuration.
//!
//! Settings are resolved from three sources, later ones winning:
//! built-in defaults, a TOML file (`docwatch.toml` unless overridden with
//! `--config`), and environment variables prefixed with `DOCWATCH_` where a
//! double underscore separates nesting levels:
//!
//! - `DOCWATCH_FILTER__PREFIX=draft-` sets `filter.prefix`
//! - `DOCWATCH_LOGGING__RETENTION_DAYS=14` sets `logging.retention_days`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file, resolved against the working directory.
pub const CONFIG_FILE: &str = "docwatch.toml";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Directories to observe.
    #[serde(default)]
    pub watch: WatchConfig,

    /// Naming convention a created file must match to become a job.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Conversion stage wiring.
    #[serde(default)]
    pub convert: ConvertConfig,

    /// Log output and retention.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct WatchConfig {
    /// Root paths watched recursively. May be left empty and supplied on the
    /// command line or interactively at startup.
    #[serde(default)]
    pub roots: Vec<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FilterConfig {
    /// Required filename prefix (case-sensitive).
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Structured-input extension, without the dot (case-insensitive).
    #[serde(default = "default_input_extension")]
    pub input_extension: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConvertConfig {
    /// External stage-1 program, resolved through PATH.
    #[serde(default = "default_formatter_program")]
    pub formatter_program: String,

    /// Intermediate format identifier, also used as the temp file extension.
    #[serde(default = "default_intermediate_format")]
    pub intermediate_format: String,

    /// Extension of the final artifact, without the dot.
    #[serde(default = "default_final_extension")]
    pub final_extension: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Level filter applied when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Directory receiving the daily-rolled log files.
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,

    /// Rolled files older than this many days are purged at startup.
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
}

fn default_prefix() -> String {
    "config-".to_string()
}
fn default_input_extension() -> String {
    "xml".to_string()
}
fn default_formatter_program() -> String {
    "pf-format".to_string()
}
fn default_intermediate_format() -> String {
    "md".to_string()
}
fn default_final_extension() -> String {
    "html".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}
fn default_retention_days() -> u64 {
    60
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            input_extension: default_input_extension(),
        }
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            formatter_program: default_formatter_program(),
            intermediate_format: default_intermediate_format(),
            final_extension: default_final_extension(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            dir: default_log_dir(),
            retention_days: default_retention_days(),
        }
    }
}

impl Settings {
    /// Load configuration from defaults, the TOML file, and the environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self, Box<figment::Error>> {
        let path = config_file.unwrap_or(Path::new(CONFIG_FILE));

        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            // Double underscore becomes a dot, single underscore stays part
            // of the field name
            .merge(
                Env::prefixed("DOCWATCH_")
                    .map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
            )
            .extract()
            .map_err(Box::new)
    }

    /// Save the settings as pretty TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create the default settings file in the working directory.
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;

        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_the_documented_convention() {
        let settings = Settings::default();

        assert!(settings.watch.roots.is_empty());
        assert_eq!(settings.filter.prefix, "config-");
        assert_eq!(settings.filter.input_extension, "xml");
        assert_eq!(settings.convert.formatter_program, "pf-format");
        assert_eq!(settings.convert.intermediate_format, "md");
        assert_eq!(settings.convert.final_extension, "html");
        assert_eq!(settings.logging.default, "info");
        assert_eq!(settings.logging.retention_days, 60);
    }

    #[test]
    fn file_overrides_layer_over_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docwatch.toml");
        std::fs::write(
            &path,
            r#"
[watch]
roots = ["/srv/incoming"]

[filter]
prefix = "draft-"
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();

        assert_eq!(settings.watch.roots, vec![PathBuf::from("/srv/incoming")]);
        assert_eq!(settings.filter.prefix, "draft-");
        // Untouched sections keep their defaults
        assert_eq!(settings.filter.input_extension, "xml");
        assert_eq!(settings.convert.intermediate_format, "md");
    }

    #[test]
    fn save_round_trips_through_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.toml");

        let mut settings = Settings::default();
        settings.convert.final_extension = "docx".to_string();
        settings.save(&path).unwrap();

        let reloaded: Settings =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reloaded.convert.final_extension, "docx");
        assert_eq!(reloaded.filter.prefix, "config-");
    }
}

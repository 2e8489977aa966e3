//! Loader for Gleaner configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are added, environment last:
//! `GLEANER_`-prefixed variables use `__` between nesting levels, so
//! `GLEANER_FETCH__TIMEOUT_MS=2500` overrides `fetch.timeout_ms`. String values
//! may reference other variables as `${VAR}`; expansion is applied after
//! merging. Every section is optional.
//!
//! ```yaml
//! fetch:
//!   timeout_ms: 10000
//!   user_agent: "my-bot/1.0"
//!   max_body_bytes: 5242880
//! logging:
//!   format: json
//!   emit_stderr: true
//!   filter: "gleaner=debug"
//!   dir: "~/.cache/gleaner/logs"
//! preview_chars: 500
//! ```
use config::{Config, ConfigError, Environment, File};
use gleaner_common::observability::{LogConfig, LogFormat};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Characters of extracted text the CLI prints before the ellipsis.
pub const DEFAULT_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GleanerConfig {
    pub fetch: FetchSettings,
    pub logging: LoggingSettings,
    pub preview_chars: usize,
}

impl Default for GleanerConfig {
    fn default() -> Self {
        Self {
            fetch: FetchSettings::default(),
            logging: LoggingSettings::default(),
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

/// Fetcher overrides; `None` keeps the fetcher's built-in default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
    pub max_body_bytes: Option<usize>,
}

impl FetchSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub format: LogFormat,
    pub emit_stderr: bool,
    /// Filter used when `RUST_LOG` is unset.
    pub filter: String,
    pub dir: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            emit_stderr: false,
            filter: "info".into(),
            dir: None,
        }
    }
}

impl LoggingSettings {
    /// Translate into the initializer settings for `app_name`.
    pub fn to_log_config(&self, app_name: &'static str) -> LogConfig {
        LogConfig {
            app_name,
            log_dir: self.dir.clone(),
            emit_stderr: self.emit_stderr,
            format: self.format,
            default_filter: self.filter.clone(),
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

fn validate(cfg: &GleanerConfig) -> Result<(), ConfigError> {
    if cfg.fetch.timeout_ms == Some(0) {
        return Err(ConfigError::Message(
            "fetch.timeout_ms must be positive".into(),
        ));
    }
    if cfg.fetch.user_agent.as_deref().is_some_and(str::is_empty) {
        return Err(ConfigError::Message(
            "fetch.user_agent must not be empty".into(),
        ));
    }
    Ok(())
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct GleanerConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for GleanerConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl GleanerConfigLoader {
    /// Start with no files; `GLEANER_` environment overrides are always applied.
    ///
    /// ```
    /// use gleaner_config::GleanerConfigLoader;
    ///
    /// let config = GleanerConfigLoader::new()
    ///     .with_yaml_str("preview_chars: 80")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.preview_chars, 80);
    /// assert_eq!(config.fetch.timeout_ms, None);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet (tests, embedded defaults).
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// Files and snippets apply in the order they were added, and the
    /// environment is layered on top, so `GLEANER_*` variables always win.
    /// `${VAR}` placeholders are expanded before the typed structs are
    /// materialised.
    ///
    /// ```
    /// use gleaner_config::GleanerConfigLoader;
    ///
    /// unsafe { std::env::set_var("GLEANER_DOC_UA", "doc-bot/2.0"); }
    ///
    /// let config = GleanerConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// fetch:
    ///   timeout_ms: 2500
    ///   user_agent: "${GLEANER_DOC_UA}"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.fetch.timeout_ms, Some(2500));
    /// assert_eq!(config.fetch.user_agent.as_deref(), Some("doc-bot/2.0"));
    ///
    /// unsafe { std::env::remove_var("GLEANER_DOC_UA"); }
    /// ```
    pub fn load(self) -> Result<GleanerConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("GLEANER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: GleanerConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        validate(&typed)?;
        Ok(typed)
    }
}

//! Layered configuration loading.
//!
//! Layers are applied in call order, each one overriding only the keys it
//! sets:
//!
//! 1. Built-in defaults (or a preset)
//! 2. Configuration files or strings, TOML or JSON
//! 3. Environment variables, `PREFIX__SECTION__KEY`
//!
//! Environment overrides are applied last, in [`ConfigLoader::load`],
//! regardless of when the prefix was set.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use plinth_server::Signal;
use plinth_telemetry::{LogConfig, LogFormat};
use serde_json::Value;

use crate::config::PlinthConfig;
use crate::error::ConfigError;

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Builds a [`PlinthConfig`] from layered sources.
///
/// # Example
///
/// ```no_run
/// use plinth_config::ConfigLoader;
///
/// # fn main() -> Result<(), plinth_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_production()
///     .with_optional_file("plinth.toml")?
///     .with_dotenv()?
///     .with_env_prefix("PLINTH")
///     .load()?;
///
/// let server_config = config.server.to_server_config();
/// # let _ = server_config;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config: PlinthConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Creates a loader seeded with [`PlinthConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets to the built-in defaults.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = PlinthConfig::default();
        self
    }

    /// Uses human-readable debug logging.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config.logging = LogConfig::development();
        self
    }

    /// Uses JSON logging at `info`.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config.logging = LogConfig::production();
        self
    }

    /// Layers a configuration file. The format follows the extension,
    /// `.toml` or `.json`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, has an
    /// unsupported extension, or does not parse.
    pub fn with_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        self.read_file(path)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            self.read_file(path)
        } else {
            Ok(self)
        }
    }

    /// Layers configuration from a string in the named format.
    ///
    /// ```
    /// use plinth_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[server]\nhttp_addr = \"127.0.0.1:3000\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the format is unsupported or parsing fails.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let format = Format::from_name(format)
            .ok_or_else(|| ConfigError::UnsupportedFormat(format.to_string()))?;
        self.merge_document(content, format)?;
        Ok(self)
    }

    /// Sets the prefix for environment overrides.
    ///
    /// With prefix `PLINTH`, `PLINTH__SERVER__HTTP_ADDR=0.0.0.0:9000`
    /// overrides `server.http_addr`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads `.env` from the current directory into the process environment,
    /// if present. Variables already set are not overwritten.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file exists but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(source) => Err(ConfigError::Dotenv {
                path: PathBuf::from(".env"),
                source,
            }),
        }
    }

    /// Loads a specific env file into the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file is missing or malformed.
    pub fn with_dotenv_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        dotenvy::from_path(path).map_err(|source| ConfigError::Dotenv {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self)
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or the final
    /// configuration is invalid.
    pub fn load(mut self) -> Result<PlinthConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_vars(&prefix, env::vars_os())?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the layered configuration without environment overrides or
    /// validation.
    #[must_use]
    pub fn load_unvalidated(self) -> PlinthConfig {
        self.config
    }

    fn read_file(mut self, path: &Path) -> Result<Self, ConfigError> {
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_name)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        self.merge_document(&content, format)?;
        Ok(self)
    }

    // The typed parse reports unknown fields with the format's own
    // diagnostics. The untyped parse is what gets merged.
    fn merge_document(&mut self, content: &str, format: Format) -> Result<(), ConfigError> {
        let overlay: Value = match format {
            Format::Toml => {
                toml::from_str::<PlinthConfig>(content)?;
                serde_json::to_value(toml::from_str::<toml::Table>(content)?)?
            }
            Format::Json => {
                serde_json::from_str::<PlinthConfig>(content)?;
                serde_json::from_str(content)?
            }
        };

        let mut base = serde_json::to_value(&self.config)?;
        merge_values(&mut base, overlay);
        self.config = serde_json::from_value(base)?;
        Ok(())
    }

    // Keys that are not UTF-8 cannot carry the prefix and are skipped.
    fn apply_env_vars<I>(&mut self, prefix: &str, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let scoped = format!("{prefix}__");
        for (key, value) in vars {
            let Some(key) = key.to_str() else { continue };
            let Some(path) = key.strip_prefix(&scoped) else { continue };
            let value = value
                .to_str()
                .ok_or_else(|| ConfigError::env_parse_error(key, "value is not valid UTF-8"))?;
            self.apply_env_var(key, path, value)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, path: &str, value: &str) -> Result<(), ConfigError> {
        let parts: Vec<&str> = path.split("__").collect();
        let server = &mut self.config.server;
        let logging = &mut self.config.logging;

        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => server.http_addr = value.to_string(),
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                server.shutdown_timeout_secs = parse(key, value, "expected integer")?;
            }
            ["SERVER", "SIGNALS"] => server.signals = parse_signals(key, value)?,
            ["SERVER", "MAX_BODY_BYTES"] => {
                server.max_body_bytes = parse(key, value, "expected integer")?;
            }
            ["SERVER", "KEEP_ALIVE"] => server.keep_alive = parse_bool(key, value)?,
            ["SERVER", "HEADER_READ_TIMEOUT_SECS"] => {
                server.header_read_timeout_secs = parse(key, value, "expected integer")?;
            }

            ["LOGGING", "ENABLED"] => logging.enabled = parse_bool(key, value)?,
            ["LOGGING", "LEVEL"] => logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                logging.format = parse::<LogFormat>(
                    key,
                    value,
                    "expected 'json', 'pretty' or 'compact'",
                )?;
            }
            ["LOGGING", "SPAN_EVENTS"] => logging.span_events = parse_bool(key, value)?,
            ["LOGGING", "FILE_LINE_INFO"] => logging.file_line_info = parse_bool(key, value)?,
            ["LOGGING", "THREAD_IDS"] => logging.thread_ids = parse_bool(key, value)?,
            ["LOGGING", "INCLUDE_TARGET"] => logging.include_target = parse_bool(key, value)?,

            _ => return Err(ConfigError::env_parse_error(key, "unknown configuration key")),
        }

        Ok(())
    }
}

/// Recursively overlays `overlay` onto `base`. Tables merge key by key,
/// anything else replaces.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn parse<T: FromStr>(key: &str, value: &str, expected: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, expected))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env_parse_error(key, "expected boolean")),
    }
}

/// Comma-separated signal names. An empty value clears the set.
fn parse_signals(key: &str, value: &str) -> Result<Vec<Signal>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            name.parse::<Signal>()
                .map_err(|e| ConfigError::env_parse_error(key, e.to_string()))
        })
        .collect()
}

//! Framework configuration.
//!
//! Values are layered the same way the surrounding test suites expect them:
//! built-in defaults, overridden by an optional TOML file, overridden by
//! `ESPERAR_*` environment variables (the command-line escape hatch).
//! The engine itself only ever reads the resulting [`Settings`] — it never
//! reloads or mutates configuration.

use crate::result::{EsperarError, EsperarResult};
use crate::wait::{DEFAULT_EXPLICIT_WAIT_SECS, DEFAULT_POLL_INTERVAL_MS};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Environment variable prefix for overrides (`ESPERAR_BASE_URL`, ...)
pub const ENV_PREFIX: &str = "ESPERAR";

/// Browser the session factory should launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    /// Chrome / Chromium
    #[default]
    Chrome,
    /// Firefox
    Firefox,
    /// Edge
    Edge,
}

impl BrowserKind {
    /// Parse a browser name, falling back to Chrome for unknown values
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "firefox" => Self::Firefox,
            "edge" => Self::Edge,
            _ => Self::Chrome,
        }
    }

    /// Canonical lowercase name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
            Self::Edge => "edge",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved framework configuration.
///
/// Read-only from the engine's perspective; components that need a value
/// repeatedly cache it themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Application under test (required)
    #[serde(default)]
    pub base_url: String,
    /// Browser to launch
    #[serde(default)]
    pub browser: BrowserKind,
    /// Run the browser without a visible window
    #[serde(default)]
    pub headless: bool,
    /// Implicit wait applied by the driver, in seconds
    #[serde(default = "default_implicit_wait_secs")]
    pub implicit_wait_secs: u64,
    /// Explicit wait budget for readiness polling, in seconds
    #[serde(default = "default_explicit_wait_secs")]
    pub explicit_wait_secs: u64,
    /// Page load timeout, in seconds
    #[serde(default = "default_page_load_timeout_secs")]
    pub page_load_timeout_secs: u64,
    /// Polling interval for readiness checks, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum number of times a failed test is re-executed
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    /// Capture a screenshot when a test attempt fails
    #[serde(default = "default_true")]
    pub screenshot_on_failure: bool,
}

const fn default_implicit_wait_secs() -> u64 {
    10
}

const fn default_explicit_wait_secs() -> u64 {
    DEFAULT_EXPLICIT_WAIT_SECS
}

const fn default_page_load_timeout_secs() -> u64 {
    30
}

const fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

const fn default_retry_count() -> u32 {
    1
}

const fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            browser: BrowserKind::default(),
            headless: false,
            implicit_wait_secs: default_implicit_wait_secs(),
            explicit_wait_secs: default_explicit_wait_secs(),
            page_load_timeout_secs: default_page_load_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            retry_count: default_retry_count(),
            screenshot_on_failure: true,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, then apply `ESPERAR_*` environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`EsperarError::Configuration`] if the file cannot be read or
    /// the resolved values fail validation. Configuration failures are fatal
    /// at process start — no test runs without a valid configuration.
    pub fn load(path: impl AsRef<Path>) -> EsperarResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");
        Self::build(Some(path))
    }

    /// Resolve settings from defaults and `ESPERAR_*` environment variables
    /// only (no file).
    ///
    /// # Errors
    ///
    /// Returns [`EsperarError::Configuration`] if validation fails.
    pub fn from_env() -> EsperarResult<Self> {
        Self::build(None)
    }

    fn build(path: Option<&Path>) -> EsperarResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let resolved = builder
            .build()
            .map_err(|e| EsperarError::Configuration {
                message: e.to_string(),
            })?
            .try_deserialize::<Self>()
            .map_err(|e| EsperarError::Configuration {
                message: e.to_string(),
            })?;

        resolved.validate()?;
        info!(
            base_url = %resolved.base_url,
            browser = %resolved.browser,
            headless = resolved.headless,
            "configuration loaded"
        );
        Ok(resolved)
    }

    /// Check that required values are present and wait budgets are sane
    ///
    /// # Errors
    ///
    /// Returns [`EsperarError::Configuration`] naming the offending value.
    pub fn validate(&self) -> EsperarResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(EsperarError::Configuration {
                message: "application base_url is not configured".into(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(EsperarError::Configuration {
                message: "poll_interval_ms must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Explicit wait budget as a [`Duration`]
    #[must_use]
    pub const fn explicit_wait(&self) -> Duration {
        Duration::from_secs(self.explicit_wait_secs)
    }

    /// Polling interval as a [`Duration`]
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Page load timeout as a [`Duration`]
    #[must_use]
    pub const fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Settings {
        Settings {
            base_url: "https://shop.example.test".into(),
            ..Settings::default()
        }
    }

    mod browser_kind_tests {
        use super::*;

        #[test]
        fn test_from_name() {
            assert_eq!(BrowserKind::from_name("firefox"), BrowserKind::Firefox);
            assert_eq!(BrowserKind::from_name("EDGE"), BrowserKind::Edge);
            assert_eq!(BrowserKind::from_name("chrome"), BrowserKind::Chrome);
        }

        #[test]
        fn test_unknown_falls_back_to_chrome() {
            assert_eq!(BrowserKind::from_name("netscape"), BrowserKind::Chrome);
        }

        #[test]
        fn test_display() {
            assert_eq!(BrowserKind::Firefox.to_string(), "firefox");
        }
    }

    mod settings_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let settings = Settings::default();
            assert_eq!(settings.explicit_wait_secs, 15);
            assert_eq!(settings.poll_interval_ms, 500);
            assert_eq!(settings.retry_count, 1);
            assert!(settings.screenshot_on_failure);
            assert!(!settings.headless);
        }

        #[test]
        fn test_duration_accessors() {
            let settings = valid();
            assert_eq!(settings.explicit_wait(), Duration::from_secs(15));
            assert_eq!(settings.poll_interval(), Duration::from_millis(500));
            assert_eq!(settings.page_load_timeout(), Duration::from_secs(30));
        }

        #[test]
        fn test_validate_requires_base_url() {
            let settings = Settings::default();
            let err = settings.validate().unwrap_err();
            assert!(matches!(err, EsperarError::Configuration { .. }));
            assert!(err.to_string().contains("base_url"));
        }

        #[test]
        fn test_validate_rejects_zero_poll_interval() {
            let settings = Settings {
                poll_interval_ms: 0,
                ..valid()
            };
            assert!(settings.validate().is_err());
        }

        // Serialized: Settings::build reads process-wide ESPERAR_* vars
        #[test]
        #[serial_test::serial]
        fn test_load_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("esperar.toml");
            std::fs::write(
                &path,
                "base_url = \"https://shop.example.test\"\nbrowser = \"firefox\"\nretry_count = 2\n",
            )
            .unwrap();

            let settings = Settings::load(&path).unwrap();
            assert_eq!(settings.base_url, "https://shop.example.test");
            assert_eq!(settings.browser, BrowserKind::Firefox);
            assert_eq!(settings.retry_count, 2);
            // Untouched keys keep their defaults
            assert_eq!(settings.explicit_wait_secs, 15);
        }

        #[test]
        fn test_load_missing_file_is_a_configuration_failure() {
            let err = Settings::load("/nonexistent/esperar.toml").unwrap_err();
            assert!(matches!(err, EsperarError::Configuration { .. }));
        }

        #[test]
        #[serial_test::serial]
        fn test_env_overrides_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("esperar.toml");
            std::fs::write(&path, "base_url = \"https://from-file.test\"\n").unwrap();

            std::env::set_var("ESPERAR_BASE_URL", "https://from-env.test");
            let settings = Settings::load(&path).unwrap();
            std::env::remove_var("ESPERAR_BASE_URL");

            assert_eq!(settings.base_url, "https://from-env.test");
        }
    }
}

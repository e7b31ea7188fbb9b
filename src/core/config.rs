//! Settings management.
//!
//! Settings come from an optional TOML file (`--config <path>`, or
//! `<config dir>/shhh/config.toml` when present), then environment
//! overrides. Everything has a default, so no file is needed.
//!
//! ```toml
//! backend = "auto"          # auto | native | gpg
//! gnupg_home = "/home/me/.gnupg"
//! gpg_program = "gpg2"
//! expiry_warning_days = 30
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::cipher::{Fallback, Gpg, Native, Provider};
use crate::core::constants::{EXPIRY_WARNING_DAYS, EXTRA_KEYS_DIR, GPG_PROGRAM};
use crate::error::{ConfigError, Result};

/// Environment variable overriding the GnuPG home directory.
pub const ENV_GNUPGHOME: &str = "GNUPGHOME";

/// Environment variable overriding the gpg program.
pub const ENV_GPG: &str = "SHHH_GPG";

/// Environment variable overriding the backend.
pub const ENV_BACKEND: &str = "SHHH_BACKEND";

/// Which provider implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Native first, `gpg` on fallback.
    #[default]
    Auto,
    Native,
    Gpg,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Native => "native",
            Self::Gpg => "gpg",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "native" => Ok(Self::Native),
            "gpg" => Ok(Self::Gpg),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub backend: Backend,
    /// GnuPG home directory. Defaults to `~/.gnupg`.
    pub gnupg_home: Option<PathBuf>,
    pub gpg_program: String,
    /// Warn about recipient keys expiring within this many days.
    pub expiry_warning_days: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            gnupg_home: None,
            gpg_program: GPG_PROGRAM.to_string(),
            expiry_warning_days: EXPIRY_WARNING_DAYS,
        }
    }
}

impl Settings {
    /// Default settings file location, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("shhh").join("config.toml"))
    }

    /// Parse settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read, or
    /// `ConfigError::Parse` if the TOML is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading settings");

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let settings = toml::from_str(&contents).map_err(ConfigError::Parse)?;
        Ok(settings)
    }

    /// Resolve settings for this process.
    ///
    /// An explicit path must exist; the default path is used only if it
    /// does. Environment overrides are applied last.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let settings = match explicit {
            Some(path) => Self::load(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::load(&path)?,
                None => Self::default(),
            },
        };

        settings.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable lookup (normally the environment).
    ///
    /// Empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(home) = lookup(ENV_GNUPGHOME) {
            self.gnupg_home = Some(PathBuf::from(home));
        }
        if let Some(program) = lookup(ENV_GPG) {
            self.gpg_program = program;
        }
        if let Some(backend) = lookup(ENV_BACKEND) {
            self.backend = backend.parse()?;
        }

        Ok(self)
    }

    /// GnuPG home directory in effect.
    pub fn gnupg_home(&self) -> PathBuf {
        self.gnupg_home.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".gnupg")
        })
    }

    /// Directory the native backend scans for extra exported keys.
    pub fn extra_keys_dir(&self) -> PathBuf {
        self.gnupg_home().join(EXTRA_KEYS_DIR)
    }

    /// The shell-out backend as configured.
    pub fn gpg(&self) -> Gpg {
        let gpg = Gpg::new().with_program(&self.gpg_program);
        match &self.gnupg_home {
            Some(home) => gpg.with_homedir(home),
            None => gpg,
        }
    }

    /// Build the configured provider.
    pub fn provider(&self) -> Box<dyn Provider> {
        debug!(backend = %self.backend, "building provider");

        match self.backend {
            Backend::Native => Box::new(Native::load(&self.gnupg_home())),
            Backend::Gpg => Box::new(self.gpg()),
            Backend::Auto => Box::new(Fallback::new(
                Native::load(&self.gnupg_home()),
                self.gpg(),
            )),
        }
    }
}

//! Bridge configuration.
//!
//! Configuration is resolved once per process. Defaults depend on the build
//! profile and can be overridden from the environment:
//!
//! - `FINBRIDGE_RELEASE_POLICY`: `strict` or `lenient`
//! - `FINBRIDGE_LOG`: a level name understood by `finbridge_log`
//!
//! Call [`install`] early at startup to pin a configuration; otherwise the
//! first call to [`current`] resolves one from the environment.

use crate::error::{Error, Result};
use finbridge_log::Level;
use std::sync::OnceLock;

/// Environment variable selecting the [`ReleasePolicy`].
pub const RELEASE_POLICY_VAR: &str = "FINBRIDGE_RELEASE_POLICY";

/// What a handle does when it is released a second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleasePolicy {
    /// Fail with [`Error::DoubleRelease`].
    Strict,
    /// Log a warning and do nothing.
    Lenient,
}

impl ReleasePolicy {
    /// Strict in debug builds, lenient in release builds.
    #[must_use]
    pub const fn for_build() -> Self {
        if cfg!(debug_assertions) {
            ReleasePolicy::Strict
        } else {
            ReleasePolicy::Lenient
        }
    }

    /// Parses `strict` or `lenient`, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for any other value.
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ReleasePolicy::Strict),
            "lenient" => Ok(ReleasePolicy::Lenient),
            _ => Err(Error::InvalidConfig {
                key: RELEASE_POLICY_VAR,
                value: value.to_string(),
            }),
        }
    }
}

/// Process-wide bridge settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Policy handed to every new handle.
    pub release_policy: ReleasePolicy,
    /// Level filter applied to the global logger on install.
    pub log_level: Level,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            release_policy: ReleasePolicy::for_build(),
            log_level: Level::Info,
        }
    }
}

impl BridgeConfig {
    /// Resolves a configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a variable is set to a value that
    /// cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves a configuration through an arbitrary key lookup.
    ///
    /// Unset keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a key maps to an unparsable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = BridgeConfig::default();

        if let Some(value) = lookup(RELEASE_POLICY_VAR) {
            config.release_policy = ReleasePolicy::parse(&value)?;
        }

        if let Some(value) = lookup(finbridge_log::ENV_VAR) {
            config.log_level =
                value.parse().map_err(|_| Error::InvalidConfig {
                    key: finbridge_log::ENV_VAR,
                    value,
                })?;
        }

        Ok(config)
    }
}

static ACTIVE: OnceLock<BridgeConfig> = OnceLock::new();

/// Installs `config` as the process configuration and applies its log level.
///
/// Returns `false` if a configuration was already in effect, in which case
/// nothing changes.
pub fn install(config: BridgeConfig) -> bool {
    let level = config.log_level;
    let installed = ACTIVE.set(config).is_ok();
    if installed {
        finbridge_log::set_level(level);
        finbridge_log::debug!("bridge configuration installed, log level {level}");
    }
    installed
}

/// Returns the configuration in effect.
///
/// Resolves from the environment on first use when nothing was installed,
/// falling back to defaults if the environment is malformed.
pub fn current() -> &'static BridgeConfig {
    ACTIVE.get_or_init(|| match BridgeConfig::from_env() {
        Ok(config) => {
            finbridge_log::set_level(config.log_level);
            config
        }
        Err(e) => {
            finbridge_log::error!("{e}; using default bridge configuration");
            BridgeConfig::default()
        }
    })
}

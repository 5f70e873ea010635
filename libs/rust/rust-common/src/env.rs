//! Environment variable helpers for service configuration.
//!
//! [`EnvVars`] reads through a lookup function so service configuration can
//! be loaded from the process environment in `main` and from a map in tests.

use crate::PlatformError;
use std::env;
use std::fmt;
use std::str::FromStr;

/// Named configuration values behind a lookup function.
pub struct EnvVars<F> {
    lookup: F,
}

impl EnvVars<fn(&str) -> Option<String>> {
    /// Variables of the current process.
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            lookup: |name| env::var(name).ok(),
        }
    }
}

impl<F> EnvVars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Variables resolved by `lookup`.
    pub const fn new(lookup: F) -> Self {
        Self { lookup }
    }

    /// Raw value of `name`, if set.
    pub fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
    }

    /// Value of `name`, or `default` when unset.
    pub fn env_or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    /// Value of a required variable.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the variable is unset or blank.
    pub fn env_required(&self, name: &str) -> Result<String, PlatformError> {
        match self.get(name) {
            Some(val) if !val.trim().is_empty() => Ok(val),
            _ => Err(PlatformError::config(format!("{name} is required"))),
        }
    }

    /// Parsed value of `name`, or `default` when unset.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the variable is set but cannot be parsed.
    pub fn parse_env<T>(&self, name: &str, default: T) -> Result<T, PlatformError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.get(name)
            .map_or(Ok(default), |val| parse_value(name, &val))
    }
}

impl<F> fmt::Debug for EnvVars<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvVars").finish_non_exhaustive()
    }
}

/// Parse a raw configuration value, naming the variable in the error.
///
/// # Errors
///
/// Returns a configuration error if `raw` cannot be parsed as `T`.
pub fn parse_value<T: FromStr>(name: &str, raw: &str) -> Result<T, PlatformError>
where
    T::Err: fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| PlatformError::config(format!("Invalid {name}: {e}")))
}

//! Overlay configuration.
//!
//! Three switches alter behavior: a process-wide override that disables all
//! archive interception, an environment opt-out that only applies outside the
//! orchestrating and rendering roles, and an environment toggle for the read
//! access log.

use std::path::PathBuf;

/// Environment variable that opts a process out of archive interception.
pub const NO_ASAR_ENV: &str = "ANYFS_NO_ASAR";

/// Environment variable that enables the per-archive read log.
pub const LOG_READS_ENV: &str = "ANYFS_LOG_ASAR_READS";

/// Role of the process hosting the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProcessRole {
    /// The primary orchestrating process.
    Orchestrator,
    /// A rendering surface.
    Renderer,
    /// Any other helper or child process.
    #[default]
    Auxiliary,
}

impl ProcessRole {
    /// Whether the [`NO_ASAR_ENV`] opt-out applies to this role.
    #[inline]
    pub const fn honors_env_opt_out(self) -> bool {
        matches!(self, ProcessRole::Auxiliary)
    }
}

/// Overlay configuration.
///
/// # Example
///
/// ```rust
/// use anyfs_asar::{Config, ProcessRole};
///
/// let config = Config::default()
///     .with_role(ProcessRole::Renderer)
///     .with_env_opt_out(true);
/// // Renderers ignore the environment opt-out.
/// assert!(!config.archives_disabled());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Disable archive interception regardless of role.
    pub disabled: bool,
    /// The environment opt-out was set.
    pub env_opt_out: bool,
    /// Role of this process.
    pub role: ProcessRole,
    /// Append every packed read to a per-archive log file.
    pub log_reads: bool,
    /// Directory holding the read logs.
    pub log_dir: PathBuf,
    /// Report `ENOTDIR` for directory creation inside an archive.
    ///
    /// Defaults to `true` on Windows only, where the host reports `ENOENT`
    /// instead and breaks recursive `mkdir` helpers.
    pub not_dir_on_create: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            disabled: false,
            env_opt_out: false,
            role: ProcessRole::default(),
            log_reads: false,
            log_dir: std::env::temp_dir(),
            not_dir_on_create: cfg!(windows),
        }
    }
}

impl Config {
    /// Build a configuration from the process environment.
    ///
    /// A variable counts as set when it is present and non-empty.
    pub fn from_env(role: ProcessRole) -> Self {
        let flag = |name: &str| std::env::var_os(name).is_some_and(|value| !value.is_empty());
        Self {
            env_opt_out: flag(NO_ASAR_ENV),
            log_reads: flag(LOG_READS_ENV),
            role,
            ..Self::default()
        }
    }

    /// Whether archive interception is off for this process.
    pub fn archives_disabled(&self) -> bool {
        self.disabled || (self.env_opt_out && self.role.honors_env_opt_out())
    }

    /// Set the process-wide override.
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Set the environment opt-out.
    pub fn with_env_opt_out(mut self, opt_out: bool) -> Self {
        self.env_opt_out = opt_out;
        self
    }

    /// Set the process role.
    pub fn with_role(mut self, role: ProcessRole) -> Self {
        self.role = role;
        self
    }

    /// Enable the read log, writing into `dir`.
    pub fn with_read_log(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_reads = true;
        self.log_dir = dir.into();
        self
    }

    /// Set the directory-creation workaround.
    pub fn with_not_dir_on_create(mut self, enabled: bool) -> Self {
        self.not_dir_on_create = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_enables_archives() {
        let config = Config::default();
        assert!(!config.archives_disabled());
        assert!(!config.log_reads);
        assert_eq!(config.not_dir_on_create, cfg!(windows));
    }

    #[test]
    fn override_disables_every_role() {
        for role in [
            ProcessRole::Orchestrator,
            ProcessRole::Renderer,
            ProcessRole::Auxiliary,
        ] {
            let config = Config::default().with_role(role).with_disabled(true);
            assert!(config.archives_disabled());
        }
    }

    #[test]
    fn env_opt_out_only_for_auxiliary() {
        let opted = |role| Config::default().with_role(role).with_env_opt_out(true);
        assert!(opted(ProcessRole::Auxiliary).archives_disabled());
        assert!(!opted(ProcessRole::Orchestrator).archives_disabled());
        assert!(!opted(ProcessRole::Renderer).archives_disabled());
    }

    #[test]
    fn read_log_sets_dir() {
        let config = Config::default().with_read_log("/var/tmp/logs");
        assert!(config.log_reads);
        assert_eq!(config.log_dir, PathBuf::from("/var/tmp/logs"));
    }
}

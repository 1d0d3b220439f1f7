//! Where the client keeps its state.
//!
//! Everything lives under one directory, `~/.goauth` unless `GOAUTH_HOME`
//! points elsewhere:
//!
//! ```text
//! config.json        optional settings
//! session.json       persisted tokens and user (0600)
//! logs/goauth.jsonl  structured log
//! ```

use crate::{ConfigError, ConfigResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable that relocates the state directory.
pub const HOME_ENV: &str = "GOAUTH_HOME";

const BASE_DIR_NAME: &str = ".goauth";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// Resolve the state directory from `GOAUTH_HOME`, else `~/.goauth`.
    pub fn new() -> ConfigResult<Self> {
        Self::resolve(|name| std::env::var_os(name), dirs::home_dir)
    }

    fn resolve<E, H>(env: E, home_dir: H) -> ConfigResult<Self>
    where
        E: Fn(&str) -> Option<OsString>,
        H: FnOnce() -> Option<PathBuf>,
    {
        if let Some(dir) = env(HOME_ENV).filter(|dir| !dir.is_empty()) {
            return Ok(Self::with_base_dir(PathBuf::from(dir)));
        }
        let home = home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(Self::with_base_dir(home.join(BASE_DIR_NAME)))
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    pub fn session_file(&self) -> PathBuf {
        self.base_dir.join("session.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("goauth.jsonl")
    }

    /// Create the state and log directories. On Unix the state directory is
    /// made private to the owner, since it holds the session file.
    pub fn ensure_dirs(&self) -> ConfigResult<()> {
        let logs_dir = self.logs_dir();
        std::fs::create_dir_all(&logs_dir).map_err(|source| ConfigError::CreateDir {
            path: logs_dir,
            source,
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.base_dir, std::fs::Permissions::from_mode(0o700))
                .map_err(|source| ConfigError::CreateDir {
                    path: self.base_dir.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

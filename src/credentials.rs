//! API key storage
//!
//! A single secret kept in a dotfile readable only by its owner. The
//! environment variable, when set, wins over the file.

use crate::runtime::CredentialStore;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// An API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Trimmed key, or `None` if nothing is left
    pub fn new(secret: impl AsRef<str>) -> Option<Self> {
        let trimmed = secret.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no API key configured")]
    Missing,
    #[error("credential file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Dotfile-backed store with an environment override
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
    env_var: Option<String>,
}

pub const DEFAULT_ENV_VAR: &str = "OPENAI_API_KEY";

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env_var: None,
        }
    }

    /// Consult `var` before the file
    pub fn with_env_override(mut self, var: impl Into<String>) -> Self {
        self.env_var = Some(var.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CredentialError {
        CredentialError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Credential, CredentialError> {
        if let Some(var) = &self.env_var {
            if let Some(credential) = std::env::var(var).ok().and_then(Credential::new) {
                return Ok(credential);
            }
        }

        match fs::read_to_string(&self.path) {
            Ok(contents) => Credential::new(contents).ok_or(CredentialError::Missing),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CredentialError::Missing),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn set(&self, credential: &Credential) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path).map_err(|e| self.io_error(e))?;

        // mode() only applies on creation; tighten a pre-existing file too
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| self.io_error(e))?;
        }

        writeln!(file, "{}", credential.expose()).map_err(|e| self.io_error(e))?;
        tracing::info!(path = %self.path.display(), "Saved API key");
        Ok(())
    }
}

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;

use crate::errors::FetchError;

pub struct ExportRequest<'a> {
    pub url: &'a str,
    pub username: &'a str,
    pub password: &'a SecretString,
    pub destination: &'a Path,
}

/// Materializes one remote file at `request.destination`.
#[async_trait]
pub trait ExportRunner: Send + Sync {
    async fn export(&self, request: &ExportRequest<'_>) -> Result<(), FetchError>;
}

/// Runs `svn export` as a child process. Arguments are passed directly, never through a shell.
#[derive(Clone, Debug)]
pub struct SvnExportRunner {
    binary: String,
    timeout: Option<Duration>,
}

impl Default for SvnExportRunner {
    fn default() -> Self {
        Self { binary: "svn".to_owned(), timeout: None }
    }
}

impl SvnExportRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into(), timeout: None }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

#[async_trait]
impl ExportRunner for SvnExportRunner {
    async fn export(&self, request: &ExportRequest<'_>) -> Result<(), FetchError> {
        let mut command = Command::new(&self.binary);
        command.args(export_args(request)).stdin(Stdio::null()).kill_on_drop(true);

        let pending = command.output();
        let result = match self.timeout {
            Some(limit) => {
                tokio::time::timeout(limit, pending).await.map_err(|_| FetchError::Timeout(limit))?
            }
            None => pending.await,
        };
        let output =
            result.map_err(|source| FetchError::Spawn { program: self.binary.clone(), source })?;

        if !output.status.success() {
            return Err(FetchError::Export { diagnostic: diagnostic(&output) });
        }
        Ok(())
    }
}

pub(crate) fn export_args(request: &ExportRequest<'_>) -> Vec<String> {
    vec![
        "export".to_owned(),
        "--username".to_owned(),
        request.username.to_owned(),
        "--password".to_owned(),
        request.password.expose_secret().to_owned(),
        request.url.to_owned(),
        request.destination.to_string_lossy().into_owned(),
        "--force".to_owned(),
    ]
}

fn diagnostic(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        return stderr.trim().to_owned();
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        return stdout.trim().to_owned();
    }
    format!("export command exited with {}", output.status)
}

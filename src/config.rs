// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Run configuration: the shared credential, the selected action, and the
//! knobs that shape a fan-out run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use zeroize::Zeroizing;

/// Default deadline for connecting and authenticating against one host.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default deadline for one host's transfer, command, or fetch stage.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

/// The username/password pair applied to every target in a run.
///
/// The password lives in zeroized memory and is handed only to the SSH
/// authentication call. It is never echoed, logged, or placed inside a
/// remote command line.
pub struct Credential {
    pub username: String,
    password: Zeroizing<String>,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// Build the credential from CLI input.
    ///
    /// A password argument of `-` prompts interactively without echo so
    /// the secret stays out of shell history and process listings.
    pub fn resolve(username: String, password: &str) -> Result<Self> {
        if password == "-" {
            let prompted = Zeroizing::new(
                rpassword::prompt_password(format!("Password for {username}: "))
                    .context("Failed to read password from terminal")?,
            );
            Ok(Self {
                username,
                password: prompted,
            })
        } else {
            Ok(Self::new(username, password))
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A local file to push to every host.
///
/// The file is read exactly once, before any connection is attempted; the
/// bytes are then shared across all targets.
#[derive(Debug, Clone)]
pub struct TransferJob {
    pub source: PathBuf,
    pub destination: String,
    pub file_name: String,
    pub contents: Arc<Vec<u8>>,
}

impl TransferJob {
    pub async fn load(source: PathBuf, destination: String) -> Result<Self> {
        let file_name = file_name_of(&source)?;
        let contents = tokio::fs::read(&source)
            .await
            .with_context(|| format!("Failed to read source file {}", source.display()))?;

        Ok(Self {
            source,
            destination,
            file_name,
            contents: Arc::new(contents),
        })
    }

    /// Remote path the file lands at: destination directory plus the
    /// source file name.
    pub fn remote_path(&self) -> String {
        format!(
            "{}/{}",
            self.destination.trim_end_matches('/'),
            self.file_name
        )
    }
}

/// A shell command string executed verbatim on each host.
#[derive(Debug, Clone)]
pub struct CommandJob {
    pub command: String,
}

/// A local script staged under /tmp on each host, executed, then removed.
///
/// The remote path embeds an epoch timestamp so repeated runs of the same
/// script never collide. It is computed once per run and reused on every
/// host.
#[derive(Debug, Clone)]
pub struct ScriptJob {
    pub source: PathBuf,
    pub remote_path: String,
    pub contents: Arc<Vec<u8>>,
}

impl ScriptJob {
    pub async fn load(source: PathBuf) -> Result<Self> {
        let stem = match source.file_stem() {
            Some(stem) => stem.to_string_lossy().into_owned(),
            None => bail!("Script path {} has no file name", source.display()),
        };
        let remote_path = format!("/tmp/{}_{}.sh", stem, chrono::Utc::now().timestamp());
        let contents = tokio::fs::read(&source)
            .await
            .with_context(|| format!("Failed to read script file {}", source.display()))?;

        Ok(Self {
            source,
            remote_path,
            contents: Arc::new(contents),
        })
    }
}

/// A remote file pulled from every host into a local directory.
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub remote_source: String,
    pub local_dir: PathBuf,
    pub file_name: String,
}

impl FetchJob {
    pub fn new(remote_source: String, local_dir: PathBuf) -> Result<Self> {
        let file_name = match remote_source.rsplit('/').next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => bail!("Remote path {remote_source} has no file name"),
        };

        Ok(Self {
            remote_source,
            local_dir,
            file_name,
        })
    }

    /// Local path for one host's copy. The host is prefixed onto the file
    /// name so copies from different hosts never overwrite each other.
    pub fn local_path(&self, host: &str) -> PathBuf {
        self.local_dir.join(format!("{}_{}", host, self.file_name))
    }
}

/// The per-host operation selected for this run.
#[derive(Debug, Clone)]
pub enum Action {
    Transfer(TransferJob),
    Command(CommandJob),
    Script(ScriptJob),
    Fetch(FetchJob),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Transfer(_) => ActionKind::Transfer,
            Action::Command(_) => ActionKind::Run,
            Action::Script(_) => ActionKind::Script,
            Action::Fetch(_) => ActionKind::Fetch,
        }
    }
}

/// Action label carried on results and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Transfer,
    Run,
    Script,
    Fetch,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionKind::Transfer => "transfer",
            ActionKind::Run => "run",
            ActionKind::Script => "script",
            ActionKind::Fetch => "fetch",
        };
        write!(f, "{label}")
    }
}

/// Immutable options for one fan-out run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Maximum simultaneous connections. 1 means one host at a time, in
    /// targets-file order, with remote output streamed live.
    pub max_parallel: usize,
    /// Deadline for connect plus authentication. Zero means unlimited.
    pub connect_timeout: Duration,
    /// Deadline for one host's action stage. Zero means unlimited.
    pub command_timeout: Duration,
    /// When set, one JSON record per host is written here after the run.
    pub json_path: Option<PathBuf>,
    pub verbose: u8,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_parallel: 1,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            json_path: None,
            verbose: 0,
        }
    }
}

fn file_name_of(path: &Path) -> Result<String> {
    match path.file_name() {
        Some(name) => Ok(name.to_string_lossy().into_owned()),
        None => bail!("Source path {} has no file name", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_transfer_job_reads_contents_once() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(b"payload bytes").expect("write temp file");

        let job = TransferJob::load(file.path().to_path_buf(), "/opt/drop".to_string())
            .await
            .expect("load transfer job");

        assert_eq!(job.contents.as_slice(), b"payload bytes");
        assert_eq!(job.remote_path(), format!("/opt/drop/{}", job.file_name));
    }

    #[tokio::test]
    async fn test_transfer_job_missing_source_fails() {
        let err = TransferJob::load(
            PathBuf::from("/nonexistent/payload.bin"),
            "/opt/drop".to_string(),
        )
        .await
        .expect_err("missing source must fail");

        assert!(err.to_string().contains("/nonexistent/payload.bin"));
    }

    #[tokio::test]
    async fn test_transfer_job_zero_byte_source_is_valid() {
        let file = tempfile::NamedTempFile::new().expect("create temp file");

        let job = TransferJob::load(file.path().to_path_buf(), "/tmp".to_string())
            .await
            .expect("load transfer job");

        assert!(job.contents.is_empty());
    }

    #[test]
    fn test_remote_path_handles_trailing_slash() {
        let job = TransferJob {
            source: PathBuf::from("tool.bin"),
            destination: "/opt/drop/".to_string(),
            file_name: "tool.bin".to_string(),
            contents: Arc::new(Vec::new()),
        };
        assert_eq!(job.remote_path(), "/opt/drop/tool.bin");

        let root = TransferJob {
            destination: "/".to_string(),
            ..job
        };
        assert_eq!(root.remote_path(), "/tool.bin");
    }

    #[tokio::test]
    async fn test_script_job_remote_path_under_tmp() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let script = dir.path().join("deploy.sh");
        std::fs::write(&script, "#!/bin/sh\necho ok\n").expect("write script");

        let job = ScriptJob::load(script).await.expect("load script job");

        assert!(job.remote_path.starts_with("/tmp/deploy_"));
        assert!(job.remote_path.ends_with(".sh"));
    }

    #[test]
    fn test_fetch_job_prefixes_host_onto_local_name() {
        let job = FetchJob::new("/var/log/syslog".to_string(), PathBuf::from("./logs"))
            .expect("create fetch job");

        assert_eq!(job.file_name, "syslog");
        assert_eq!(
            job.local_path("10.0.0.1"),
            PathBuf::from("./logs/10.0.0.1_syslog")
        );
    }

    #[test]
    fn test_fetch_job_rejects_directory_path() {
        assert!(FetchJob::new("/var/log/".to_string(), PathBuf::from(".")).is_err());
    }

    #[test]
    fn test_credential_debug_never_shows_password() {
        let credential = Credential::new("admin", "hunter2");
        let debug = format!("{credential:?}");

        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_credential_resolve_passes_literal_through() {
        let credential = Credential::resolve("admin".to_string(), "s3cret").expect("resolve");
        assert_eq!(credential.password(), "s3cret");
    }
}

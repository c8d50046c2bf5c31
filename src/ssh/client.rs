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

//! Password-authenticated SSH client used by every fan-out action.
//!
//! One `Client` maps to one authenticated connection. Commands run on
//! exec channels; file movement goes through the SFTP subsystem. Some
//! sshd configs do not enable sftp by default; pushes and fetches need a
//! `Subsystem sftp` line on the remote side.

use std::sync::Arc;

use russh::client::{self, Handle};
use russh::keys::ssh_key;
use russh::{ChannelMsg, Disconnect};
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::{FileAttributes, OpenFlags};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;

use super::error::Error;
use crate::config::Credential;
use crate::target::Target;

/// Chunk size for SFTP writes. Writing in chunks keeps an exact count of
/// bytes already sent, so an interrupted transfer can report how far it
/// got.
const SFTP_WRITE_CHUNK: usize = 32 * 1024;

/// Mode bits applied to pushed files: owner read/write/execute only.
const PUSHED_FILE_MODE: u32 = 0o700;

/// A piece of remote output forwarded while a command is still running.
#[derive(Debug)]
pub enum OutputChunk {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
}

/// Captured output of one completed remote command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_status: u32,
}

impl CommandOutput {
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    pub fn is_success(&self) -> bool {
        self.exit_status == 0
    }
}

/// russh event handler. Server keys are accepted without verification,
/// like `StrictHostKeyChecking=no`; host trust is out of scope here.
struct ClientHandler;

impl client::Handler for ClientHandler {
    type Error = Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// An authenticated SSH connection to a single target.
pub struct Client {
    handle: Arc<Handle<ClientHandler>>,
    target: Target,
}

impl Client {
    /// Connect to the target and authenticate with the shared credential.
    ///
    /// A rejected password maps to [`Error::PasswordWrong`]; everything
    /// else surfaces as the underlying transport error.
    pub async fn connect(target: &Target, credential: &Credential) -> Result<Self, Error> {
        tracing::debug!(host = %target.host, port = target.port, "connecting");

        let config = Arc::new(client::Config::default());
        let mut handle =
            client::connect(config, (target.host.as_str(), target.port), ClientHandler).await?;

        let auth = handle
            .authenticate_password(&credential.username, credential.password())
            .await?;
        if !auth.success() {
            return Err(Error::PasswordWrong);
        }

        tracing::debug!(host = %target.host, user = %credential.username, "authenticated");

        Ok(Self {
            handle: Arc::new(handle),
            target: target.clone(),
        })
    }

    /// Run a command on an exec channel and collect stdout/stderr until
    /// the channel closes. When `forward` is set, output chunks are also
    /// sent there as they arrive so the caller can stream them live.
    pub async fn execute(
        &self,
        command: &str,
        forward: Option<mpsc::Sender<OutputChunk>>,
    ) -> Result<CommandOutput, Error> {
        tracing::debug!(host = %self.target.host, command, "executing");

        let mut channel = self.handle.channel_open_session().await?;
        channel.exec(true, command).await?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_status = None;

        // An ExitStatus message does not end the channel; data can still
        // follow it, and RFC 4254 permits closing without an Eof at all.
        // Drain until the channel itself closes.
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => {
                    stdout.extend_from_slice(data);
                    if let Some(tx) = &forward {
                        let _ = tx.send(OutputChunk::Stdout(data.to_vec())).await;
                    }
                }
                ChannelMsg::ExtendedData { ref data, ext } => {
                    if ext == 1 {
                        stderr.extend_from_slice(data);
                        if let Some(tx) = &forward {
                            let _ = tx.send(OutputChunk::Stderr(data.to_vec())).await;
                        }
                    }
                }
                ChannelMsg::ExitStatus {
                    exit_status: status,
                } => {
                    exit_status = Some(status);
                }
                _ => {}
            }
        }

        match exit_status {
            Some(exit_status) => Ok(CommandOutput {
                stdout,
                stderr,
                exit_status,
            }),
            None => Err(Error::CommandDidntExit),
        }
    }

    /// Push `contents` to `remote_path` over SFTP, then restrict the file
    /// to owner read/write/execute. Returns the number of bytes written.
    ///
    /// A write that fails partway is not rolled back; the remote file
    /// keeps whatever bytes arrived before the error.
    pub async fn upload(&self, contents: &[u8], remote_path: &str) -> Result<u64, Error> {
        let channel = self.handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream()).await?;

        let total = contents.len() as u64;
        let mut file = sftp
            .open_with_flags(
                remote_path,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE | OpenFlags::READ,
            )
            .await?;

        let mut written: u64 = 0;
        for chunk in contents.chunks(SFTP_WRITE_CHUNK) {
            file.write_all(chunk)
                .await
                .map_err(|source| Error::TransferInterrupted {
                    written,
                    total,
                    source,
                })?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|source| Error::TransferInterrupted {
                written,
                total,
                source,
            })?;
        file.shutdown()
            .await
            .map_err(|source| Error::TransferInterrupted {
                written,
                total,
                source,
            })?;

        sftp.set_metadata(
            remote_path,
            FileAttributes {
                size: None,
                uid: None,
                user: None,
                gid: None,
                group: None,
                permissions: Some(PUSHED_FILE_MODE),
                atime: None,
                mtime: None,
            },
        )
        .await?;

        tracing::debug!(
            host = %self.target.host,
            path = remote_path,
            bytes = written,
            "upload complete"
        );

        Ok(written)
    }

    /// Pull `remote_path` into memory over SFTP.
    pub async fn download(&self, remote_path: &str) -> Result<Vec<u8>, Error> {
        let channel = self.handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream()).await?;

        let mut file = sftp.open_with_flags(remote_path, OpenFlags::READ).await?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await?;

        tracing::debug!(
            host = %self.target.host,
            path = remote_path,
            bytes = contents.len(),
            "download complete"
        );

        Ok(contents)
    }

    /// Close the connection cleanly.
    pub async fn disconnect(&self) -> Result<(), Error> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "")
            .await
            .map_err(Error::from)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("target", &self.target)
            .field("handle", &"Handle<ClientHandler>")
            .finish()
    }
}

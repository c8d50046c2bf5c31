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

//! Error types for the SSH transport layer.

use thiserror::Error;

/// Errors from connecting, authenticating, and running remote operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Protocol or connection error from russh
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// SFTP subsystem error
    #[error("SFTP error: {0}")]
    Sftp(#[from] russh_sftp::client::error::Error),

    /// Local or channel IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The server rejected the password for this user
    #[error("password authentication rejected by server")]
    PasswordWrong,

    /// The exec channel closed without reporting an exit status
    #[error("remote command ended without an exit status")]
    CommandDidntExit,

    /// A write failed partway through a transfer
    #[error("transfer interrupted after {written} of {total} bytes: {source}")]
    TransferInterrupted {
        written: u64,
        total: u64,
        #[source]
        source: std::io::Error,
    },
}

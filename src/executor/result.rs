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

//! Per-target results and the machine-readable record file.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ActionKind;
use crate::ssh::CommandOutput;
use crate::target::Target;

/// How one target's action ended.
///
/// `Success` means the action itself completed. A command that ran to
/// completion with a nonzero exit status is still `Success`; the exit
/// status is carried separately on the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    ConnectFailed,
    AuthFailed,
    TransferFailed,
    CommandFailed,
}

impl Outcome {
    /// Short label used on per-host report lines.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::ConnectFailed => "connect failed",
            Outcome::AuthFailed => "auth failed",
            Outcome::TransferFailed => "transfer failed",
            Outcome::CommandFailed => "command failed",
        }
    }
}

/// Everything recorded about one target's run.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub target: Target,
    pub action: ActionKind,
    pub outcome: Outcome,
    /// Failure cause, or a short success note (paths moved, exit status).
    pub message: String,
    /// Captured remote output, for command and script actions.
    pub output: Option<CommandOutput>,
    /// Bytes moved, for transfer and fetch actions.
    pub bytes: Option<u64>,
    pub duration: Duration,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn success(
        target: Target,
        action: ActionKind,
        message: String,
        output: Option<CommandOutput>,
        bytes: Option<u64>,
        duration: Duration,
    ) -> Self {
        Self {
            target,
            action,
            outcome: Outcome::Success,
            message,
            output,
            bytes,
            duration,
            finished_at: Utc::now(),
        }
    }

    pub fn failure(
        target: Target,
        action: ActionKind,
        outcome: Outcome,
        message: String,
        duration: Duration,
    ) -> Self {
        Self {
            target,
            action,
            outcome,
            message,
            output: None,
            bytes: None,
            duration,
            finished_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Remote exit status, when the action ran a command.
    pub fn exit_status(&self) -> Option<u32> {
        self.output.as_ref().map(|output| output.exit_status)
    }

    /// True when the remote command completed but reported a nonzero
    /// exit status.
    pub fn nonzero_exit(&self) -> bool {
        self.is_success() && self.exit_status().is_some_and(|status| status != 0)
    }
}

#[derive(Debug, Serialize)]
struct JsonRecord<'a> {
    timestamp: String,
    host: &'a str,
    port: u16,
    action: ActionKind,
    outcome: Outcome,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_status: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<u64>,
    duration_ms: u128,
}

/// Write one JSON object per result, newline-delimited, in target order.
pub fn write_json_records(path: &Path, results: &[ExecutionResult]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report file {}", path.display()))?;
    let mut out = std::io::BufWriter::new(file);

    for result in results {
        let record = JsonRecord {
            timestamp: result.finished_at.to_rfc3339(),
            host: &result.target.host,
            port: result.target.port,
            action: result.action,
            outcome: result.outcome,
            message: &result.message,
            exit_status: result.exit_status(),
            bytes: result.bytes,
            duration_ms: result.duration.as_millis(),
        };
        serde_json::to_writer(&mut out, &record)
            .with_context(|| format!("Failed to write report file {}", path.display()))?;
        out.write_all(b"\n")
            .with_context(|| format!("Failed to write report file {}", path.display()))?;
    }

    out.flush()
        .with_context(|| format!("Failed to write report file {}", path.display()))?;
    Ok(())
}

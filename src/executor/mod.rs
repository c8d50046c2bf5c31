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

//! Fan-out execution of one action across the whole target list.
//!
//! One host at a time by default, in targets-file order, with remote
//! output streamed to the console as it arrives. With `--parallel` above
//! one, hosts run concurrently under a semaphore and each gets a progress
//! spinner instead of a live stream.
//!
//! A failure on one host never stops the run. Every target always ends
//! with exactly one [`ExecutionResult`], and results come back in target
//! order.

mod progress;
pub mod result;

pub use result::{ExecutionResult, Outcome};

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use indicatif::MultiProgress;
use owo_colors::OwoColorize;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinError;
use tokio::time::error::Elapsed;

use crate::config::{
    Action, ActionKind, CommandJob, Credential, FetchJob, RunConfig, ScriptJob, TransferJob,
};
use crate::ssh::{self, Client, CommandOutput, OutputChunk};
use crate::target::Target;
use crate::ui;

/// Capacity of the channel carrying streamed output chunks.
const OUTPUT_CHANNEL_CAPACITY: usize = 1000;

/// Runs one action against every target and collects per-target results.
pub struct FanoutExecutor {
    targets: Vec<Target>,
    credential: Arc<Credential>,
    action: Arc<Action>,
    max_parallel: usize,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl FanoutExecutor {
    pub fn new(
        targets: Vec<Target>,
        credential: Credential,
        action: Action,
        config: &RunConfig,
    ) -> Self {
        Self {
            targets,
            credential: Arc::new(credential),
            action: Arc::new(action),
            max_parallel: config.max_parallel.max(1),
            connect_timeout: config.connect_timeout,
            command_timeout: config.command_timeout,
        }
    }

    /// Run the action on every target and return one result per target,
    /// in target order.
    pub async fn execute(&self) -> Vec<ExecutionResult> {
        if self.targets.is_empty() {
            return Vec::new();
        }

        tracing::info!(
            hosts = self.targets.len(),
            parallel = self.max_parallel,
            action = %self.action.kind(),
            "starting run"
        );

        if self.max_parallel <= 1 {
            self.execute_sequential().await
        } else {
            self.execute_parallel().await
        }
    }

    async fn execute_sequential(&self) -> Vec<ExecutionResult> {
        let streaming = matches!(self.action.as_ref(), Action::Command(_) | Action::Script(_));
        let mut results = Vec::with_capacity(self.targets.len());

        for target in &self.targets {
            if streaming {
                println!("{}", ui::format_host_banner(target));
            }

            let result = run_target(
                target.clone(),
                Arc::clone(&self.credential),
                Arc::clone(&self.action),
                self.connect_timeout,
                self.command_timeout,
                streaming,
            )
            .await;

            println!("{}", ui::format_result_line(&result));
            results.push(result);
        }

        results
    }

    async fn execute_parallel(&self) -> Vec<ExecutionResult> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel.min(self.targets.len())));
        let multi = MultiProgress::new();

        let tasks: Vec<_> = self
            .targets
            .iter()
            .map(|target| {
                let target = target.clone();
                let credential = Arc::clone(&self.credential);
                let action = Arc::clone(&self.action);
                let semaphore = Arc::clone(&semaphore);
                let pb = progress::setup_progress_bar(&multi, &target);
                let connect_timeout = self.connect_timeout;
                let command_timeout = self.command_timeout;

                tokio::spawn(async move {
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            let result = ExecutionResult::failure(
                                target,
                                action.kind(),
                                stage_failure_outcome(action.kind()),
                                format!("Semaphore acquisition failed: {e}"),
                                Duration::ZERO,
                            );
                            progress::finish_progress_bar(&pb, &result);
                            return result;
                        }
                    };

                    pb.set_message(format!("{}", "Executing...".blue()));
                    let result = run_target(
                        target,
                        credential,
                        action,
                        connect_timeout,
                        command_timeout,
                        false,
                    )
                    .await;
                    progress::finish_progress_bar(&pb, &result);
                    result
                })
            })
            .collect();

        let joined = join_all(tasks).await;
        self.collect_results(joined)
    }

    /// Pair joined tasks back up with their targets so a panicked task
    /// still yields a result for its host.
    fn collect_results(
        &self,
        joined: Vec<Result<ExecutionResult, JoinError>>,
    ) -> Vec<ExecutionResult> {
        joined
            .into_iter()
            .zip(self.targets.iter())
            .map(|(task, target)| match task {
                Ok(result) => result,
                Err(err) => ExecutionResult::failure(
                    target.clone(),
                    self.action.kind(),
                    stage_failure_outcome(self.action.kind()),
                    format!("Task panicked: {err}"),
                    Duration::ZERO,
                ),
            })
            .collect()
    }
}

/// Run the whole per-host pipeline for one target: connect, authenticate,
/// perform the action, disconnect.
async fn run_target(
    target: Target,
    credential: Arc<Credential>,
    action: Arc<Action>,
    connect_timeout: Duration,
    command_timeout: Duration,
    stream_output: bool,
) -> ExecutionResult {
    let start = Instant::now();
    let kind = action.kind();

    let connect = with_deadline(connect_timeout, Client::connect(&target, &credential)).await;
    let client = match connect {
        Ok(Ok(client)) => client,
        Ok(Err(err)) => {
            return ExecutionResult::failure(
                target,
                kind,
                connect_outcome(&err),
                err.to_string(),
                start.elapsed(),
            );
        }
        Err(_) => {
            return ExecutionResult::failure(
                target,
                kind,
                Outcome::ConnectFailed,
                format!("connection timed out after {}s", connect_timeout.as_secs()),
                start.elapsed(),
            );
        }
    };

    let result = match action.as_ref() {
        Action::Transfer(job) => run_transfer(&client, &target, job, command_timeout, start).await,
        Action::Command(job) => {
            run_command(&client, &target, job, command_timeout, stream_output, start).await
        }
        Action::Script(job) => {
            run_script(&client, &target, job, command_timeout, stream_output, start).await
        }
        Action::Fetch(job) => run_fetch(&client, &target, job, command_timeout, start).await,
    };

    if let Err(err) = client.disconnect().await {
        tracing::debug!(host = %target.host, error = %err, "disconnect failed");
    }

    result
}

async fn run_transfer(
    client: &Client,
    target: &Target,
    job: &TransferJob,
    timeout: Duration,
    start: Instant,
) -> ExecutionResult {
    let remote_path = job.remote_path();

    match with_deadline(timeout, client.upload(&job.contents, &remote_path)).await {
        Ok(Ok(bytes)) => ExecutionResult::success(
            target.clone(),
            ActionKind::Transfer,
            format!("{} -> {}", job.source.display(), remote_path),
            None,
            Some(bytes),
            start.elapsed(),
        ),
        Ok(Err(err)) => ExecutionResult::failure(
            target.clone(),
            ActionKind::Transfer,
            Outcome::TransferFailed,
            err.to_string(),
            start.elapsed(),
        ),
        Err(_) => ExecutionResult::failure(
            target.clone(),
            ActionKind::Transfer,
            Outcome::TransferFailed,
            format!("transfer timed out after {}s", timeout.as_secs()),
            start.elapsed(),
        ),
    }
}

async fn run_command(
    client: &Client,
    target: &Target,
    job: &CommandJob,
    timeout: Duration,
    stream_output: bool,
    start: Instant,
) -> ExecutionResult {
    match exec_remote(client, &job.command, timeout, stream_output).await {
        Ok(output) => ExecutionResult::success(
            target.clone(),
            ActionKind::Run,
            format!("exit status {}", output.exit_status),
            Some(output),
            None,
            start.elapsed(),
        ),
        Err(message) => ExecutionResult::failure(
            target.clone(),
            ActionKind::Run,
            Outcome::CommandFailed,
            message,
            start.elapsed(),
        ),
    }
}

async fn run_script(
    client: &Client,
    target: &Target,
    job: &ScriptJob,
    timeout: Duration,
    stream_output: bool,
    start: Instant,
) -> ExecutionResult {
    // Stage the script first; upload applies owner-exec mode bits.
    match with_deadline(timeout, client.upload(&job.contents, &job.remote_path)).await {
        Ok(Ok(_)) => {}
        Ok(Err(err)) => {
            return ExecutionResult::failure(
                target.clone(),
                ActionKind::Script,
                Outcome::TransferFailed,
                err.to_string(),
                start.elapsed(),
            );
        }
        Err(_) => {
            return ExecutionResult::failure(
                target.clone(),
                ActionKind::Script,
                Outcome::TransferFailed,
                format!("script upload timed out after {}s", timeout.as_secs()),
                start.elapsed(),
            );
        }
    }

    let run = format!("sh '{}'", job.remote_path);
    let outcome = exec_remote(client, &run, timeout, stream_output).await;

    // Cleanup runs as its own command so the exit status above stays the
    // script's own. Failure to remove only warns; the outcome is already
    // decided.
    let cleanup = format!("rm -f '{}'", job.remote_path);
    match exec_remote(client, &cleanup, timeout, false).await {
        Ok(output) if !output.is_success() => {
            tracing::warn!(
                host = %target.host,
                path = %job.remote_path,
                status = output.exit_status,
                "failed to remove remote script"
            );
        }
        Err(err) => {
            tracing::warn!(
                host = %target.host,
                path = %job.remote_path,
                error = %err,
                "failed to remove remote script"
            );
        }
        Ok(_) => {}
    }

    match outcome {
        Ok(output) => ExecutionResult::success(
            target.clone(),
            ActionKind::Script,
            format!("exit status {}", output.exit_status),
            Some(output),
            None,
            start.elapsed(),
        ),
        Err(message) => ExecutionResult::failure(
            target.clone(),
            ActionKind::Script,
            Outcome::CommandFailed,
            message,
            start.elapsed(),
        ),
    }
}

async fn run_fetch(
    client: &Client,
    target: &Target,
    job: &FetchJob,
    timeout: Duration,
    start: Instant,
) -> ExecutionResult {
    let local_path = job.local_path(&target.host);

    let contents = match with_deadline(timeout, client.download(&job.remote_source)).await {
        Ok(Ok(contents)) => contents,
        Ok(Err(err)) => {
            return ExecutionResult::failure(
                target.clone(),
                ActionKind::Fetch,
                Outcome::TransferFailed,
                err.to_string(),
                start.elapsed(),
            );
        }
        Err(_) => {
            return ExecutionResult::failure(
                target.clone(),
                ActionKind::Fetch,
                Outcome::TransferFailed,
                format!("fetch timed out after {}s", timeout.as_secs()),
                start.elapsed(),
            );
        }
    };

    if let Some(parent) = local_path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                return ExecutionResult::failure(
                    target.clone(),
                    ActionKind::Fetch,
                    Outcome::TransferFailed,
                    format!("failed to create {}: {err}", parent.display()),
                    start.elapsed(),
                );
            }
        }
    }

    match tokio::fs::write(&local_path, &contents).await {
        Ok(()) => ExecutionResult::success(
            target.clone(),
            ActionKind::Fetch,
            format!("{} -> {}", job.remote_source, local_path.display()),
            None,
            Some(contents.len() as u64),
            start.elapsed(),
        ),
        Err(err) => ExecutionResult::failure(
            target.clone(),
            ActionKind::Fetch,
            Outcome::TransferFailed,
            format!("failed to write {}: {err}", local_path.display()),
            start.elapsed(),
        ),
    }
}

/// Apply a per-stage deadline to a future. A zero limit means no
/// deadline at all.
async fn with_deadline<T>(
    limit: Duration,
    fut: impl std::future::Future<Output = T>,
) -> Result<T, Elapsed> {
    if limit.is_zero() {
        Ok(fut.await)
    } else {
        tokio::time::timeout(limit, fut).await
    }
}

/// Run one remote command under the action deadline, optionally streaming
/// its output to the console while it runs.
async fn exec_remote(
    client: &Client,
    command: &str,
    timeout: Duration,
    stream_output: bool,
) -> Result<CommandOutput, String> {
    let outcome = if stream_output {
        let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let printer = tokio::spawn(print_chunks(rx));
        let outcome = with_deadline(timeout, client.execute(command, Some(tx))).await;
        // The sender is gone once execute finishes or is dropped, so the
        // printer always drains and exits.
        let _ = printer.await;
        outcome
    } else {
        with_deadline(timeout, client.execute(command, None)).await
    };

    match outcome {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => Err(err.to_string()),
        Err(_) => Err(format!("command timed out after {}s", timeout.as_secs())),
    }
}

/// Write streamed chunks to the local console as they arrive, stdout to
/// stdout and stderr to stderr.
async fn print_chunks(mut rx: mpsc::Receiver<OutputChunk>) {
    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();

    while let Some(chunk) = rx.recv().await {
        let written = match chunk {
            OutputChunk::Stdout(data) => stdout.write_all(&data).await,
            OutputChunk::Stderr(data) => stderr.write_all(&data).await,
        };
        if written.is_err() {
            break;
        }
    }

    let _ = stdout.flush().await;
    let _ = stderr.flush().await;
}

/// Classify a connect-stage error: a rejected password is an auth
/// failure, anything else is a connection failure.
fn connect_outcome(err: &ssh::Error) -> Outcome {
    match err {
        ssh::Error::PasswordWrong => Outcome::AuthFailed,
        _ => Outcome::ConnectFailed,
    }
}

/// Outcome used when a host's task dies before its action could decide.
fn stage_failure_outcome(kind: ActionKind) -> Outcome {
    match kind {
        ActionKind::Transfer | ActionKind::Fetch => Outcome::TransferFailed,
        ActionKind::Run | ActionKind::Script => Outcome::CommandFailed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_password_is_auth_failed() {
        assert_eq!(
            connect_outcome(&ssh::Error::PasswordWrong),
            Outcome::AuthFailed
        );
    }

    #[test]
    fn test_network_errors_are_connect_failed() {
        let refused = ssh::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert_eq!(connect_outcome(&refused), Outcome::ConnectFailed);
    }

    #[test]
    fn test_stage_failure_outcome_by_action() {
        assert_eq!(
            stage_failure_outcome(ActionKind::Transfer),
            Outcome::TransferFailed
        );
        assert_eq!(
            stage_failure_outcome(ActionKind::Fetch),
            Outcome::TransferFailed
        );
        assert_eq!(
            stage_failure_outcome(ActionKind::Run),
            Outcome::CommandFailed
        );
        assert_eq!(
            stage_failure_outcome(ActionKind::Script),
            Outcome::CommandFailed
        );
    }
}

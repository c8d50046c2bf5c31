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

//! transfer-command: push one local file to every host.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;

use crate::config::{Action, Credential, RunConfig, TransferJob};
use crate::executor::FanoutExecutor;
use crate::target;
use crate::ui;
use crate::utils::format_bytes;

pub struct TransferParams {
    pub local_source: PathBuf,
    pub remote_dest: String,
    pub targets_file: PathBuf,
    pub username: String,
    pub password: String,
    pub port: u16,
}

pub async fn transfer_file(params: TransferParams, config: &RunConfig) -> Result<()> {
    // All local inputs are validated before the first connection; any
    // failure here aborts the whole run.
    let targets = target::load_targets(&params.targets_file, params.port)?;
    let job = TransferJob::load(params.local_source, params.remote_dest).await?;
    let credential = Credential::resolve(params.username, &params.password)?;

    println!(
        "{}",
        ui::format_run_header(
            "Pushing",
            &format!(
                "{} ({}) -> {}",
                job.file_name,
                format_bytes(job.contents.len() as u64),
                job.destination
            ),
            targets.len()
        )
    );

    let start = Instant::now();
    let executor = FanoutExecutor::new(targets, credential, Action::Transfer(job), config);
    let results = executor.execute().await;

    super::report(&results, config, start.elapsed(), false)
}

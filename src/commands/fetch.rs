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

//! fetch-command: pull the same remote file from every host.
//!
//! Each copy lands in the local directory as `<host>_<file name>` so the
//! downloads never overwrite each other.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;

use crate::config::{Action, Credential, FetchJob, RunConfig};
use crate::executor::FanoutExecutor;
use crate::target;
use crate::ui;

pub struct FetchParams {
    pub remote_source: String,
    pub local_dest: PathBuf,
    pub targets_file: PathBuf,
    pub username: String,
    pub password: String,
    pub port: u16,
}

pub async fn fetch_file(params: FetchParams, config: &RunConfig) -> Result<()> {
    let targets = target::load_targets(&params.targets_file, params.port)?;
    let job = FetchJob::new(params.remote_source, params.local_dest)?;
    let credential = Credential::resolve(params.username, &params.password)?;

    println!(
        "{}",
        ui::format_run_header(
            "Fetching",
            &format!("{} -> {}", job.remote_source, job.local_dir.display()),
            targets.len()
        )
    );

    let start = Instant::now();
    let executor = FanoutExecutor::new(targets, credential, Action::Fetch(job), config);
    let results = executor.execute().await;

    super::report(&results, config, start.elapsed(), false)
}

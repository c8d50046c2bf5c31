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

//! run-script: stage a local script on every host, execute it, clean up.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;

use crate::config::{Action, Credential, RunConfig, ScriptJob};
use crate::executor::FanoutExecutor;
use crate::target;
use crate::ui;
use crate::utils::format_bytes;

pub struct ScriptParams {
    pub local_script: PathBuf,
    pub targets_file: PathBuf,
    pub username: String,
    pub password: String,
    pub port: u16,
}

pub async fn run_script(params: ScriptParams, config: &RunConfig) -> Result<()> {
    let targets = target::load_targets(&params.targets_file, params.port)?;
    let job = ScriptJob::load(params.local_script).await?;
    let credential = Credential::resolve(params.username, &params.password)?;

    println!(
        "{}",
        ui::format_run_header(
            "Running script",
            &format!(
                "{} ({})",
                job.source.display(),
                format_bytes(job.contents.len() as u64)
            ),
            targets.len()
        )
    );

    let start = Instant::now();
    let executor = FanoutExecutor::new(targets, credential, Action::Script(job), config);
    let results = executor.execute().await;

    super::report(&results, config, start.elapsed(), true)
}

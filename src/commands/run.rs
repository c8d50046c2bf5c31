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

//! run-command: execute one shell command on every host.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;

use crate::config::{Action, CommandJob, Credential, RunConfig};
use crate::executor::FanoutExecutor;
use crate::target;
use crate::ui;

pub struct RunParams {
    pub targets_file: PathBuf,
    pub username: String,
    pub password: String,
    pub command: String,
    pub port: u16,
}

pub async fn run_command(params: RunParams, config: &RunConfig) -> Result<()> {
    let targets = target::load_targets(&params.targets_file, params.port)?;
    let credential = Credential::resolve(params.username, &params.password)?;

    println!(
        "{}",
        ui::format_run_header("Executing", &params.command, targets.len())
    );

    let start = Instant::now();
    let job = CommandJob {
        command: params.command,
    };
    let executor = FanoutExecutor::new(targets, credential, Action::Command(job), config);
    let results = executor.execute().await;

    super::report(&results, config, start.elapsed(), true)
}

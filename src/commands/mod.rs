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

//! One module per subcommand: load inputs, run the fan-out, report.

pub mod fetch;
pub mod run;
pub mod script;
pub mod transfer;

use std::time::Duration;

use anyhow::Result;

use crate::config::RunConfig;
use crate::executor::{result::write_json_records, ExecutionResult};
use crate::ui;

/// Shared tail of every subcommand: buffered output blocks (when the run
/// did not stream them live), the summary, and the optional JSON report.
///
/// Per-host failures are already in the results; they never turn into an
/// error here. Only a failure to write the report file does.
pub(crate) fn report(
    results: &[ExecutionResult],
    config: &RunConfig,
    elapsed: Duration,
    show_output: bool,
) -> Result<()> {
    if show_output && config.max_parallel > 1 {
        for result in results {
            print!("{}", ui::format_result_block(result, config.verbose > 0));
        }
    }

    println!("{}", ui::format_summary(results, elapsed));

    if let Some(path) = &config.json_path {
        write_json_records(path, results)?;
        tracing::info!(path = %path.display(), "wrote JSON report");
    }

    Ok(())
}

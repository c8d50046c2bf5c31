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

//! Per-host progress spinners for parallel runs.

use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

use super::result::ExecutionResult;
use crate::target::Target;
use crate::ui;

/// Progress bar tick rate configuration.
const PROGRESS_BAR_TICK_RATE_MS: u64 = 80;

/// Cut `s` down to `max_width` display columns, ending in "..." when
/// anything was dropped. Never splits inside a char.
fn truncate_display(s: &str, max_width: usize) -> String {
    if s.width() > max_width {
        let (head, _) = ui::split_at_width(s, max_width.saturating_sub(3));
        format!("{head}...")
    } else {
        s.to_string()
    }
}

/// Create the spinner style shared by all per-host progress bars.
pub(crate) fn create_progress_style() -> Result<ProgressStyle> {
    ProgressStyle::default_bar()
        .template("{prefix:.bold} {spinner:.cyan} {msg}")
        .map_err(|e| anyhow::anyhow!("Failed to create progress bar template: {e}"))
        .map(|style| style.tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷ "))
}

/// Format target display name for progress bars.
pub(crate) fn format_target_display(target: &Target) -> String {
    truncate_display(&target.to_string(), 20)
}

/// Add a ticking spinner for one target.
pub(crate) fn setup_progress_bar(multi: &MultiProgress, target: &Target) -> ProgressBar {
    let pb = multi.add(ProgressBar::new_spinner());
    if let Ok(style) = create_progress_style() {
        pb.set_style(style);
    }
    pb.set_prefix(format!("[{}]", format_target_display(target)));
    pb.enable_steady_tick(Duration::from_millis(PROGRESS_BAR_TICK_RATE_MS));
    pb.set_message(format!("{}", "Waiting...".dimmed()));
    pb
}

/// Replace the spinner with the final one-line outcome for the host.
pub(crate) fn finish_progress_bar(pb: &ProgressBar, result: &ExecutionResult) {
    pb.finish_with_message(finish_message(result));
}

/// Final one-line text shown in place of the spinner, mirroring the
/// outcome labels of the sequential per-host lines.
fn finish_message(result: &ExecutionResult) -> String {
    if result.is_success() {
        if result.nonzero_exit() {
            format!(
                "{} Exit code: {}",
                "●".green(),
                result
                    .exit_status()
                    .unwrap_or_default()
                    .to_string()
                    .yellow()
            )
        } else {
            format!("{} {}", "●".green(), "Success".green())
        }
    } else {
        let first_line = result.message.lines().next().unwrap_or("Unknown error");
        let short_error = truncate_display(first_line, 50);
        format!(
            "{} {}: {}",
            "●".red(),
            result.outcome.label().red(),
            short_error.red()
        )
    }
}

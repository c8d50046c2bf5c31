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

//! Console output: run headers, per-host lines and output blocks, and the
//! run summary.

use std::time::Duration;

use owo_colors::OwoColorize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::executor::ExecutionResult;
use crate::target::Target;
use crate::utils::fs::format_bytes;

fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80)
}

/// Header printed once at the start of a run.
pub fn format_run_header(verb: &str, detail: &str, host_count: usize) -> String {
    format!(
        "\n{} {} on {} {}:\n{}\n",
        "►".cyan().bold(),
        verb.cyan(),
        host_count.to_string().bold(),
        if host_count == 1 { "host" } else { "hosts" },
        format!("  {detail}").dimmed()
    )
}

/// Host marker printed before a host's streamed output.
pub fn format_host_banner(target: &Target) -> String {
    format!("\n{}", format!("[{target}]").cyan().bold())
}

/// One line stating how a host ended.
///
/// A completed command with a nonzero exit status still counts as
/// success; the status is shown as a trailing marker instead.
pub fn format_result_line(result: &ExecutionResult) -> String {
    let target = result.target.to_string();
    let duration = format_duration(result.duration);

    if result.is_success() {
        let mut line = format!(
            "{} {} {}",
            "✓".green(),
            target.bold(),
            result.action.to_string().green()
        );
        if let Some(bytes) = result.bytes {
            line.push_str(&format!(" {}", format_bytes(bytes)));
        }
        line.push_str(&format!(" ({duration})"));
        if let Some(status) = result.exit_status() {
            if status != 0 {
                line.push_str(&format!(
                    " {} {}",
                    "⚠".yellow(),
                    format!("exit {status}").yellow()
                ));
            }
        }
        line
    } else {
        format!(
            "{} {} {}: {} ({duration})",
            "✗".red(),
            target.bold(),
            result.outcome.label().red(),
            result.message.lines().next().unwrap_or("")
        )
    }
}

/// Full output block for one host, used after parallel runs where output
/// was buffered instead of streamed.
pub fn format_result_block(result: &ExecutionResult, verbose: bool) -> String {
    let mut output = String::new();

    let status_symbol = if result.is_success() {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    };
    output.push_str(&format!(
        "\n{} {}\n",
        status_symbol,
        result.target.to_string().bold()
    ));

    if !result.is_success() {
        output.push_str(&format!("{} Error: {}\n", "✗".red(), result.message.red()));
        return output;
    }

    let Some(cmd) = &result.output else {
        output.push_str(&format!("  {}\n", result.message.dimmed()));
        return output;
    };

    if cmd.is_success() {
        let stdout = cmd.stdout_string();
        if !stdout.is_empty() {
            output.push_str(&format_output_box(&stdout, false));
        }

        if verbose {
            let stderr = cmd.stderr_string();
            if !stderr.is_empty() {
                output.push_str(&format!("\n{}\n", "stderr:".yellow()));
                output.push_str(&format_output_box(&stderr, true));
            }
        }
    } else {
        output.push_str(&format!(
            "{} Exit code: {}\n",
            "⚠".yellow(),
            cmd.exit_status.to_string().yellow()
        ));

        let stdout = cmd.stdout_string();
        if !stdout.is_empty() {
            output.push_str(&format_output_box(&stdout, false));
        }

        let stderr = cmd.stderr_string();
        if !stderr.is_empty() {
            output.push_str(&format!("\n{}\n", "stderr:".red()));
            output.push_str(&format_output_box(&stderr, true));
        }
    }

    output
}

fn format_output_box(content: &str, is_error: bool) -> String {
    let mut output = String::new();
    let indent = "  ";
    let max_width = terminal_width().saturating_sub(4);

    for line in content.lines() {
        if line.width() > max_width {
            // Wrap long lines
            let mut remaining = line;
            while remaining.width() > max_width {
                let (chunk, rest) = split_at_width(remaining, max_width);
                if is_error {
                    output.push_str(&format!("{}{}\n", indent, chunk.dimmed()));
                } else {
                    output.push_str(&format!("{indent}{chunk}\n"));
                }
                remaining = rest;
            }
            if !remaining.is_empty() {
                if is_error {
                    output.push_str(&format!("{}{}\n", indent, remaining.dimmed()));
                } else {
                    output.push_str(&format!("{indent}{remaining}\n"));
                }
            }
        } else if is_error {
            output.push_str(&format!("{}{}\n", indent, line.dimmed()));
        } else {
            output.push_str(&format!("{indent}{line}\n"));
        }
    }

    output
}

/// Split on the last char boundary whose display width fits `max_width`.
pub(crate) fn split_at_width(s: &str, max_width: usize) -> (&str, &str) {
    let mut width = 0;
    let mut split_pos = 0;

    for (i, ch) in s.char_indices() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width {
            break;
        }
        width += ch_width;
        split_pos = i + ch.len_utf8();
    }

    s.split_at(split_pos)
}

/// Closing summary: totals over all hosts plus wall-clock time.
pub fn format_summary(results: &[ExecutionResult], elapsed: Duration) -> String {
    let total = results.len();
    let success = results.iter().filter(|r| r.is_success()).count();
    let failed = total - success;
    let nonzero = results.iter().filter(|r| r.nonzero_exit()).count();

    let mut parts = Vec::new();
    parts.push(format!("{} hosts", total.to_string().bold()));

    if success > 0 {
        parts.push(format!(
            "{} {}",
            success.to_string().green().bold(),
            "successful".green()
        ));
    }

    if failed > 0 {
        parts.push(format!(
            "{} {}",
            failed.to_string().red().bold(),
            "failed".red()
        ));
    }

    if nonzero > 0 {
        parts.push(format!(
            "{} {}",
            nonzero.to_string().yellow().bold(),
            "nonzero exit".yellow()
        ));
    }

    let summary = parts.join(" • ");
    let rule = "═".repeat(terminal_width()).dimmed().to_string();

    format!(
        "\n{}\n{}\n{}\n",
        rule,
        format!(" Summary: {summary} ({}) ", format_duration(elapsed)).bold(),
        rule
    )
}

/// Short human duration: 840ms, 2.4s, 3m20s.
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    if total_ms < 1000 {
        format!("{total_ms}ms")
    } else if total_ms < 60_000 {
        format!("{:.1}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m{}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ActionKind;
    use crate::executor::Outcome;
    use crate::ssh::CommandOutput;

    fn success_run(exit_status: u32) -> ExecutionResult {
        ExecutionResult::success(
            Target::new("10.0.0.1", 22),
            ActionKind::Run,
            format!("exit status {exit_status}"),
            Some(CommandOutput {
                stdout: b"hello\n".to_vec(),
                stderr: Vec::new(),
                exit_status,
            }),
            None,
            Duration::from_millis(320),
        )
    }

    /// Drop ANSI escape sequences so assertions can span styled segments.
    fn strip_ansi(s: &str) -> String {
        let mut out = String::new();
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\u{1b}' {
                for c in chars.by_ref() {
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn test_result_line_marks_nonzero_exit() {
        let clean = format_result_line(&success_run(0));
        assert!(clean.contains("✓"));
        assert!(!clean.contains("exit"));

        let nonzero = format_result_line(&success_run(3));
        assert!(nonzero.contains("✓"));
        assert!(nonzero.contains("exit 3"));
    }

    #[test]
    fn test_result_line_shows_failure_label_and_cause() {
        let result = ExecutionResult::failure(
            Target::new("10.0.0.2", 22),
            ActionKind::Transfer,
            Outcome::ConnectFailed,
            "connection refused\nsecond line".to_string(),
            Duration::from_millis(12),
        );

        let line = format_result_line(&result);
        assert!(line.contains("✗"));
        assert!(line.contains("connect failed"));
        assert!(line.contains("connection refused"));
        assert!(!line.contains("second line"));
    }

    #[test]
    fn test_result_line_shows_transfer_bytes() {
        let result = ExecutionResult::success(
            Target::new("10.0.0.1", 22),
            ActionKind::Transfer,
            "payload.bin -> /opt/drop/payload.bin".to_string(),
            None,
            Some(2048),
            Duration::from_millis(900),
        );

        assert!(format_result_line(&result).contains("2.00 KB"));
    }

    #[test]
    fn test_summary_counts_all_buckets() {
        let results = vec![
            success_run(0),
            success_run(7),
            ExecutionResult::failure(
                Target::new("10.0.0.3", 22),
                ActionKind::Run,
                Outcome::AuthFailed,
                "password authentication rejected by server".to_string(),
                Duration::from_millis(40),
            ),
        ];

        let summary = strip_ansi(&format_summary(&results, Duration::from_secs(2)));
        assert!(summary.contains("3 hosts"));
        assert!(summary.contains("2 successful"));
        assert!(summary.contains("1 failed"));
        assert!(summary.contains("1 nonzero exit"));
    }

    #[test]
    fn test_summary_with_no_hosts() {
        let summary = strip_ansi(&format_summary(&[], Duration::from_millis(1)));
        assert!(summary.contains("0 hosts"));
        assert!(!summary.contains("successful"));
        assert!(!summary.contains("failed"));
    }

    #[test]
    fn test_split_at_width_respects_wide_chars() {
        let (chunk, rest) = split_at_width("한글테스트", 4);
        assert_eq!(chunk, "한글");
        assert_eq!(rest, "테스트");
    }

    #[test]
    fn test_format_duration_scales() {
        assert_eq!(format_duration(Duration::from_millis(840)), "840ms");
        assert_eq!(format_duration(Duration::from_millis(2400)), "2.4s");
        assert_eq!(format_duration(Duration::from_secs(200)), "3m20s");
    }
}

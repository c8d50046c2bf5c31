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

//! Target hosts and the newline-delimited targets file.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};

/// A single remote host to act on.
///
/// Targets come from the targets file in file order, and that order is
/// preserved all the way through execution and reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Read the targets file into an ordered list.
///
/// One host per line. Surrounding whitespace is trimmed and blank lines
/// are skipped; everything else is taken verbatim as a hostname or
/// address. There is no comment syntax, no deduplication, and no address
/// validation here. Unresolvable names surface later as per-host
/// connection failures.
pub fn load_targets(path: &Path, port: u16) -> Result<Vec<Target>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read targets file {}", path.display()))?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| Target::new(line, port))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_targets(contents: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().expect("create temp file");
        std::fs::write(file.path(), contents).expect("write temp file");
        file
    }

    #[test]
    fn test_load_skips_blank_lines_and_keeps_order() {
        let file = write_targets("10.0.0.1\n10.0.0.2\n\n10.0.0.3\n");
        let targets = load_targets(file.path(), 22).expect("load targets");

        assert_eq!(
            targets,
            vec![
                Target::new("10.0.0.1", 22),
                Target::new("10.0.0.2", 22),
                Target::new("10.0.0.3", 22),
            ]
        );
    }

    #[test]
    fn test_load_trims_surrounding_whitespace() {
        let file = write_targets("  web-01.example.com  \n\t10.0.0.9\t\n   \n");
        let targets = load_targets(file.path(), 2222).expect("load targets");

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].host, "web-01.example.com");
        assert_eq!(targets[1].host, "10.0.0.9");
        assert_eq!(targets[0].port, 2222);
    }

    #[test]
    fn test_load_keeps_duplicates() {
        let file = write_targets("10.0.0.1\n10.0.0.1\n");
        let targets = load_targets(file.path(), 22).expect("load targets");

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0], targets[1]);
    }

    #[test]
    fn test_load_has_no_comment_syntax() {
        let file = write_targets("# not a comment here\n10.0.0.1\n");
        let targets = load_targets(file.path(), 22).expect("load targets");

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].host, "# not a comment here");
    }

    #[test]
    fn test_load_empty_file_yields_empty_list() {
        let file = write_targets("");
        let targets = load_targets(file.path(), 22).expect("load targets");
        assert!(targets.is_empty());
    }

    #[test]
    fn test_load_missing_file_mentions_path() {
        let err = load_targets(Path::new("/nonexistent/hosts.txt"), 22)
            .expect_err("missing file must fail");
        assert!(err.to_string().contains("/nonexistent/hosts.txt"));
    }

    #[test]
    fn test_display_includes_port() {
        assert_eq!(Target::new("10.0.0.1", 22).to_string(), "10.0.0.1:22");
        assert_eq!(Target::new("db", 2022).to_string(), "db:2022");
    }
}

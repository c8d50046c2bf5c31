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

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{RunConfig, DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS};

#[derive(Parser, Debug)]
#[command(
    name = "fssh",
    version,
    about = "Fan-out SSH - push files and run commands across many hosts",
    long_about = "fssh runs one action against every host in a newline-delimited targets file:\npush a file, run a command, run a local script, or fetch a remote file.\nAll hosts share one username and password, passed only through SSH\nauthentication. Each host gets its own outcome line and the run ends with\na summary; a failing host never stops the rest.",
    after_help = "EXAMPLES:\n  Push a file to every host:    fssh transfer-command ./tool.bin /opt/drop hosts.txt admin -\n  Run a command everywhere:     fssh run-command hosts.txt admin - 'uname -a'\n  Run a local script:           fssh run-script ./deploy.sh hosts.txt admin - 2222\n  Collect a log from all hosts: fssh fetch-command /var/log/syslog ./logs hosts.txt admin -\n\nA password argument of '-' prompts interactively without echo."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'p',
        long,
        global = true,
        default_value_t = 1,
        help = "Maximum parallel connections (1 = one host at a time, in file order)"
    )]
    pub parallel: usize,

    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_COMMAND_TIMEOUT_SECS,
        help = "Per-host action timeout in seconds (0 for unlimited)"
    )]
    pub timeout: u64,

    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        help = "Per-host connect and authentication timeout in seconds (0 for unlimited)"
    )]
    pub connect_timeout: u64,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Write one JSON record per host to this file after the run"
    )]
    pub json: Option<PathBuf>,

    #[arg(
        short = 'v',
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Push a local file to every host",
        long_about = "Uploads one local file to all hosts over SFTP. The file keeps its name\nand lands inside the remote destination directory, restricted to owner\nread/write/execute. The file is read once locally before any connection\nis attempted.",
        after_help = "Examples:\n  fssh transfer-command ./tool.bin /opt/drop hosts.txt admin -\n  fssh transfer-command payload.tar /tmp hosts.txt root hunter2 2222"
    )]
    TransferCommand {
        #[arg(help = "Local file to push")]
        local_source: PathBuf,

        #[arg(help = "Remote destination directory (file keeps its local name)")]
        remote_dest: String,

        #[arg(help = "File listing target hosts, one per line")]
        targets_file: PathBuf,

        #[arg(help = "SSH username shared by all hosts")]
        username: String,

        #[arg(help = "SSH password shared by all hosts ('-' prompts without echo)")]
        password: String,

        #[arg(default_value_t = 22, help = "SSH port")]
        port: u16,
    },

    #[command(
        about = "Run a shell command on every host",
        long_about = "Executes one command string on all hosts and reports each host's\noutcome. Sequentially the remote output streams live; in parallel mode\nit is buffered and printed per host afterwards. A nonzero remote exit\nstatus still counts as a completed run; the status is surfaced on the\nhost's line and in the summary.",
        after_help = "Examples:\n  fssh run-command hosts.txt admin - 'uname -a'\n  fssh -p 16 run-command hosts.txt deploy - 'systemctl restart app' 2222"
    )]
    RunCommand {
        #[arg(help = "File listing target hosts, one per line")]
        targets_file: PathBuf,

        #[arg(help = "SSH username shared by all hosts")]
        username: String,

        #[arg(help = "SSH password shared by all hosts ('-' prompts without echo)")]
        password: String,

        #[arg(help = "Command to execute on each host (quote it as one argument)")]
        command: String,

        #[arg(default_value_t = 22, help = "SSH port")]
        port: u16,
    },

    #[command(
        about = "Push a local script to every host, run it, then remove it",
        long_about = "Stages a local script under /tmp on each host with a unique name, marks\nit owner-executable, runs it with sh, and removes it afterwards. Removal\nis best effort; the reported exit status is always the script's own.",
        after_help = "Examples:\n  fssh run-script ./deploy.sh hosts.txt admin -\n  fssh run-script ./collect-facts.sh hosts.txt ops - 2222"
    )]
    RunScript {
        #[arg(help = "Local script to stage and execute")]
        local_script: PathBuf,

        #[arg(help = "File listing target hosts, one per line")]
        targets_file: PathBuf,

        #[arg(help = "SSH username shared by all hosts")]
        username: String,

        #[arg(help = "SSH password shared by all hosts ('-' prompts without echo)")]
        password: String,

        #[arg(default_value_t = 22, help = "SSH port")]
        port: u16,
    },

    #[command(
        about = "Download a remote file from every host",
        long_about = "Fetches the same remote path from all hosts over SFTP into a local\ndirectory. Each copy is prefixed with its host name (host_filename) so\nhosts never overwrite each other. The directory is created if missing.",
        after_help = "Examples:\n  fssh fetch-command /var/log/syslog ./logs hosts.txt admin -\n  fssh fetch-command /etc/hostname ./names hosts.txt audit - 2222"
    )]
    FetchCommand {
        #[arg(help = "Remote file path to fetch from each host")]
        remote_source: String,

        #[arg(help = "Local destination directory (files saved as host_filename)")]
        local_dest: PathBuf,

        #[arg(help = "File listing target hosts, one per line")]
        targets_file: PathBuf,

        #[arg(help = "SSH username shared by all hosts")]
        username: String,

        #[arg(help = "SSH password shared by all hosts ('-' prompts without echo)")]
        password: String,

        #[arg(default_value_t = 22, help = "SSH port")]
        port: u16,
    },
}

impl Cli {
    /// Collect the global flags into the executor's run options.
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            max_parallel: self.parallel.max(1),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            command_timeout: Duration::from_secs(self.timeout),
            json_path: self.json.clone(),
            verbose: self.verbose,
        }
    }
}

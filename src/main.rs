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

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;

use fssh::{
    cli::{Cli, Commands},
    commands::{
        fetch::{fetch_file, FetchParams},
        run::{run_command, RunParams},
        script::{run_script, ScriptParams},
        transfer::{transfer_file, TransferParams},
    },
    utils::init_logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version arrive through the error path too; only
            // genuine usage mistakes are failures.
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    init_logging(cli.verbose);

    let config = cli.run_config();

    match cli.command {
        Commands::TransferCommand {
            local_source,
            remote_dest,
            targets_file,
            username,
            password,
            port,
        } => {
            let params = TransferParams {
                local_source,
                remote_dest,
                targets_file,
                username,
                password,
                port,
            };
            transfer_file(params, &config).await
        }
        Commands::RunCommand {
            targets_file,
            username,
            password,
            command,
            port,
        } => {
            let params = RunParams {
                targets_file,
                username,
                password,
                command,
                port,
            };
            run_command(params, &config).await
        }
        Commands::RunScript {
            local_script,
            targets_file,
            username,
            password,
            port,
        } => {
            let params = ScriptParams {
                local_script,
                targets_file,
                username,
                password,
                port,
            };
            run_script(params, &config).await
        }
        Commands::FetchCommand {
            remote_source,
            local_dest,
            targets_file,
            username,
            password,
            port,
        } => {
            let params = FetchParams {
                remote_source,
                local_dest,
                targets_file,
                username,
                password,
                port,
            };
            fetch_file(params, &config).await
        }
    }
}

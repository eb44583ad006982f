use anyhow::Result;
use clap::Parser;

use gascan::app::{self, RunContext};
use gascan::cli::Cli;
use gascan::exit_codes;
use gascan::io::identity::HostEnv;
use gascan::io::process::InheritedStdio;
use gascan::payload::Payload;

fn main() {
    let cli = Cli::parse();
    gascan::logging::init(cli.log_level.as_str());

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let host = HostEnv::from_process()?;
    let payload = Payload::embedded();
    let ctx = RunContext {
        payload: &payload,
        host: &host,
        launcher: &InheritedStdio,
        now: chrono::Utc::now(),
    };
    app::run(cli, &ctx)
}

// src/main.rs

use std::process::ExitCode;

use watchrun::{cli, logging, run};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    if let Err(err) = logging::init_logging(args.log_level, args.verbose) {
        eprintln!("watchrun error: {err:?}");
        return ExitCode::from(2);
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("watchrun error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

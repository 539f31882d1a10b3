use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use groupsite::Cli;

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "groupsite=info",
        1 => "groupsite=debug",
        _ => "groupsite=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match groupsite::run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

use std::process::ExitCode;

use fixtypo::cli::FixTypo;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = FixTypo::new();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();
    cli.run()
}

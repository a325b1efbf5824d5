use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = lineupctl::Cli::parse();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(lineupctl::log_filter(&cli)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    if let Err(err) = lineupctl::run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

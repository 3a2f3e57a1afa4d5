//! blitz-sync - replay fetch/upload/listing tool for
//! replays.wotinspector.com
//!
//! Usage:
//!   blitz-sync fetch <replay-id>...     Fetch replay records by id
//!   blitz-sync upload <file>...         Upload replay files
//!   blitz-sync list <page>...           Scan listing pages for replay ids
//!   blitz-sync parse-ids <file>...      Extract replay ids from saved HTML
//!   blitz-sync --help                   Show help

use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        cli::print_help();
        return Ok(());
    }

    match cli::parse_args(&args) {
        Ok((command, options)) => cli::run(command, options).await,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!();
            cli::print_help();
            std::process::exit(1);
        }
    }
}

fn init_logging() {
    // Command output goes to stdout, diagnostics to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use bankers::bank::Bank;
use bankers::session::Session;
use bankers::storage::JsonFileRepo;

#[derive(Parser)]
#[command(version, about = "Bank of Bankers: sign up, log in and move money around")]
struct Opts {
    /// JSON file holding every account
    #[arg(short, long, env = "BANK_ACCOUNTS_FILE", default_value = "accounts.json")]
    file: PathBuf,
}

fn run() -> Result<()> {
    let opts: Opts = Opts::parse();

    // @TODO: take an advisory lock on the accounts file; two processes sharing
    // it currently overwrite each other's changes.
    let repo = JsonFileRepo::new(opts.file);
    let mut bank = Bank::open(&repo)?;

    let mut session = Session::new(&mut bank, io::stdin().lock(), io::stdout().lock());
    session.run()
}

fn main() {
    // Logs go to stderr and stay quiet unless RUST_LOG asks for more, so they
    // don't interleave with the menus on stdout.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    if let Err(e) = run() {
        error!(error = format!("{:#}", e), "Something went wrong");
        std::process::exit(1);
    }
}

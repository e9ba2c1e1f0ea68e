use std::io::{self, IsTerminal, Write};

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use papers_crawler::{
    config::Config,
    crawl::{self, Format},
    source::entrez::Entrez,
};

use crate::cli::{Cli, Command};

mod cli;

fn init_logging(verbose: bool) {
    let fallback = if verbose {
        "papers_crawler=debug"
    } else {
        "papers_crawler=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(io::stderr().is_terminal())
                .with_target(false),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    match args.command {
        Command::Fetch => {
            let summary = crawl::fetch(&config, &Entrez::new(&config))?;
            eprintln!("{summary}");
        }
        Command::Parse { json } => {
            let format = if json { Format::Json } else { Format::Text };
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let summary = crawl::parse(&config, format, &mut out)?;
            out.flush()?;
            eprintln!("{summary}");
        }
    }
    Ok(())
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./papers-crawler.toml, then the platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding the fetched documents, overriding the configuration
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Search every tracked name variant and store the raw citation documents
    Fetch,
    /// Parse the stored documents and print one line per article
    Parse {
        /// Print records as JSON, one object per line
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exactly_one_mode() {
        let cli = Cli::try_parse_from(["papers-crawler", "fetch"]).expect("parse");
        assert_eq!(cli.command, Command::Fetch);

        let cli = Cli::try_parse_from(["papers-crawler", "parse", "--json"]).expect("parse");
        assert_eq!(cli.command, Command::Parse { json: true });
    }

    #[test]
    fn rejects_other_invocations() {
        for args in [
            &["papers-crawler"][..],
            &["papers-crawler", "crawl"],
            &["papers-crawler", "fetch", "parse"],
            &["papers-crawler", "parse", "extra"],
        ] {
            assert!(Cli::try_parse_from(args).is_err(), "accepted {args:?}");
        }
    }

    #[test]
    fn global_options_follow_the_mode() {
        let cli = Cli::try_parse_from([
            "papers-crawler",
            "parse",
            "--config",
            "crawl.toml",
            "--data-dir",
            "out",
            "-v",
        ])
        .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("crawl.toml")));
        assert_eq!(cli.data_dir, Some(PathBuf::from("out")));
        assert!(cli.verbose);
    }
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "blogcrawl",
    version,
    about = "Mirror blogs, liked feeds and search results to disk"
)]
pub struct Args {
    /// Configuration file; defaults to the user config directory.
    #[arg(short, long, global = true, env = "BLOGCRAWL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Debug logging.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Errors only.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Crawl every configured target, or a single ad-hoc one.
    Run {
        /// Crawl only this target instead of the configured list.
        #[arg(long, requires = "variant")]
        name: Option<String>,

        /// Variant of the ad-hoc target, e.g. `public-blog` or `tag-search-results`.
        #[arg(long, requires = "name")]
        variant: Option<String>,

        /// Metadata format for the ad-hoc target: `text` or `json`.
        #[arg(long)]
        format: Option<String>,

        /// Override the configured download directory.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Override the configured page limit.
        #[arg(long)]
        max_pages: Option<u32>,

        /// Override the configured download concurrency.
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
    },

    /// Inspect the configuration.
    Config {
        /// Print the effective configuration.
        #[arg(long)]
        show: bool,

        /// Print the path the configuration is read from.
        #[arg(long)]
        path: bool,
    },
}

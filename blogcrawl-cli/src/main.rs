mod cli;
mod config;
mod error;
mod runner;

use std::process;
use std::sync::Arc;

use blogcrawl_engine::{
    Dispatcher, FsIndexStore, HttpTransportFactory, IndexLoader, IndexRegistry, IndexStore,
    TargetConfig,
};
use clap::Parser;
use pipeline_common::{CancellationToken, LogProgress, PauseToken, RuntimeControls};
use tracing::{Level, error, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::cli::{Args, Commands};
use crate::config::AppConfig;
use crate::error::{AppError, Result};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        error!("Application error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    match args.command {
        Commands::Config { show, path } => {
            if path {
                match args.config.clone().or_else(AppConfig::default_path) {
                    Some(path) => println!("{}", path.display()),
                    None => println!("No config directory on this platform"),
                }
            }
            if show {
                let config = AppConfig::load(args.config.as_deref())?;
                println!("{}", config.show()?);
            }
            if !show && !path {
                println!("Use --show to display the current configuration or --path to locate it");
            }
            Ok(())
        }
        Commands::Run {
            name,
            variant,
            format,
            output_dir,
            max_pages,
            concurrency,
        } => {
            let mut config = AppConfig::load(args.config.as_deref())?;
            if let Some(dir) = output_dir {
                config.download_dir = dir;
            }
            if max_pages.is_some() {
                config.max_pages = max_pages;
            }
            if let Some(concurrency) = concurrency {
                config.download_concurrency = concurrency;
            }

            let targets = match (name, variant) {
                (Some(name), Some(variant)) => {
                    let mut target = TargetConfig::new(name, variant);
                    target.metadata_format = format;
                    vec![target]
                }
                _ => config.targets.clone(),
            };
            if targets.is_empty() {
                return Err(AppError::InvalidInput(
                    "no targets configured; add [[targets]] to the config or pass --name and --variant"
                        .to_owned(),
                ));
            }
            crawl(&config, &targets).await
        }
    }
}

async fn crawl(config: &AppConfig, targets: &[TargetConfig]) -> Result<()> {
    let crawler = config.crawler_config();
    let store: Arc<dyn IndexStore> = Arc::new(FsIndexStore::new(config.index_dir()));
    let registry = if crawler.load_all_indices {
        IndexRegistry::load(store.as_ref())?
    } else {
        IndexRegistry::empty()
    };
    let indices = IndexLoader::new(store.clone(), Arc::new(registry), crawler.load_all_indices);
    let transports = Arc::new(HttpTransportFactory::new(config.transport_config()));
    let dispatcher = Dispatcher::new(crawler, indices, transports)?;

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, stopping crawls");
            signal_token.cancel();
        }
    });
    let controls = RuntimeControls::new(token, PauseToken::never(), Arc::new(LogProgress));

    info!(targets = targets.len(), "Starting crawl");
    let outcomes = runner::run_targets(&dispatcher, store, targets, &controls).await;

    let mut failed = 0;
    for outcome in &outcomes {
        if outcome.result.is_err() {
            failed += 1;
        }
        println!("{}", outcome.summary());
    }
    if failed > 0 {
        return Err(AppError::TargetsFailed {
            failed,
            total: outcomes.len(),
        });
    }
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_level(verbose))
        .init();
}

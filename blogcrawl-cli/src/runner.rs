use std::collections::HashSet;
use std::sync::Arc;

use blogcrawl_engine::{
    CrawlError, Dispatcher, Index, IndexEntry, IndexStore, PipelineReport, Target, TargetConfig,
};
use futures::future::join_all;
use pipeline_common::RuntimeControls;
use tracing::{error, info, warn};

use crate::error::AppError;

/// How one target's crawl ended.
#[derive(Debug)]
pub struct TargetOutcome {
    pub config: TargetConfig,
    pub result: Result<PipelineReport, CrawlError>,
    /// Entries added to the stored index.
    pub saved: usize,
}

impl TargetOutcome {
    pub fn summary(&self) -> String {
        let label = format!("{} ({})", self.config.name, self.config.variant);
        match &self.result {
            Ok(report) => format!(
                "{label}: {} downloaded, {} skipped, {} failed, {} pages in {:.1}s",
                report.stats.downloaded,
                report.stats.skipped,
                report.stats.failed,
                report.stats.pages,
                report.elapsed.as_secs_f64()
            ),
            Err(e) => format!("{label}: {e} ({} saved)", self.saved),
        }
    }
}

/// Crawl every target concurrently under `controls`.
///
/// Repeated entries for the same name and variant run once. Downloads are
/// merged into each target's stored index even when its run was cancelled
/// or failed midway, so nothing fetched is fetched again.
pub async fn run_targets(
    dispatcher: &Dispatcher,
    store: Arc<dyn IndexStore>,
    targets: &[TargetConfig],
    controls: &RuntimeControls,
) -> Vec<TargetOutcome> {
    let runs = unique_targets(targets)
        .into_iter()
        .map(|config| run_target(dispatcher, store.as_ref(), config, controls));
    join_all(runs).await
}

/// Drop entries naming a target already listed. Invalid entries are kept so
/// their error is reported.
fn unique_targets(targets: &[TargetConfig]) -> Vec<&TargetConfig> {
    let mut seen = HashSet::new();
    targets
        .iter()
        .filter(|config| match Target::from_config(config) {
            Ok(target) => {
                let fresh = seen.insert((target.name().to_owned(), target.variant));
                if !fresh {
                    warn!(
                        target_name = %config.name,
                        variant = %config.variant,
                        "Duplicate target ignored"
                    );
                }
                fresh
            }
            Err(_) => true,
        })
        .collect()
}

async fn run_target(
    dispatcher: &Dispatcher,
    store: &dyn IndexStore,
    config: &TargetConfig,
    controls: &RuntimeControls,
) -> TargetOutcome {
    let pipeline = match dispatcher.assemble_config(config, controls) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!(
                target_name = %config.name,
                variant = %config.variant,
                error = %e,
                "Cannot start crawl"
            );
            return TargetOutcome {
                config: config.clone(),
                result: Err(e),
                saved: 0,
            };
        }
    };

    let target = pipeline.target().clone();
    let ledger = pipeline.ledger();
    let result = pipeline.run().await;
    let entries = match &result {
        Ok(report) => report.new_entries.clone(),
        Err(_) => ledger.take(),
    };

    let saved = match persist(store, &target, entries) {
        Ok(saved) => saved,
        Err(e) => {
            warn!(target_name = %target.name(), error = %e, "Failed to update index");
            0
        }
    };
    TargetOutcome {
        config: config.clone(),
        result,
        saved,
    }
}

/// Merge `entries` into the stored index of `target`.
fn persist(
    store: &dyn IndexStore,
    target: &Target,
    entries: Vec<(String, IndexEntry)>,
) -> Result<usize, AppError> {
    if entries.is_empty() {
        return Ok(0);
    }
    let mut index = store
        .read_index(target)?
        .unwrap_or_else(|| Index::for_target(target));
    let added = index.extend(entries);
    if added > 0 {
        store.write_index(&index)?;
        info!(target_name = %target.name(), added, total = index.len(), "Index updated");
    }
    Ok(added)
}

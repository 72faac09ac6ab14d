use pipeline_common::{ProgressEvent, RuntimeControls};
use tracing::{debug, warn};

use super::{AuthFailures, StageStats, cancellable};
use crate::error::CrawlError;
use crate::source::{PageCursor, PageSource};

/// Stop paging after this many failed pages in a row.
const MAX_CONSECUTIVE_PAGE_FAILURES: u32 = 3;

/// Shared paging loop of the producer stages.
///
/// A failed page is reported and skipped when the source can skip it;
/// otherwise paging ends there. Only session-fatal failures past the
/// threshold abort the stage.
pub(crate) async fn walk_pages<S, F>(
    controls: &RuntimeControls,
    stage: &'static str,
    source: &S,
    auth: &AuthFailures,
    max_pages: Option<u32>,
    stats: &mut StageStats,
    mut on_record: F,
) -> Result<(), CrawlError>
where
    S: PageSource + ?Sized,
    F: FnMut(S::Record, &mut StageStats) -> Result<(), CrawlError>,
{
    let mut cursor = Some(PageCursor::first());
    let mut failed_in_row = 0;

    while let Some(current) = cursor.take() {
        if max_pages.is_some_and(|max| current.page >= max) {
            debug!(target_name = %controls.name, stage, pages = current.page, "Page limit reached");
            break;
        }

        controls.checkpoint(stage).await?;
        match cancellable(controls, source.fetch_page(&current)).await? {
            Ok(page) => {
                auth.record_success();
                failed_in_row = 0;
                stats.pages += 1;
                stats.records += page.records.len() as u64;
                controls.report(ProgressEvent::PageFetched {
                    target: controls.name.clone(),
                    page: current.page,
                    records: page.records.len(),
                });
                for record in page.records {
                    on_record(record, stats)?;
                }
                cursor = page.next;
            }
            Err(err) => {
                let url = source.page_url(&current);
                warn!(target_name = %controls.name, stage, %url, error = %err, "Page fetch failed");
                stats.failed += 1;
                controls.report(ProgressEvent::Failed {
                    target: controls.name.clone(),
                    url,
                    error: err.to_string(),
                });
                if let Some(failures) = auth.record_failure(&err) {
                    return Err(CrawlError::SessionRejected {
                        failures,
                        source: err,
                    });
                }
                failed_in_row += 1;
                if failed_in_row >= MAX_CONSECUTIVE_PAGE_FAILURES {
                    warn!(target_name = %controls.name, stage, "Too many failed pages, stopping");
                    break;
                }
                cursor = source.skip_failed(&current);
            }
        }
    }
    Ok(())
}

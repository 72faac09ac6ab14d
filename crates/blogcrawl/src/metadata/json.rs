use serde::Serialize;

use super::MetadataRenderer;
use crate::error::CrawlError;
use crate::model::PostRecord;
use crate::target::MetadataFormat;

/// Pretty-printed JSON of the full record.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl<R> MetadataRenderer<R> for JsonRenderer
where
    R: PostRecord + Serialize,
{
    fn format(&self) -> MetadataFormat {
        MetadataFormat::Json
    }

    fn render(&self, record: &R) -> Result<Vec<u8>, CrawlError> {
        let mut out =
            serde_json::to_vec_pretty(record).map_err(|e| CrawlError::render(record.post_id(), e))?;
        out.push(b'\n');
        Ok(out)
    }
}

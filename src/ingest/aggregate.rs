//! Context aggregation: per-source truncation, headers, and image collection.

use crate::config::PipelineLimits;
use crate::ingest::format::FileKind;
use crate::ingest::types::{ExtractionRecord, ImagePart};

/// Text and images assembled from extraction records, in upload order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedContext {
    /// Headered, truncated text blocks separated by blank lines.
    pub text: String,
    /// Inline image payloads.
    pub images: Vec<ImagePart>,
}

impl AggregatedContext {
    /// `true` when the aggregated text has non-whitespace content.
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// `true` when there is text or at least one image to send.
    pub fn has_content(&self) -> bool {
        self.has_text() || !self.images.is_empty()
    }
}

/// Aggregate records into a bounded context.
///
/// Image records contribute through their payload only; their placeholder text is not part of
/// the aggregated text. The text is therefore empty iff no non-image record has non-blank text.
pub fn aggregate(records: &[ExtractionRecord], limits: &PipelineLimits) -> AggregatedContext {
    let blocks: Vec<String> = records
        .iter()
        .filter(|record| record.kind != FileKind::Image && !record.text.trim().is_empty())
        .map(|record| {
            format!(
                "--- {} ({}) ---\n{}",
                record.name,
                record.extension,
                truncate_chars(&record.text, limits.max_chars_per_file)
            )
        })
        .collect();

    let images = records
        .iter()
        .filter_map(|record| record.image.clone())
        .collect();

    AggregatedContext {
        text: blocks.join("\n\n"),
        images,
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

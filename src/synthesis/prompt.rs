//! Prompt construction and the locally generated diagnostic answer.

use crate::ingest::{AggregatedContext, ExtractionRecord};
use std::fmt::Write as _;

const ANSWER_INSTRUCTIONS: &str = "Instructions:\n\
- Answer the question using the provided material.\n\
- For math problems, equations, charts or diagrams, reason step by step and show the work.\n\
- Format the answer with Markdown: headings, lists and LaTeX for formulas where helpful.\n\
- If the material does not contain the answer, say so plainly.";

/// Prompt framing, selected deterministically from the aggregated context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    /// Extracted text only.
    TextOnly,
    /// Attached images only.
    ImageOnly,
    /// Extracted text plus attached images.
    Mixed,
}

impl PromptMode {
    /// Pick the framing, or `None` when there is nothing to send.
    pub fn select(context: &AggregatedContext) -> Option<Self> {
        match (context.has_text(), !context.images.is_empty()) {
            (true, true) => Some(Self::Mixed),
            (true, false) => Some(Self::TextOnly),
            (false, true) => Some(Self::ImageOnly),
            (false, false) => None,
        }
    }
}

/// Build the prompt text for the given mode.
pub fn build_prompt(mode: PromptMode, question: &str, context: &AggregatedContext) -> String {
    let mut prompt = String::new();
    match mode {
        PromptMode::ImageOnly => {
            let _ = writeln!(
                prompt,
                "Analyze the {} attached image(s) carefully. Read any visible text, tables, \
                 formulas and diagrams.",
                context.images.len()
            );
        }
        PromptMode::Mixed => {
            prompt.push_str("Use the following content extracted from the uploaded files:\n\n");
            prompt.push_str(&context.text);
            let _ = write!(
                prompt,
                "\n\n{} image(s) are also attached. Analyze them together with the text above.\n",
                context.images.len()
            );
        }
        PromptMode::TextOnly => {
            prompt.push_str("Use the following content extracted from the uploaded files:\n\n");
            prompt.push_str(&context.text);
            prompt.push('\n');
        }
    }
    let _ = write!(prompt, "\nQuestion: {question}\n\n{ANSWER_INSTRUCTIONS}");
    prompt
}

/// Explain, per file, why nothing could be extracted.
pub fn build_diagnostic_answer(records: &[ExtractionRecord]) -> String {
    let mut answer = String::from(
        "No readable content could be extracted from the uploaded files, so the question \
         was not sent for answering.\n\nFiles received:\n",
    );
    if records.is_empty() {
        answer.push_str("- (none)\n");
    }
    for record in records {
        let kind = if record.extension.is_empty() {
            "unknown"
        } else {
            record.extension.as_str()
        };
        let detail = record
            .error
            .as_deref()
            .or(record.notice.as_deref())
            .unwrap_or("no text found");
        let _ = writeln!(
            answer,
            "- {} (type: {kind}, size: {} bytes): {detail}",
            record.name, record.byte_size
        );
    }
    answer.push_str(
        "\nLikely causes: the PDF is scanned (image-only pages), the file is encrypted or \
         password-protected, the file is corrupted, or its format is not supported. \
         Try uploading the pages as images or a text-based export of the document.",
    );
    answer
}

/// Per-file errors joined into one summary line.
pub fn error_summary(records: &[ExtractionRecord]) -> Option<String> {
    let errors: Vec<String> = records
        .iter()
        .filter_map(|record| {
            record
                .error
                .as_ref()
                .map(|error| format!("{}: {error}", record.name))
        })
        .collect();
    (!errors.is_empty()).then(|| errors.join("; "))
}

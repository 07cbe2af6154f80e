//! Office Open XML decoders: DOCX to raw text, XLSX to CSV per sheet.

use crate::ingest::types::ExtractionError;
use calamine::{Data, Reader, Xlsx};
use quick_xml::Reader as XmlReader;
use quick_xml::events::Event;
use std::io::{Cursor, Read};

const DOCX_BODY_ENTRY: &str = "word/document.xml";
/// Decompressed size cap for a single archive entry.
const MAX_XML_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// Extract the raw text of a DOCX document, one paragraph per block.
///
/// An empty document is a valid result.
pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|error| ExtractionError::ExtractionFailed(format!("DOCX container error: {error}")))?;
    let entry = archive.by_name(DOCX_BODY_ENTRY).map_err(|error| {
        ExtractionError::ExtractionFailed(format!("DOCX is missing {DOCX_BODY_ENTRY}: {error}"))
    })?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|error| ExtractionError::ExtractionFailed(format!("DOCX read error: {error}")))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractionError::ExtractionFailed(format!(
            "{DOCX_BODY_ENTRY} exceeds {MAX_XML_ENTRY_BYTES} bytes"
        )));
    }

    paragraphs_from_document_xml(&xml).map(|paragraphs| paragraphs.join("\n\n"))
}

fn paragraphs_from_document_xml(xml: &[u8]) -> Result<Vec<String>, ExtractionError> {
    let mut reader = XmlReader::from_reader(xml);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(element)) => match element.local_name().as_ref() {
                b"t" => in_text_run = true,
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(element)) => match element.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::End(element)) => match element.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => {
                    let paragraph = std::mem::take(&mut current);
                    if !paragraph.trim().is_empty() {
                        paragraphs.push(paragraph);
                    }
                }
                _ => {}
            },
            Ok(Event::Text(text)) if in_text_run => {
                let unescaped = text.unescape().map_err(|error| {
                    ExtractionError::ExtractionFailed(format!("DOCX text decode error: {error}"))
                })?;
                current.push_str(&unescaped);
            }
            Ok(Event::Eof) => break,
            Err(error) => {
                return Err(ExtractionError::ExtractionFailed(format!(
                    "DOCX XML error at position {}: {error}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if !current.trim().is_empty() {
        paragraphs.push(current);
    }
    Ok(paragraphs)
}

/// Convert every worksheet to CSV, in workbook order, joined by newlines.
pub fn extract_xlsx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|error| ExtractionError::ExtractionFailed(format!("XLSX parse error: {error}")))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(sheet_names.len());
    for name in &sheet_names {
        let range = workbook.worksheet_range(name).map_err(|error| {
            ExtractionError::ExtractionFailed(format!("XLSX sheet '{name}' error: {error}"))
        })?;
        let csv: Vec<String> = range
            .rows()
            .map(|row| {
                row.iter()
                    .map(|cell| csv_field(&cell_to_string(cell)))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect();
        sheets.push(csv.join("\n"));
    }

    Ok(sheets.join("\n"))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) | Data::DateTimeIso(value) | Data::DurationIso(value) => value.clone(),
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", *value as i64)
        }
        Data::Float(value) => value.to_string(),
        Data::Int(value) => value.to_string(),
        Data::Bool(value) => if *value { "TRUE" } else { "FALSE" }.to_string(),
        Data::Error(error) => error.to_string(),
        other => other.to_string(),
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

//! Extension-based format detection.

/// MIME type assigned to image uploads whose extension has no entry in [`IMAGE_MIME_TYPES`].
pub const FALLBACK_IMAGE_MIME: &str = "image/jpeg";

/// Image extensions and the MIME type forwarded with their inline payload.
pub const IMAGE_MIME_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("bmp", "image/bmp"),
];

/// Extensions decoded as UTF-8 text.
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "text", "md", "markdown", "csv", "json", "xml", "log", "html", "htm",
];

/// Closed set of upload classifications; each maps to exactly one extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word-processing document.
    Docx,
    /// Office Open XML spreadsheet.
    Xlsx,
    /// Plain text or HTML.
    Text,
    /// Raster image forwarded as multimodal payload.
    Image,
    /// Anything else; yields an empty record without an error.
    Unsupported,
}

impl FileKind {
    /// Short label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Xlsx => "xlsx",
            Self::Text => "text",
            Self::Image => "image",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Lowercased extension of `name` without the leading dot, or an empty string.
pub fn extension_of(name: &str) -> String {
    let file_name = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => extension.to_lowercase(),
        _ => String::new(),
    }
}

/// Classify an upload by its lowercased extension.
pub fn detect(name: &str) -> FileKind {
    classify_extension(&extension_of(name))
}

/// Classify an already-lowercased extension.
pub fn classify_extension(extension: &str) -> FileKind {
    match extension {
        "pdf" => FileKind::Pdf,
        "docx" => FileKind::Docx,
        "xlsx" => FileKind::Xlsx,
        ext if TEXT_EXTENSIONS.contains(&ext) => FileKind::Text,
        ext if IMAGE_MIME_TYPES.iter().any(|(known, _)| *known == ext) => FileKind::Image,
        _ => FileKind::Unsupported,
    }
}

/// MIME type for an image extension, falling back to [`FALLBACK_IMAGE_MIME`].
pub fn image_mime(extension: &str) -> &'static str {
    IMAGE_MIME_TYPES
        .iter()
        .find(|(known, _)| *known == extension)
        .map(|(_, mime)| *mime)
        .unwrap_or(FALLBACK_IMAGE_MIME)
}

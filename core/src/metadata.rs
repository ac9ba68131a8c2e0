use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Extensions the server translates; their translated copies are saved as
/// `<stem>_translated.<ext>`.
const TRANSLATABLE_EXTENSIONS: &[&str] = &["asta", "astah", "svg"];

/// One uploaded document as reported by the server listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub file_name: String,
    #[serde(default)]
    pub translated: bool,
    #[serde(default)]
    pub uploaded_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub translated_at: Option<NaiveDateTime>,
    /// Text was converted to paths; nothing can be extracted for translation.
    #[serde(default)]
    pub outlined: bool,
    /// Number of translated versions, `None` when never translated.
    #[serde(default)]
    pub version: Option<u32>,
    /// Number of uploaded originals sharing this file's base name.
    #[serde(default)]
    pub original_version: Option<u32>,
}

impl FileMetadata {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            translated: false,
            uploaded_at: None,
            translated_at: None,
            outlined: false,
            version: None,
            original_version: None,
        }
    }

    pub fn outlined(mut self, outlined: bool) -> Self {
        self.outlined = outlined;
        self
    }

    pub fn translated(mut self, translated: bool) -> Self {
        self.translated = translated;
        self
    }
}

pub fn find<'a>(listing: &'a [FileMetadata], file_name: &str) -> Option<&'a FileMetadata> {
    listing.iter().find(|entry| entry.file_name == file_name)
}

/// Whether the server accepts `file_name` for upload, judged by extension.
pub fn is_supported_file(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| {
            TRANSLATABLE_EXTENSIONS
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Name a downloaded translation is saved under.
///
/// `diagram.svg` becomes `diagram_translated.svg`; names with other
/// extensions are returned unchanged.
pub fn translated_file_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if TRANSLATABLE_EXTENSIONS.contains(&ext) => {
            format!("{stem}_translated.{ext}")
        }
        _ => file_name.to_string(),
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Config;
use crate::error::{AppError, ValidationError};
use crate::gallery::{PendingSave, SavedItemStore};
use crate::generator::Generator;

/// Explicit timestamp unit. The clock lives in the shell; the core only
/// ever receives these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnixTimeMs(pub u64);

impl UnixTimeMs {
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeKind {
    Qr,
    Barcode,
}

impl CodeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Qr => "qr",
            Self::Barcode => "barcode",
        }
    }
}

impl fmt::Display for CodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gallery filter. `All` passes every kind through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindFilter {
    #[default]
    All,
    Qr,
    Barcode,
}

impl KindFilter {
    #[must_use]
    pub fn matches(self, kind: CodeKind) -> bool {
        match self {
            Self::All => true,
            Self::Qr => kind == CodeKind::Qr,
            Self::Barcode => kind == CodeKind::Barcode,
        }
    }

    #[must_use]
    pub const fn kind(self) -> Option<CodeKind> {
        match self {
            Self::All => None,
            Self::Qr => Some(CodeKind::Qr),
            Self::Barcode => Some(CodeKind::Barcode),
        }
    }
}

impl From<CodeKind> for KindFilter {
    fn from(kind: CodeKind) -> Self {
        match kind {
            CodeKind::Qr => Self::Qr,
            CodeKind::Barcode => Self::Barcode,
        }
    }
}

/// Creation time of a saved item.
///
/// Collections written by older builds stored a locale-formatted string, so
/// both shapes are accepted on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreatedAt {
    Epoch(UnixTimeMs),
    Label(String),
}

impl CreatedAt {
    #[must_use]
    pub fn as_millis(&self) -> Option<u64> {
        match self {
            Self::Epoch(ms) => Some(ms.as_millis()),
            Self::Label(_) => None,
        }
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Epoch(_) => None,
            Self::Label(s) => Some(s),
        }
    }
}

/// A rendered code kept in the gallery. Immutable once built.
///
/// Deserialization goes through [`SavedItem::new`], so stored entries obey
/// the same rules as fresh saves.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredItem")]
pub struct SavedItem {
    #[serde(rename = "dataURL")]
    image: String,
    #[serde(rename = "type")]
    kind: CodeKind,
    content: String,
    #[serde(rename = "timestamp")]
    created_at: CreatedAt,
}

/// Wire shape of a saved item before validation.
#[derive(Deserialize)]
struct StoredItem {
    #[serde(rename = "dataURL")]
    image: String,
    #[serde(rename = "type")]
    kind: CodeKind,
    content: String,
    #[serde(rename = "timestamp")]
    created_at: CreatedAt,
}

impl TryFrom<StoredItem> for SavedItem {
    type Error = ValidationError;

    fn try_from(raw: StoredItem) -> Result<Self, Self::Error> {
        Self::new(raw.kind, raw.content, raw.image, raw.created_at)
    }
}

impl SavedItem {
    /// Builds an item, rejecting empty content or a missing image.
    ///
    /// `content` is expected to be normalized already; surrounding whitespace
    /// is trimmed regardless so a blank string never passes.
    pub fn new(
        kind: CodeKind,
        content: impl Into<String>,
        image: impl Into<String>,
        created_at: CreatedAt,
    ) -> Result<Self, ValidationError> {
        let content = content.into().trim().to_string();
        let image = image.into();
        if content.is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        if image.trim().is_empty() {
            return Err(ValidationError::MissingImage);
        }
        Ok(Self {
            image,
            kind,
            content,
            created_at,
        })
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn kind(&self) -> CodeKind {
        self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> &CreatedAt {
        &self.created_at
    }

    /// Content shortened for gallery cards.
    #[must_use]
    pub fn content_preview(&self, max_chars: usize) -> String {
        if self.content.chars().count() > max_chars {
            let head: String = self.content.chars().take(max_chars).collect();
            format!("{head}...")
        } else {
            self.content.clone()
        }
    }
}

// Image payloads are large data URLs; keep them out of logs.
impl fmt::Debug for SavedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SavedItem")
            .field("kind", &self.kind)
            .field("content", &self.content)
            .field("image_len", &self.image.len())
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NoticeKind::Success,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NoticeKind::Warning,
        }
    }
}

/// Confirmation the shell must show before the core proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingPrompt {
    Save(PendingSave),
    Clear(KindFilter),
}

/// Application state owned by the core and handed to `update`/`view`.
#[derive(Debug)]
pub struct Model {
    pub config: Config,
    pub load_state: LoadState,
    pub generator: Generator,
    pub gallery: SavedItemStore,
    pub prompt: Option<PendingPrompt>,
    pub preview_index: Option<usize>,
    pub show_saved: bool,
    pub notice: Option<Notice>,
    pub active_error: Option<AppError>,
}

impl Default for Model {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl Model {
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            generator: Generator::new(&config),
            gallery: SavedItemStore::new(config.page_size),
            config,
            load_state: LoadState::Loading,
            prompt: None,
            preview_index: None,
            show_saved: true,
            notice: None,
            active_error: None,
        }
    }

    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    pub fn show_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(kind: CodeKind, content: &str) -> SavedItem {
        SavedItem::new(kind, content, "data:image/png;base64,AAAA", CreatedAt::Epoch(UnixTimeMs(1)))
            .unwrap()
    }

    #[test]
    fn saved_item_rejects_blank_content() {
        let result = SavedItem::new(CodeKind::Qr, "   ", "data:x", CreatedAt::Epoch(UnixTimeMs(1)));
        assert_eq!(result.unwrap_err(), ValidationError::EmptyContent);
    }

    #[test]
    fn saved_item_rejects_missing_image() {
        let result = SavedItem::new(CodeKind::Qr, "hello", "", CreatedAt::Epoch(UnixTimeMs(1)));
        assert_eq!(result.unwrap_err(), ValidationError::MissingImage);
    }

    #[test]
    fn saved_item_uses_legacy_field_names() {
        let json = serde_json::to_value(item(CodeKind::Barcode, "ABC")).unwrap();
        assert_eq!(json["type"], "barcode");
        assert_eq!(json["content"], "ABC");
        assert_eq!(json["timestamp"], 1);
        assert!(json.get("dataURL").is_some());
    }

    #[test]
    fn legacy_string_timestamp_loads() {
        let raw = r#"[{"dataURL":"data:image/png;base64,AA","type":"qr","content":"hi","timestamp":"1/2/2024, 10:00:00 AM"}]"#;
        let items: Vec<SavedItem> = serde_json::from_str(raw).unwrap();
        assert_eq!(items[0].kind(), CodeKind::Qr);
        assert_eq!(items[0].created_at().label(), Some("1/2/2024, 10:00:00 AM"));
        assert_eq!(items[0].created_at().as_millis(), None);
    }

    #[test]
    fn stored_item_with_blank_fields_is_rejected() {
        let empty = r#"{"dataURL":"","type":"qr","content":"","timestamp":1}"#;
        assert!(serde_json::from_str::<SavedItem>(empty).is_err());

        let no_image = r#"{"dataURL":" ","type":"qr","content":"hi","timestamp":1}"#;
        let err = serde_json::from_str::<SavedItem>(no_image).unwrap_err();
        assert!(err.to_string().contains("no rendered image"));
    }

    #[test]
    fn stored_content_is_trimmed_on_load() {
        let raw = r#"{"dataURL":"data:x","type":"barcode","content":"  123 ","timestamp":1}"#;
        let item: SavedItem = serde_json::from_str(raw).unwrap();
        assert_eq!(item.content(), "123");
    }

    #[test]
    fn content_preview_truncates_by_chars() {
        let long = item(CodeKind::Qr, "abcdefghijklmnopqrstuvwxyz");
        assert_eq!(long.content_preview(20), "abcdefghijklmnopqrst...");

        let short = item(CodeKind::Qr, "short");
        assert_eq!(short.content_preview(20), "short");

        let wide = item(CodeKind::Qr, "ééééé");
        assert_eq!(wide.content_preview(3), "ééé...");
    }

    #[test]
    fn filter_matching() {
        assert!(KindFilter::All.matches(CodeKind::Qr));
        assert!(KindFilter::All.matches(CodeKind::Barcode));
        assert!(KindFilter::Qr.matches(CodeKind::Qr));
        assert!(!KindFilter::Qr.matches(CodeKind::Barcode));
        assert_eq!(KindFilter::from(CodeKind::Barcode), KindFilter::Barcode);
    }

    #[test]
    fn debug_hides_image_payload() {
        let rendered = format!("{:?}", item(CodeKind::Qr, "x"));
        assert!(!rendered.contains("base64"));
        assert!(rendered.contains("image_len"));
    }
}

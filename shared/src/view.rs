use serde::{Deserialize, Serialize};

use crate::error::UserFacingError;
use crate::generator::{BarcodeOptions, QrOptions};
use crate::gallery::Conflict;
use crate::model::{CodeKind, KindFilter, Notice};

pub const OUTPUT_PLACEHOLDER: &str = "Enter content to generate code";
pub const OUTPUT_ERROR: &str = "Error generating code";
pub const TOO_WIDE_MESSAGE: &str = "Generated barcode is too wide for the preview area";
pub const USE_QR_LABEL: &str = "Use QR Code Instead";
pub const SAVED_NOTICE: &str = "Code pinned! 📌";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputView {
    Placeholder { message: String },
    Code { kind: CodeKind, image: String, width: u32 },
    TooWide { message: String, action_label: String },
    Error { message: String, detail: String },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadView {
    pub image: String,
    pub png_file_name: String,
    pub svg_file_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeneratorView {
    pub active_tab: CodeKind,
    pub text: String,
    pub enforce_uppercase: bool,
    pub show_clear_button: bool,
    pub is_rendering: bool,
    pub qr: QrOptions,
    pub barcode: BarcodeOptions,
    pub output: OutputView,
    pub download: Option<DownloadView>,
    pub can_save: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GalleryCardView {
    /// Position in the full collection; send this back in delete/preview events.
    pub index: usize,
    pub kind: CodeKind,
    pub content_preview: String,
    pub image: String,
    pub created_at_ms: Option<u64>,
    pub created_at_label: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationView {
    pub current: usize,
    pub total_pages: usize,
    pub pages: Vec<usize>,
    pub prev_enabled: bool,
    pub next_enabled: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GalleryView {
    pub items_visible: bool,
    pub filter: KindFilter,
    pub cards: Vec<GalleryCardView>,
    /// `total`, or `filtered/total` while a filter hides some items.
    pub badge: String,
    pub show_clear_button: bool,
    /// `None` when everything fits on one page.
    pub pagination: Option<PaginationView>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Duplicate,
    SimilarEntry,
    Clear,
}

impl From<Conflict> for PromptKind {
    fn from(c: Conflict) -> Self {
        match c {
            Conflict::Exact => Self::Duplicate,
            Conflict::CrossKind => Self::SimilarEntry,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptView {
    pub kind: PromptKind,
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    pub cancel_label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreviewView {
    pub index: usize,
    pub title: String,
    pub kind: CodeKind,
    pub image: String,
    pub content: String,
    pub created_at_ms: Option<u64>,
    pub created_at_label: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub loading: bool,
    pub generator: GeneratorView,
    /// Hidden while loading and when nothing is saved.
    pub gallery: Option<GalleryView>,
    pub prompt: Option<PromptView>,
    pub preview: Option<PreviewView>,
    pub notice: Option<Notice>,
    pub error: Option<UserFacingError>,
}

use serde::{Deserialize, Serialize};

use crate::generator::{BarcodeOptions, QrOptions};

pub const DEFAULT_PAGE_SIZE: usize = 8;
pub const SAVED_CODES_KEY: &str = "savedCodes";
pub const CONTENT_PREVIEW_CHARS: usize = 20;
pub const DEFAULT_PREVIEW_WIDTH_PX: u32 = 300;

/// Tunables for the core. Shells normally take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub page_size: usize,
    pub storage_key: String,
    pub content_preview_chars: usize,
    pub default_preview_width_px: u32,
    pub qr: QrOptions,
    pub barcode: BarcodeOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            storage_key: SAVED_CODES_KEY.to_string(),
            content_preview_chars: CONTENT_PREVIEW_CHARS,
            default_preview_width_px: DEFAULT_PREVIEW_WIDTH_PX,
            qr: QrOptions::default(),
            barcode: BarcodeOptions::default(),
        }
    }
}

impl Config {
    /// Page size of zero would make every page empty; treat it as one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

//! Input text, per-kind render options and the last render result.
//!
//! The generator never draws anything itself. It decides *what* the shell's
//! renderer should draw, tags each request with a sequence number and keeps
//! only the answer to the most recent one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::capabilities::{RenderError, RenderResult};
use crate::config::Config;
use crate::error::ValidationError;
use crate::model::{CodeKind, CreatedAt, SavedItem};

pub const QR_SIZE_RANGE: (u32, u32) = (100, 1000);
pub const BAR_WIDTH_RANGE: (f64, f64) = (1.0, 4.0);
pub const BAR_HEIGHT_RANGE: (u32, u32) = (10, 300);

/// `#rgb` or `#rrggbb`, stored lower-case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    pub fn parse(field: &'static str, value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        let valid = trimmed
            .strip_prefix('#')
            .is_some_and(|hex| {
                matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
            });
        if !valid {
            return Err(ValidationError::InvalidColor {
                field,
                value: value.to_string(),
            });
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HexColor {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse("colour", &value)
    }
}

impl From<HexColor> for String {
    fn from(c: HexColor) -> Self {
        c.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn black() -> HexColor {
    HexColor("#000000".into())
}

fn white() -> HexColor {
    HexColor("#ffffff".into())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrOptions {
    pub size: u32,
    pub foreground: HexColor,
    pub background: HexColor,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            size: 200,
            foreground: black(),
            background: white(),
        }
    }
}

/// Symbologies understood by the shell's barcode renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarcodeFormat {
    #[default]
    #[serde(rename = "CODE128")]
    Code128,
    #[serde(rename = "CODE39")]
    Code39,
    #[serde(rename = "EAN13")]
    Ean13,
    #[serde(rename = "EAN8")]
    Ean8,
    #[serde(rename = "UPC")]
    Upc,
    #[serde(rename = "ITF14")]
    Itf14,
    #[serde(rename = "MSI")]
    Msi,
    #[serde(rename = "pharmacode")]
    Pharmacode,
    #[serde(rename = "codabar")]
    Codabar,
}

impl BarcodeFormat {
    pub const ALL: [Self; 9] = [
        Self::Code128,
        Self::Code39,
        Self::Ean13,
        Self::Ean8,
        Self::Upc,
        Self::Itf14,
        Self::Msi,
        Self::Pharmacode,
        Self::Codabar,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Code128 => "CODE128",
            Self::Code39 => "CODE39",
            Self::Ean13 => "EAN13",
            Self::Ean8 => "EAN8",
            Self::Upc => "UPC",
            Self::Itf14 => "ITF14",
            Self::Msi => "MSI",
            Self::Pharmacode => "pharmacode",
            Self::Codabar => "codabar",
        }
    }
}

impl FromStr for BarcodeFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownBarcodeFormat(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarcodeOptions {
    pub format: BarcodeFormat,
    pub bar_width: f64,
    pub height: u32,
    pub line_color: HexColor,
    pub background: HexColor,
    pub display_value: bool,
}

impl Default for BarcodeOptions {
    fn default() -> Self {
        Self {
            format: BarcodeFormat::default(),
            bar_width: 2.0,
            height: 100,
            line_color: black(),
            background: white(),
            display_value: true,
        }
    }
}

/// What the shell's renderer needs besides the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RenderOptions {
    Qr(QrOptions),
    Barcode(BarcodeOptions),
}

impl RenderOptions {
    #[must_use]
    pub fn kind(&self) -> CodeKind {
        match self {
            Self::Qr(_) => CodeKind::Qr,
            Self::Barcode(_) => CodeKind::Barcode,
        }
    }
}

/// A single settings control changed in the shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptionChange {
    QrSize(u32),
    QrForeground(String),
    QrBackground(String),
    BarcodeFormat(String),
    BarcodeWidth(f64),
    BarcodeHeight(u32),
    BarcodeLineColor(String),
    BarcodeBackground(String),
}

impl OptionChange {
    #[must_use]
    pub fn kind(&self) -> CodeKind {
        match self {
            Self::QrSize(_) | Self::QrForeground(_) | Self::QrBackground(_) => CodeKind::Qr,
            Self::BarcodeFormat(_)
            | Self::BarcodeWidth(_)
            | Self::BarcodeHeight(_)
            | Self::BarcodeLineColor(_)
            | Self::BarcodeBackground(_) => CodeKind::Barcode,
        }
    }
}

fn check_range<T>(field: &'static str, value: T, (min, max): (T, T)) -> Result<T, ValidationError>
where
    T: PartialOrd + Copy + Into<f64>,
{
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value: value.into(),
            min: min.into(),
            max: max.into(),
        });
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFormat {
    Png,
    Svg,
}

impl DownloadFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }
}

#[must_use]
pub fn download_file_name(kind: CodeKind, format: DownloadFormat) -> String {
    format!("{kind}_code.{}", format.extension())
}

#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    pub kind: CodeKind,
    pub content: String,
    pub image: String,
    pub width: u32,
}

impl fmt::Debug for GeneratedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedCode")
            .field("kind", &self.kind)
            .field("content", &self.content)
            .field("image_len", &self.image.len())
            .field("width", &self.width)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Output {
    #[default]
    Empty,
    Ready(GeneratedCode),
    /// Barcode would not fit the preview; the text is kept for `switch_to_qr`.
    TooWide { text: String },
    Failed(RenderError),
}

/// A render the shell must perform. `seq` comes back with the result.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub seq: u64,
    pub text: String,
    pub options: RenderOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InFlight {
    seq: u64,
    kind: CodeKind,
    content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderCompletion {
    Shown,
    TooWide,
    Failed,
    Stale,
}

#[derive(Debug, Clone)]
pub struct Generator {
    active: CodeKind,
    text: String,
    enforce_uppercase: bool,
    pub qr: QrOptions,
    pub barcode: BarcodeOptions,
    preview_width_px: u32,
    output: Output,
    next_seq: u64,
    in_flight: Option<InFlight>,
}

impl Generator {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            active: CodeKind::Qr,
            text: String::new(),
            enforce_uppercase: false,
            qr: config.qr.clone(),
            barcode: config.barcode.clone(),
            preview_width_px: config.default_preview_width_px,
            output: Output::Empty,
            next_seq: 0,
            in_flight: None,
        }
    }

    pub fn active(&self) -> CodeKind {
        self.active
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn enforce_uppercase(&self) -> bool {
        self.enforce_uppercase
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn is_rendering(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn generated(&self) -> Option<&GeneratedCode> {
        match &self.output {
            Output::Ready(code) => Some(code),
            _ => None,
        }
    }

    fn apply_casing(&self, value: &str) -> String {
        if self.enforce_uppercase {
            value.to_uppercase()
        } else {
            value.to_string()
        }
    }

    /// Trimmed input with casing applied. This is what gets rendered and saved.
    #[must_use]
    pub fn normalized_text(&self) -> String {
        self.apply_casing(self.text.trim())
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn clear_input(&mut self) {
        self.text.clear();
        self.reset_output();
    }

    pub fn switch_tab(&mut self, kind: CodeKind) {
        self.active = kind;
    }

    /// Moves the text that was too wide for a barcode over to the QR tab.
    pub fn switch_to_qr(&mut self) {
        let text = match std::mem::take(&mut self.output) {
            Output::TooWide { text } => text,
            other => {
                self.output = other;
                self.normalized_text()
            }
        };
        self.text = text;
        self.active = CodeKind::Qr;
    }

    pub fn toggle_uppercase(&mut self) -> bool {
        self.enforce_uppercase = !self.enforce_uppercase;
        self.enforce_uppercase
    }

    pub fn set_preview_width(&mut self, width_px: u32) {
        self.preview_width_px = width_px.max(1);
    }

    /// Applies a settings change. Invalid values leave the options untouched.
    pub fn apply_option(&mut self, change: OptionChange) -> Result<CodeKind, ValidationError> {
        let kind = change.kind();
        match change {
            OptionChange::QrSize(size) => {
                self.qr.size = check_range("qr size", size, QR_SIZE_RANGE)?;
            }
            OptionChange::QrForeground(c) => {
                self.qr.foreground = HexColor::parse("qr colour", &c)?;
            }
            OptionChange::QrBackground(c) => {
                self.qr.background = HexColor::parse("qr background", &c)?;
            }
            OptionChange::BarcodeFormat(f) => {
                self.barcode.format = f.parse()?;
            }
            OptionChange::BarcodeWidth(w) => {
                if !w.is_finite() {
                    return Err(ValidationError::OutOfRange {
                        field: "bar width",
                        value: w,
                        min: BAR_WIDTH_RANGE.0,
                        max: BAR_WIDTH_RANGE.1,
                    });
                }
                self.barcode.bar_width = check_range("bar width", w, BAR_WIDTH_RANGE)?;
            }
            OptionChange::BarcodeHeight(h) => {
                self.barcode.height = check_range("bar height", h, BAR_HEIGHT_RANGE)?;
            }
            OptionChange::BarcodeLineColor(c) => {
                self.barcode.line_color = HexColor::parse("barcode colour", &c)?;
            }
            OptionChange::BarcodeBackground(c) => {
                self.barcode.background = HexColor::parse("barcode background", &c)?;
            }
        }
        Ok(kind)
    }

    fn reset_output(&mut self) {
        self.output = Output::Empty;
        self.in_flight = None;
    }

    /// Prepares a render of the active kind.
    ///
    /// Returns `None` and clears the output when there is nothing to render.
    /// Any request still in flight is superseded.
    pub fn begin_render(&mut self) -> Option<RenderRequest> {
        let text = self.normalized_text();
        if text.is_empty() {
            self.reset_output();
            return None;
        }

        self.next_seq += 1;
        let seq = self.next_seq;
        let options = match self.active {
            CodeKind::Qr => RenderOptions::Qr(self.qr.clone()),
            CodeKind::Barcode => RenderOptions::Barcode(self.barcode.clone()),
        };
        self.in_flight = Some(InFlight {
            seq,
            kind: self.active,
            content: text.clone(),
        });
        debug!(seq, kind = %self.active, "render requested");
        Some(RenderRequest { seq, text, options })
    }

    pub fn complete_render(&mut self, seq: u64, result: RenderResult) -> RenderCompletion {
        let in_flight = match self.in_flight.take() {
            Some(f) if f.seq == seq => f,
            other => {
                self.in_flight = other;
                debug!(seq, "ignoring stale render result");
                return RenderCompletion::Stale;
            }
        };

        match result {
            Ok(rendered) => {
                if in_flight.kind == CodeKind::Barcode && rendered.width >= self.preview_width_px {
                    debug!(
                        width = rendered.width,
                        preview = self.preview_width_px,
                        "barcode wider than preview"
                    );
                    self.output = Output::TooWide {
                        text: in_flight.content,
                    };
                    return RenderCompletion::TooWide;
                }
                self.output = Output::Ready(GeneratedCode {
                    kind: in_flight.kind,
                    content: in_flight.content,
                    image: rendered.image,
                    width: rendered.width,
                });
                RenderCompletion::Shown
            }
            Err(e) => {
                warn!(error = %e, kind = %in_flight.kind, "render failed");
                self.output = Output::Failed(e);
                RenderCompletion::Failed
            }
        }
    }

    /// The item a save would store, or `None` when nothing is generated.
    pub fn save_candidate(
        &self,
        created_at: CreatedAt,
    ) -> Option<Result<SavedItem, ValidationError>> {
        let code = self.generated()?;
        Some(SavedItem::new(
            code.kind,
            code.content.clone(),
            code.image.clone(),
            created_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::RenderedCode;
    use crate::model::UnixTimeMs;

    fn generator() -> Generator {
        Generator::new(&Config::default())
    }

    fn rendered(width: u32) -> RenderResult {
        Ok(RenderedCode {
            image: "data:image/png;base64,AAAA".into(),
            width,
        })
    }

    #[test]
    fn empty_text_clears_output_without_request() {
        let mut g = generator();
        g.set_text("   ");
        assert!(g.begin_render().is_none());
        assert_eq!(g.output(), &Output::Empty);
    }

    #[test]
    fn casing_is_applied_to_trimmed_text() {
        let mut g = generator();
        g.set_text("  hello world ");
        assert_eq!(g.normalized_text(), "hello world");
        g.toggle_uppercase();
        assert_eq!(g.normalized_text(), "HELLO WORLD");
        let req = g.begin_render().unwrap();
        assert_eq!(req.text, "HELLO WORLD");
    }

    #[test]
    fn only_latest_render_is_kept() {
        let mut g = generator();
        g.set_text("a");
        let first = g.begin_render().unwrap();
        g.set_text("ab");
        let second = g.begin_render().unwrap();

        assert_eq!(g.complete_render(first.seq, rendered(50)), RenderCompletion::Stale);
        assert_eq!(g.output(), &Output::Empty);

        assert_eq!(g.complete_render(second.seq, rendered(50)), RenderCompletion::Shown);
        assert_eq!(g.generated().unwrap().content, "ab");
    }

    #[test]
    fn clearing_input_drops_in_flight_render() {
        let mut g = generator();
        g.set_text("abc");
        let req = g.begin_render().unwrap();
        g.clear_input();
        assert_eq!(g.complete_render(req.seq, rendered(10)), RenderCompletion::Stale);
        assert!(g.generated().is_none());
    }

    #[test]
    fn wide_barcode_offers_qr_fallback() {
        let mut g = generator();
        g.switch_tab(CodeKind::Barcode);
        g.set_text("a very long barcode payload");
        let req = g.begin_render().unwrap();
        assert_eq!(req.options.kind(), CodeKind::Barcode);

        assert_eq!(g.complete_render(req.seq, rendered(300)), RenderCompletion::TooWide);
        assert!(matches!(g.output(), Output::TooWide { .. }));

        g.switch_to_qr();
        assert_eq!(g.active(), CodeKind::Qr);
        assert_eq!(g.text(), "a very long barcode payload");
        let req = g.begin_render().unwrap();
        assert_eq!(req.options.kind(), CodeKind::Qr);
    }

    #[test]
    fn wide_qr_is_still_shown() {
        let mut g = generator();
        g.set_text("x");
        let req = g.begin_render().unwrap();
        assert_eq!(g.complete_render(req.seq, rendered(900)), RenderCompletion::Shown);
    }

    #[test]
    fn render_failure_is_recorded() {
        let mut g = generator();
        g.switch_tab(CodeKind::Barcode);
        g.set_text("abc");
        let req = g.begin_render().unwrap();
        let err = RenderError::InvalidInput {
            format: "EAN13".into(),
            reason: "must be 12 or 13 digits".into(),
        };
        assert_eq!(g.complete_render(req.seq, Err(err.clone())), RenderCompletion::Failed);
        assert_eq!(g.output(), &Output::Failed(err));
        assert!(g.save_candidate(CreatedAt::Epoch(UnixTimeMs(42))).is_none());
    }

    #[test]
    fn save_candidate_uses_rendered_content() {
        let mut g = generator();
        g.set_text("hello");
        let req = g.begin_render().unwrap();
        g.complete_render(req.seq, rendered(100));
        // Text edits after rendering do not change what gets saved.
        g.set_text("hello again");

        let item = g.save_candidate(CreatedAt::Epoch(UnixTimeMs(42))).unwrap().unwrap();
        assert_eq!(item.content(), "hello");
        assert_eq!(item.kind(), CodeKind::Qr);
    }

    #[test]
    fn invalid_options_are_rejected_and_kept() {
        let mut g = generator();
        assert!(g.apply_option(OptionChange::QrSize(5)).is_err());
        assert_eq!(g.qr.size, 200);

        assert!(g.apply_option(OptionChange::BarcodeWidth(f64::NAN)).is_err());
        assert!(g.apply_option(OptionChange::BarcodeWidth(9.0)).is_err());
        assert_eq!(g.barcode.bar_width, 2.0);

        assert!(g.apply_option(OptionChange::QrForeground("red".into())).is_err());
        assert_eq!(g.qr.foreground.as_str(), "#000000");

        assert_eq!(
            g.apply_option(OptionChange::BarcodeFormat("upc-x".into())),
            Err(ValidationError::UnknownBarcodeFormat("upc-x".into()))
        );
    }

    #[test]
    fn valid_options_apply() {
        let mut g = generator();
        assert_eq!(g.apply_option(OptionChange::QrSize(300)), Ok(CodeKind::Qr));
        assert_eq!(g.qr.size, 300);

        g.apply_option(OptionChange::BarcodeFormat("ean13".into())).unwrap();
        assert_eq!(g.barcode.format, BarcodeFormat::Ean13);

        g.apply_option(OptionChange::BarcodeLineColor("#FF0000".into())).unwrap();
        assert_eq!(g.barcode.line_color.as_str(), "#ff0000");
    }

    #[test]
    fn render_options_serialize_with_kind_tag() {
        let json = serde_json::to_value(RenderOptions::Barcode(BarcodeOptions::default())).unwrap();
        assert_eq!(json["kind"], "barcode");
        assert_eq!(json["format"], "CODE128");
    }

    #[test]
    fn hex_color_deserialization_validates() {
        assert!(serde_json::from_str::<HexColor>("\"#abc\"").is_ok());
        assert!(serde_json::from_str::<HexColor>("\"blue\"").is_err());
    }

    #[test]
    fn download_names() {
        assert_eq!(download_file_name(CodeKind::Qr, DownloadFormat::Png), "qr_code.png");
        assert_eq!(
            download_file_name(CodeKind::Barcode, DownloadFormat::Svg),
            "barcode_code.svg"
        );
    }
}

mod code_renderer;
mod kv;

pub use self::code_renderer::{
    CodeRenderer, CodeRendererOperation, RenderError, RenderResult, RenderedCode,
};
pub use self::kv::{
    KeyValue, KeyValueError, KvValueResult, StorageError, StorageKey, MAX_KEY_LENGTH,
};

/// Render capability re-export.
///
/// Crux's built-in Render is all the shell needs to know the view changed.
pub use crux_core::render::Render;

use crate::event::Event;
use crate::App;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub kv: KeyValue<Event>,
    pub code_renderer: CodeRenderer<Event>,
}

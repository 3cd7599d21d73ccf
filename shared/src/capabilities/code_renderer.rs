use crux_core::capability::{CapabilityContext, Operation};
use crux_core::macros::Capability;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generator::RenderOptions;
use crate::model::CodeKind;

/// Rasterises QR codes and barcodes. The shell backs this with its
/// rendering libraries; the core only describes what to draw.
#[derive(Capability)]
pub struct CodeRenderer<Ev> {
    context: CapabilityContext<CodeRendererOperation, Ev>,
}

impl<Ev> CodeRenderer<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<CodeRendererOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn render<F>(&self, text: impl Into<String>, options: RenderOptions, make_event: F)
    where
        F: FnOnce(RenderResult) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        let operation = CodeRendererOperation::Render {
            text: text.into(),
            options,
        };
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(make_event(result));
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CodeRendererOperation {
    Render { text: String, options: RenderOptions },
}

impl CodeRendererOperation {
    pub fn kind(&self) -> CodeKind {
        match self {
            Self::Render { options, .. } => options.kind(),
        }
    }
}

impl Operation for CodeRendererOperation {
    type Output = RenderResult;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderedCode {
    /// Encoded bitmap, typically a `data:image/png;base64,...` URL.
    pub image: String,
    /// Rendered width in CSS pixels.
    pub width: u32,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum RenderError {
    #[error("text cannot be encoded as {format}: {reason}")]
    InvalidInput { format: String, reason: String },

    #[error("renderer unavailable: {0}")]
    Unavailable(String),
}

pub type RenderResult = Result<RenderedCode, RenderError>;

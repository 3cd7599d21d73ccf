use serde::{Deserialize, Serialize};

use crate::capabilities::{KvValueResult, RenderResult};
use crate::generator::OptionChange;
use crate::model::{CodeKind, KindFilter};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub enum Event {
    #[default]
    Noop,

    AppStarted,

    // Generator
    InputChanged {
        text: String,
    },
    ClearInput,
    TabSelected {
        kind: CodeKind,
    },
    SwitchToQr,
    ToggleUppercase,
    OptionChanged(OptionChange),
    PreviewResized {
        width_px: u32,
    },

    // Saving
    /// `now_ms` is the shell's wall clock; it becomes the item's timestamp.
    SaveRequested {
        now_ms: u64,
    },
    ReplaceChosen,
    KeepBothChosen,
    PromptDismissed,

    // Gallery
    FilterSelected {
        filter: KindFilter,
    },
    PageSelected {
        page: usize,
    },
    NextPage,
    PreviousPage,
    DeleteRequested {
        index: usize,
    },
    ClearRequested,
    ClearConfirmed,
    PreviewOpened {
        index: usize,
    },
    PreviewClosed,
    DeleteFromPreview,
    ToggleShowSaved,

    DismissNotice,
    DismissError,

    // Capability responses (boxed to keep enum size small)
    #[serde(skip)]
    SavedItemsLoaded(Box<KvValueResult>),
    #[serde(skip)]
    PersistenceCompleted(Box<KvValueResult>),
    #[serde(skip)]
    CodeRendered {
        seq: u64,
        result: Box<RenderResult>,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::AppStarted => "app_started",
            Self::InputChanged { .. } => "input_changed",
            Self::ClearInput => "clear_input",
            Self::TabSelected { .. } => "tab_selected",
            Self::SwitchToQr => "switch_to_qr",
            Self::ToggleUppercase => "toggle_uppercase",
            Self::OptionChanged(_) => "option_changed",
            Self::PreviewResized { .. } => "preview_resized",
            Self::SaveRequested { .. } => "save_requested",
            Self::ReplaceChosen => "replace_chosen",
            Self::KeepBothChosen => "keep_both_chosen",
            Self::PromptDismissed => "prompt_dismissed",
            Self::FilterSelected { .. } => "filter_selected",
            Self::PageSelected { .. } => "page_selected",
            Self::NextPage => "next_page",
            Self::PreviousPage => "previous_page",
            Self::DeleteRequested { .. } => "delete_requested",
            Self::ClearRequested => "clear_requested",
            Self::ClearConfirmed => "clear_confirmed",
            Self::PreviewOpened { .. } => "preview_opened",
            Self::PreviewClosed => "preview_closed",
            Self::DeleteFromPreview => "delete_from_preview",
            Self::ToggleShowSaved => "toggle_show_saved",
            Self::DismissNotice => "dismiss_notice",
            Self::DismissError => "dismiss_error",
            Self::SavedItemsLoaded(_) => "saved_items_loaded",
            Self::PersistenceCompleted(_) => "persistence_completed",
            Self::CodeRendered { .. } => "code_rendered",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        !matches!(
            self,
            Self::Noop
                | Self::AppStarted
                | Self::PreviewResized { .. }
                | Self::SavedItemsLoaded(_)
                | Self::PersistenceCompleted(_)
                | Self::CodeRendered { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_size_is_reasonable() {
        let size = std::mem::size_of::<Event>();
        assert!(
            size <= 64,
            "Event enum is {size} bytes, box more variants"
        );
    }

    #[test]
    fn capability_responses_are_not_user_initiated() {
        assert!(!Event::CodeRendered {
            seq: 1,
            result: Box::new(Err(crate::capabilities::RenderError::Unavailable("x".into()))),
        }
        .is_user_initiated());
        assert!(Event::SaveRequested { now_ms: 0 }.is_user_initiated());
        assert_eq!(Event::ClearConfirmed.name(), "clear_confirmed");
    }
}

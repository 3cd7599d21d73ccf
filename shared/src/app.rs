use tracing::{debug, info, warn};

use crate::capabilities::{Capabilities, StorageError, StorageKey};
use crate::error::{IndexError, PersistenceError};
use crate::event::Event;
use crate::gallery::{list_page, SaveOutcome};
use crate::generator::{download_file_name, DownloadFormat, Output, RenderCompletion};
use crate::model::{
    CreatedAt, LoadState, Model, Notice, PendingPrompt, SavedItem, UnixTimeMs,
};
use crate::view::{
    DownloadView, GalleryCardView, GalleryView, GeneratorView, OutputView, PaginationView,
    PreviewView, PromptKind, PromptView, ViewModel, OUTPUT_ERROR, OUTPUT_PLACEHOLDER,
    SAVED_NOTICE, TOO_WIDE_MESSAGE, USE_QR_LABEL,
};

#[derive(Default)]
pub struct App;

impl App {
    fn storage_key(model: &Model) -> Result<StorageKey, StorageError> {
        StorageKey::new(model.config.storage_key.as_str())
    }

    /// Writes the whole collection back. The UI does not wait for the result.
    fn persist_items(model: &mut Model, caps: &Capabilities) {
        let key = match Self::storage_key(model) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "refusing to persist under an invalid key");
                model.set_error(PersistenceError::WriteFailed(e).into());
                return;
            }
        };

        let bytes = match serde_json::to_vec(model.gallery.items()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "failed to serialize saved items");
                model.set_error(PersistenceError::SerializationFailed(e.to_string()).into());
                return;
            }
        };

        debug!(bytes = bytes.len(), count = model.gallery.len(), "persisting saved items");
        caps.kv.set(String::from(key), bytes, |result| {
            Event::PersistenceCompleted(Box::new(result))
        });
    }

    /// Decodes the stored array item by item so one bad entry only costs
    /// itself. Returns the readable items and how many were skipped.
    fn decode_items(bytes: &[u8]) -> Result<(Vec<SavedItem>, usize), serde_json::Error> {
        let raw: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;
        let mut skipped = 0;
        let items: Vec<SavedItem> = raw
            .into_iter()
            .enumerate()
            .filter_map(|(position, value)| match serde_json::from_value(value) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(position, error = %e, "skipping unreadable saved item");
                    skipped += 1;
                    None
                }
            })
            .collect();
        Ok((items, skipped))
    }

    fn handle_loaded(model: &mut Model, result: Result<Option<Vec<u8>>, StorageError>) {
        let items = match result {
            Ok(Some(bytes)) => match Self::decode_items(&bytes) {
                Ok((items, 0)) => items,
                Ok((items, skipped)) => {
                    model.show_notice(Notice::warning(format!(
                        "{skipped} saved code(s) could not be read and were skipped"
                    )));
                    items
                }
                Err(e) => {
                    warn!(error = %e, "stored saved items are unreadable, starting empty");
                    model.set_error(PersistenceError::DeserializationFailed(e.to_string()).into());
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to load saved items, starting empty");
                model.set_error(PersistenceError::ReadFailed(e).into());
                Vec::new()
            }
        };

        info!(count = items.len(), "saved items loaded");
        model.gallery.replace_items(items);
        model.load_state = LoadState::Ready;
    }

    fn request_render(model: &mut Model, caps: &Capabilities) {
        if let Some(request) = model.generator.begin_render() {
            let seq = request.seq;
            caps.code_renderer
                .render(request.text, request.options, move |result| {
                    Event::CodeRendered {
                        seq,
                        result: Box::new(result),
                    }
                });
        }
    }

    fn save_generated(model: &mut Model, caps: &Capabilities, now_ms: u64) {
        if model.load_state == LoadState::Loading {
            debug!("save ignored until saved items are loaded");
            return;
        }
        if model.prompt.is_some() {
            debug!("save ignored while a prompt is open");
            return;
        }

        let created_at = CreatedAt::Epoch(UnixTimeMs(now_ms));
        let candidate = match model.generator.save_candidate(created_at) {
            None => {
                debug!("nothing generated to save");
                return;
            }
            Some(Err(e)) => {
                model.set_error(e.into());
                return;
            }
            Some(Ok(item)) => item,
        };

        match model.gallery.save(candidate) {
            SaveOutcome::Saved { .. } => Self::after_save(model, caps),
            SaveOutcome::NeedsDecision(pending) => {
                model.prompt = Some(PendingPrompt::Save(pending));
            }
        }
    }

    fn after_save(model: &mut Model, caps: &Capabilities) {
        model.show_notice(Notice::success(SAVED_NOTICE));
        Self::persist_items(model, caps);
    }

    fn delete_item(model: &mut Model, caps: &Capabilities, index: usize) {
        match model.gallery.delete(index) {
            Ok(_) => {
                model.preview_index = match model.preview_index {
                    Some(p) if p == index => None,
                    Some(p) if p > index => Some(p - 1),
                    other => other,
                };
                Self::persist_items(model, caps);
            }
            Err(e) => {
                warn!(error = %e, "delete rejected");
                model.set_error(e.into());
            }
        }
    }

    fn build_generator_view(model: &Model) -> GeneratorView {
        let generator = &model.generator;
        let output = match generator.output() {
            Output::Empty => OutputView::Placeholder {
                message: OUTPUT_PLACEHOLDER.into(),
            },
            Output::Ready(code) => OutputView::Code {
                kind: code.kind,
                image: code.image.clone(),
                width: code.width,
            },
            Output::TooWide { .. } => OutputView::TooWide {
                message: TOO_WIDE_MESSAGE.into(),
                action_label: USE_QR_LABEL.into(),
            },
            Output::Failed(e) => OutputView::Error {
                message: OUTPUT_ERROR.into(),
                detail: e.to_string(),
            },
        };

        let download = generator.generated().map(|code| DownloadView {
            image: code.image.clone(),
            png_file_name: download_file_name(code.kind, DownloadFormat::Png),
            svg_file_name: download_file_name(code.kind, DownloadFormat::Svg),
        });

        GeneratorView {
            active_tab: generator.active(),
            text: generator.text().to_string(),
            enforce_uppercase: generator.enforce_uppercase(),
            show_clear_button: !generator.text().trim().is_empty(),
            is_rendering: generator.is_rendering(),
            qr: generator.qr.clone(),
            barcode: generator.barcode.clone(),
            output,
            can_save: download.is_some() && model.load_state == LoadState::Ready,
            download,
        }
    }

    fn build_gallery_view(model: &Model) -> Option<GalleryView> {
        let store = &model.gallery;
        if model.load_state == LoadState::Loading || store.is_empty() {
            return None;
        }

        let page = list_page(store.items(), store.filter(), store.page(), store.page_size());
        let preview_chars = model.config.content_preview_chars;
        let cards = page
            .entries
            .iter()
            .map(|(index, item)| GalleryCardView {
                index: *index,
                kind: item.kind(),
                content_preview: item.content_preview(preview_chars),
                image: item.image().to_string(),
                created_at_ms: item.created_at().as_millis(),
                created_at_label: item.created_at().label().map(str::to_string),
            })
            .collect();

        let badge = if page.filtered_count == page.total_count {
            page.total_count.to_string()
        } else {
            format!("{}/{}", page.filtered_count, page.total_count)
        };

        let pagination = (model.show_saved && page.total_pages > 1).then(|| PaginationView {
            current: page.page,
            total_pages: page.total_pages,
            pages: (1..=page.total_pages).collect(),
            prev_enabled: page.page > 1,
            next_enabled: page.page < page.total_pages,
        });

        Some(GalleryView {
            items_visible: model.show_saved,
            filter: store.filter(),
            cards,
            badge,
            show_clear_button: model.show_saved && page.filtered_count > 0,
            pagination,
        })
    }

    fn build_prompt_view(prompt: &PendingPrompt) -> PromptView {
        match prompt {
            PendingPrompt::Save(pending) => {
                let kind = PromptKind::from(pending.conflict);
                let (title, message) = match kind {
                    PromptKind::SimilarEntry => (
                        "Similar Entry Found".to_string(),
                        format!(
                            "This content exists as {} code. Replace with {}?",
                            pending.existing_kind.as_str().to_uppercase(),
                            pending.candidate.kind().as_str().to_uppercase()
                        ),
                    ),
                    _ => (
                        "Duplicate Entry".to_string(),
                        "This code already exists in your saved items.".to_string(),
                    ),
                };
                PromptView {
                    kind,
                    title,
                    message,
                    confirm_label: "Replace".into(),
                    cancel_label: "Keep Both".into(),
                }
            }
            PendingPrompt::Clear(filter) => {
                let message = match filter.kind() {
                    None => "Are you sure you want to clear all saved codes?".to_string(),
                    Some(kind) => format!(
                        "Are you sure you want to clear all {} codes?",
                        kind.as_str().to_uppercase()
                    ),
                };
                PromptView {
                    kind: PromptKind::Clear,
                    title: "Clear Codes".into(),
                    message,
                    confirm_label: "Clear".into(),
                    cancel_label: "Cancel".into(),
                }
            }
        }
    }

    fn build_preview_view(model: &Model) -> Option<PreviewView> {
        let index = model.preview_index?;
        let item = model.gallery.get(index)?;
        Some(PreviewView {
            index,
            title: format!("{} Code", item.kind().as_str().to_uppercase()),
            kind: item.kind(),
            image: item.image().to_string(),
            content: item.content().to_string(),
            created_at_ms: item.created_at().as_millis(),
            created_at_label: item.created_at().label().map(str::to_string),
        })
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(
            event = event.name(),
            user_initiated = event.is_user_initiated(),
            "update"
        );

        match event {
            Event::Noop => {}

            Event::AppStarted => {
                match Self::storage_key(model) {
                    Ok(key) => {
                        model.load_state = LoadState::Loading;
                        caps.kv.get(String::from(key), |result| {
                            Event::SavedItemsLoaded(Box::new(result))
                        });
                    }
                    Err(e) => Self::handle_loaded(model, Err(e)),
                }
                caps.render.render();
            }

            Event::SavedItemsLoaded(result) => {
                Self::handle_loaded(model, (*result).map_err(StorageError::from));
                caps.render.render();
            }

            Event::PersistenceCompleted(result) => match *result {
                Ok(_) => debug!("saved items persisted"),
                Err(e) => {
                    // In-memory items stay authoritative; no rollback.
                    warn!(error = %e, "failed to persist saved items");
                    model.set_error(PersistenceError::WriteFailed(e.into()).into());
                    caps.render.render();
                }
            },

            Event::InputChanged { text } => {
                model.generator.set_text(text);
                Self::request_render(model, caps);
                caps.render.render();
            }

            Event::ClearInput => {
                model.generator.clear_input();
                caps.render.render();
            }

            Event::TabSelected { kind } => {
                model.generator.switch_tab(kind);
                Self::request_render(model, caps);
                caps.render.render();
            }

            Event::SwitchToQr => {
                model.generator.switch_to_qr();
                Self::request_render(model, caps);
                caps.render.render();
            }

            Event::ToggleUppercase => {
                model.generator.toggle_uppercase();
                Self::request_render(model, caps);
                caps.render.render();
            }

            Event::OptionChanged(change) => {
                match model.generator.apply_option(change) {
                    Ok(kind) if kind == model.generator.active() => {
                        Self::request_render(model, caps);
                    }
                    Ok(_) => {}
                    Err(e) => model.set_error(e.into()),
                }
                caps.render.render();
            }

            Event::PreviewResized { width_px } => {
                model.generator.set_preview_width(width_px);
            }

            Event::CodeRendered { seq, result } => {
                if model.generator.complete_render(seq, *result) != RenderCompletion::Stale {
                    caps.render.render();
                }
            }

            Event::SaveRequested { now_ms } => {
                Self::save_generated(model, caps, now_ms);
                caps.render.render();
            }

            Event::ReplaceChosen => {
                match model.prompt.take() {
                    Some(PendingPrompt::Save(pending)) => {
                        model.gallery.resolve_replace(pending);
                        Self::after_save(model, caps);
                    }
                    other => {
                        debug!("replace chosen without a pending save");
                        model.prompt = other;
                    }
                }
                caps.render.render();
            }

            Event::KeepBothChosen => {
                match model.prompt.take() {
                    Some(PendingPrompt::Save(pending)) => {
                        model.gallery.resolve_keep_both(pending);
                        Self::after_save(model, caps);
                    }
                    other => {
                        debug!("keep both chosen without a pending save");
                        model.prompt = other;
                    }
                }
                caps.render.render();
            }

            Event::PromptDismissed => {
                model.prompt = None;
                caps.render.render();
            }

            Event::FilterSelected { filter } => {
                model.gallery.set_filter(filter);
                caps.render.render();
            }

            Event::PageSelected { page } => {
                model.gallery.set_page(page);
                caps.render.render();
            }

            Event::NextPage => {
                let page = model.gallery.page() + 1;
                model.gallery.set_page(page);
                caps.render.render();
            }

            Event::PreviousPage => {
                let page = model.gallery.page().saturating_sub(1);
                model.gallery.set_page(page);
                caps.render.render();
            }

            Event::DeleteRequested { index } => {
                Self::delete_item(model, caps, index);
                caps.render.render();
            }

            Event::ClearRequested => {
                let filter = model.gallery.filter();
                if model.gallery.filtered_count(filter) == 0 {
                    debug!(?filter, "nothing to clear");
                    return;
                }
                model.prompt = Some(PendingPrompt::Clear(filter));
                caps.render.render();
            }

            Event::ClearConfirmed => {
                match model.prompt.take() {
                    Some(PendingPrompt::Clear(filter)) => {
                        if model.gallery.clear(filter) > 0 {
                            model.preview_index = None;
                            Self::persist_items(model, caps);
                        }
                    }
                    other => {
                        debug!("clear confirmed without a pending clear");
                        model.prompt = other;
                    }
                }
                caps.render.render();
            }

            Event::PreviewOpened { index } => {
                if index < model.gallery.len() {
                    model.preview_index = Some(index);
                } else {
                    model.set_error(
                        IndexError {
                            index,
                            len: model.gallery.len(),
                        }
                        .into(),
                    );
                }
                caps.render.render();
            }

            Event::PreviewClosed => {
                model.preview_index = None;
                caps.render.render();
            }

            Event::DeleteFromPreview => {
                if let Some(index) = model.preview_index.take() {
                    Self::delete_item(model, caps, index);
                }
                caps.render.render();
            }

            Event::ToggleShowSaved => {
                model.show_saved = !model.show_saved;
                caps.render.render();
            }

            Event::DismissNotice => {
                model.notice = None;
                caps.render.render();
            }

            Event::DismissError => {
                model.clear_error();
                caps.render.render();
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel {
            loading: model.load_state == LoadState::Loading,
            generator: Self::build_generator_view(model),
            gallery: Self::build_gallery_view(model),
            prompt: model.prompt.as_ref().map(Self::build_prompt_view),
            preview: Self::build_preview_view(model),
            notice: model.notice.clone(),
            error: model.active_error.as_ref().map(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::{Conflict, PendingSave};
    use crate::model::{CodeKind, KindFilter, UnixTimeMs};

    fn item(kind: CodeKind, content: &str) -> SavedItem {
        SavedItem::new(kind, content, "data:img", CreatedAt::Epoch(UnixTimeMs(5))).unwrap()
    }

    fn ready_model(items: Vec<SavedItem>) -> Model {
        let mut model = Model::default();
        model.gallery.replace_items(items);
        model.load_state = LoadState::Ready;
        model
    }

    #[test]
    fn similar_entry_prompt_names_both_kinds() {
        let prompt = PendingPrompt::Save(PendingSave {
            conflict: Conflict::CrossKind,
            match_index: 0,
            existing_kind: CodeKind::Qr,
            candidate: item(CodeKind::Barcode, "ABC"),
        });
        let view = App::build_prompt_view(&prompt);
        assert_eq!(view.kind, PromptKind::SimilarEntry);
        assert_eq!(view.title, "Similar Entry Found");
        assert_eq!(
            view.message,
            "This content exists as QR code. Replace with BARCODE?"
        );
        assert_eq!(view.confirm_label, "Replace");
        assert_eq!(view.cancel_label, "Keep Both");
    }

    #[test]
    fn clear_prompt_mentions_filter() {
        let all = App::build_prompt_view(&PendingPrompt::Clear(KindFilter::All));
        assert_eq!(all.message, "Are you sure you want to clear all saved codes?");
        let qr = App::build_prompt_view(&PendingPrompt::Clear(KindFilter::Qr));
        assert_eq!(qr.message, "Are you sure you want to clear all QR codes?");
    }

    #[test]
    fn gallery_hidden_while_loading_or_empty() {
        let mut model = Model::default();
        model.gallery.replace_items(vec![item(CodeKind::Qr, "a")]);
        assert!(App::build_gallery_view(&model).is_none());

        let empty = ready_model(vec![]);
        assert!(App::build_gallery_view(&empty).is_none());
    }

    #[test]
    fn badge_shows_filtered_over_total() {
        let mut model = ready_model(vec![
            item(CodeKind::Qr, "a"),
            item(CodeKind::Barcode, "b"),
            item(CodeKind::Qr, "c"),
        ]);
        assert_eq!(App::build_gallery_view(&model).unwrap().badge, "3");

        model.gallery.set_filter(KindFilter::Barcode);
        let view = App::build_gallery_view(&model).unwrap();
        assert_eq!(view.badge, "1/3");
        assert_eq!(view.cards.len(), 1);
        assert_eq!(view.cards[0].index, 1);
    }

    #[test]
    fn pagination_only_with_multiple_pages() {
        let items: Vec<SavedItem> = (0..10)
            .map(|i| item(CodeKind::Qr, &format!("c{i}")))
            .collect();
        let mut model = ready_model(items);
        let pagination = App::build_gallery_view(&model).unwrap().pagination.unwrap();
        assert_eq!(pagination.pages, vec![1, 2]);
        assert!(!pagination.prev_enabled);
        assert!(pagination.next_enabled);

        model.gallery.clear(KindFilter::All);
        model.gallery.replace_items(vec![item(CodeKind::Qr, "only")]);
        assert!(App::build_gallery_view(&model).unwrap().pagination.is_none());
    }

    #[test]
    fn hiding_saved_items_hides_clear_button_and_pagination() {
        let items: Vec<SavedItem> = (0..9)
            .map(|i| item(CodeKind::Qr, &format!("c{i}")))
            .collect();
        let mut model = ready_model(items);
        let view = App::build_gallery_view(&model).unwrap();
        assert!(view.show_clear_button);
        assert!(view.pagination.is_some());

        model.show_saved = false;
        let view = App::build_gallery_view(&model).unwrap();
        assert!(!view.items_visible);
        assert!(!view.show_clear_button);
        assert!(view.pagination.is_none());
    }

    #[test]
    fn unreadable_entries_are_skipped_one_by_one() {
        let raw = br#"[
            {"dataURL":"d","type":"qr","content":"A","timestamp":1},
            {"dataURL":"d","type":"QR","content":"B","timestamp":2},
            {"dataURL":"","type":"qr","content":"","timestamp":3},
            {"dataURL":"d","type":"barcode","content":"C","timestamp":"yesterday"}
        ]"#;
        let (items, skipped) = App::decode_items(raw).unwrap();
        assert_eq!(skipped, 2);
        let contents: Vec<&str> = items.iter().map(SavedItem::content).collect();
        assert_eq!(contents, vec!["A", "C"]);

        assert!(App::decode_items(br#"{"not":"an array"}"#).is_err());
    }

    #[test]
    fn skipped_entries_raise_a_warning_notice() {
        let mut model = Model::default();
        let raw = br#"[{"dataURL":"d","type":"qr","content":"A","timestamp":1},{"type":"qr"}]"#;
        App::handle_loaded(&mut model, Ok(Some(raw.to_vec())));
        assert_eq!(model.gallery.len(), 1);
        assert!(model.active_error.is_none());
        let notice = model.notice.expect("warning notice");
        assert_eq!(notice.kind, crate::model::NoticeKind::Warning);
        assert!(notice.message.starts_with("1 saved code"));
    }

    #[test]
    fn invalid_storage_key_fails_load_without_request() {
        let mut config = crate::config::Config::default();
        config.storage_key = String::new();
        let mut model = Model::with_config(config);
        let result = App::storage_key(&model).map(|_| None);
        App::handle_loaded(&mut model, result);
        assert_eq!(model.load_state, LoadState::Ready);
        assert_eq!(
            model.active_error.as_ref().map(|e| e.kind),
            Some(crate::error::ErrorKind::Storage)
        );
    }

    #[test]
    fn preview_title_uses_kind() {
        let mut model = ready_model(vec![item(CodeKind::Barcode, "123")]);
        model.preview_index = Some(0);
        let preview = App::build_preview_view(&model).unwrap();
        assert_eq!(preview.title, "BARCODE Code");
        assert_eq!(preview.content, "123");

        model.preview_index = Some(3);
        assert!(App::build_preview_view(&model).is_none());
    }

    #[test]
    fn loading_unreadable_data_starts_empty_with_error() {
        let mut model = Model::default();
        App::handle_loaded(&mut model, Ok(Some(b"not json".to_vec())));
        assert_eq!(model.load_state, LoadState::Ready);
        assert!(model.gallery.is_empty());
        assert_eq!(
            model.active_error.as_ref().map(|e| e.kind),
            Some(crate::error::ErrorKind::Deserialization)
        );
    }

    #[test]
    fn generator_view_offers_downloads_only_for_generated_code() {
        let model = ready_model(vec![]);
        let view = App::build_generator_view(&model);
        assert!(view.download.is_none());
        assert!(!view.can_save);
        assert_eq!(
            view.output,
            OutputView::Placeholder {
                message: OUTPUT_PLACEHOLDER.into()
            }
        );
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::watch;
use tracing::warn;

use us_core::mixer::SuggestionMixer;
use us_core::Suggestion;

use crate::session::notifier::ChangeNotifier;

/// Session-side observer of one cursor's lifecycle.
pub trait CursorListener: Send + Sync {
    fn on_item_clicked(&self, clicked: &Suggestion);

    /// Called the first time the "more results" row scrolls on screen.
    fn on_more_visible(&self);

    /// Called once, with the suggestions that were actually displayed.
    fn on_close(&self, viewed: Vec<Suggestion>);
}

/// Out-of-band requests the search box sends alongside plain row reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorRequest {
    PostRefresh,
    PreClose { max_display_pos: Option<usize> },
    Click { position: usize },
    ThreshHit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorResponse {
    PostRefresh {
        is_pending: bool,
        /// Position whose display the UI should announce (the "more" row).
        display_notify_index: Option<usize>,
    },
    PreClose,
    Click {
        /// Position the UI should re-select, set when a click expanded the
        /// "more results" section in place.
        selected_position: Option<usize>,
    },
    ThreshHit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CursorRequestError {
    #[error("no suggestion at position {0}")]
    PositionOutOfBounds(usize),
}

/// Columns of the tabular read model the search box binds to. Cells are
/// plain text; adapters render them without knowing the row types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    Format,
    Title,
    Description,
    Icon1,
    Icon2,
    IntentQuery,
    IntentAction,
    IntentData,
    ActionMsgCall,
    IntentExtraData,
    ShortcutId,
    BackgroundColor,
}

struct CursorShared {
    query: String,
    mixer: Arc<SuggestionMixer>,
    notifier: Arc<ChangeNotifier>,
    data: Mutex<Vec<Suggestion>>,
    expand_more: AtomicBool,
    more_called: AtomicBool,
    closed: AtomicBool,
    listener: OnceLock<Arc<dyn CursorListener>>,
}

/// Thin read model over the mixer: a locally consistent snapshot the UI
/// reads row by row, refreshed only in [`requery`](SessionCursor::requery)
/// so an adapter never observes a half-updated list.
#[derive(Clone)]
pub struct SessionCursor {
    shared: Arc<CursorShared>,
}

impl SessionCursor {
    pub(crate) fn new(
        query: &str,
        mixer: Arc<SuggestionMixer>,
        notifier: Arc<ChangeNotifier>,
    ) -> Self {
        let mut data = Vec::new();
        mixer.snapshot_into(&mut data, false);
        Self {
            shared: Arc::new(CursorShared {
                query: query.to_string(),
                mixer,
                notifier,
                data: Mutex::new(data),
                expand_more: AtomicBool::new(false),
                more_called: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                listener: OnceLock::new(),
            }),
        }
    }

    pub(crate) fn set_listener(&self, listener: Arc<dyn CursorListener>) {
        let _ = self.shared.listener.set(listener);
    }

    pub fn query(&self) -> &str {
        &self.shared.query
    }

    pub fn count(&self) -> usize {
        self.shared.data.lock().unwrap().len()
    }

    pub fn suggestion_at(&self, position: usize) -> Option<Suggestion> {
        self.shared.data.lock().unwrap().get(position).cloned()
    }

    pub fn snapshot(&self) -> Vec<Suggestion> {
        self.shared.data.lock().unwrap().clone()
    }

    /// Reads one cell of the snapshot. `None` for out-of-range positions
    /// and for cells the suggestion leaves empty.
    pub fn field(&self, position: usize, column: Column) -> Option<String> {
        let suggestion = self.suggestion_at(position)?;
        match column {
            Column::Id => Some(position.to_string()),
            Column::Format => suggestion.format,
            Column::Title => Some(suggestion.title),
            Column::Description => suggestion.description,
            Column::Icon1 => suggestion.icon1,
            Column::Icon2 => suggestion.icon2,
            Column::IntentQuery => suggestion.intent_query,
            Column::IntentAction => suggestion.intent_action,
            Column::IntentData => suggestion.intent_data,
            Column::ActionMsgCall => suggestion.action_msg_call,
            Column::IntentExtraData => suggestion.intent_extra_data,
            Column::ShortcutId => suggestion.shortcut_id,
            Column::BackgroundColor => suggestion.background_color.map(|c| c.to_string()),
        }
    }

    /// Bumps whenever the mixer has fresh content worth re-reading.
    pub fn changed(&self) -> watch::Receiver<u64> {
        self.shared.notifier.subscribe()
    }

    /// Re-reads the snapshot from the mixer under the current expansion
    /// state.
    pub fn requery(&self) {
        let mut data = self.shared.data.lock().unwrap();
        self.shared
            .mixer
            .snapshot_into(&mut data, self.shared.expand_more.load(Ordering::Acquire));
    }

    /// Seeds this cursor's rows from the previous keystroke's cursor.
    /// Only valid while this cursor is still empty.
    pub(crate) fn prefill(&self, previous: &SessionCursor) {
        let mut data = self.shared.data.lock().unwrap();
        if data.is_empty() {
            *data = previous.snapshot();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Closes without display information; nothing counts as viewed.
    pub fn close(&self) {
        self.finish(Vec::new());
    }

    pub fn respond(&self, request: CursorRequest) -> Result<CursorResponse, CursorRequestError> {
        match request {
            CursorRequest::PostRefresh => {
                let mixer = &self.shared.mixer;
                let display_notify_index = (mixer.is_showing_more()
                    && !self.shared.more_called.load(Ordering::Acquire))
                .then(|| mixer.more_result_position());
                Ok(CursorResponse::PostRefresh {
                    is_pending: mixer.is_results_pending(),
                    display_notify_index,
                })
            }
            CursorRequest::PreClose { max_display_pos } => {
                let viewed = {
                    let data = self.shared.data.lock().unwrap();
                    match max_display_pos {
                        // A position beyond the snapshot means the display
                        // was showing prefilled rows; count nothing.
                        Some(pos) if pos < data.len() => data[..=pos].to_vec(),
                        _ => Vec::new(),
                    }
                };
                self.finish(viewed);
                Ok(CursorResponse::PreClose)
            }
            CursorRequest::Click { position } => self.respond_click(position),
            CursorRequest::ThreshHit => {
                self.shared.more_called.store(true, Ordering::Release);
                if let Some(listener) = self.shared.listener.get() {
                    listener.on_more_visible();
                }
                Ok(CursorResponse::ThreshHit)
            }
        }
    }

    fn respond_click(&self, position: usize) -> Result<CursorResponse, CursorRequestError> {
        let clicked = self
            .suggestion_at(position)
            .ok_or(CursorRequestError::PositionOutOfBounds(position))?;
        if let Some(listener) = self.shared.listener.get() {
            listener.on_item_clicked(&clicked);
        }

        let mixer = &self.shared.mixer;
        if mixer.is_showing_more() && position == mixer.more_result_position() {
            let expanded = !self.shared.expand_more.fetch_xor(true, Ordering::AcqRel);
            self.shared.notifier.notify();
            if expanded {
                // Echo the position so the UI keeps the expander selected
                // and the corpus rows scroll into view.
                return Ok(CursorResponse::Click {
                    selected_position: Some(position),
                });
            }
        }
        Ok(CursorResponse::Click {
            selected_position: None,
        })
    }

    fn finish(&self, viewed: Vec<Suggestion>) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            warn!(query = %self.shared.query, "cursor closed twice");
            return;
        }
        self.shared.notifier.close();
        if let Some(listener) = self.shared.listener.get() {
            listener.on_close(viewed);
        }
    }
}

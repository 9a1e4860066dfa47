use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use crate::fetch::{FetchRequest, FetchResponse};
use crate::record::{Field, Member};
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Normal,
    Searching,
    Editing {
        field: Field,
        cursor: usize, // byte offset into the focused field
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

pub struct App {
    pub should_quit: bool,

    // UI state
    pub mode: AppMode,
    pub status: String,
    pub show_help: bool,
    pub load_state: LoadState,

    pub store: RecordStore,
    /// Row under the cursor, relative to the active page
    pub cursor_row: usize,
    /// Header checkbox; reset whenever the page or the view changes
    pub all_checked: bool,

    /// Sequence number of the most recently issued load
    pub load_seq: u64,

    // Channels
    pub req_tx: Sender<FetchRequest>,
    pub resp_rx: Receiver<FetchResponse>,
}

impl App {
    pub fn new(
        page_size: usize,
        req_tx: Sender<FetchRequest>,
        resp_rx: Receiver<FetchResponse>,
    ) -> Self {
        Self {
            should_quit: false,
            mode: AppMode::Normal,
            status: "Press q to quit. / to search. e to edit. d to delete. ? for help.".into(),
            show_help: false,
            load_state: LoadState::Loading,
            store: RecordStore::new(page_size),
            cursor_row: 0,
            all_checked: false,
            load_seq: 0,
            req_tx,
            resp_rx,
        }
    }

    // ===== Loading =====

    /// Issue a new load. Only the answer carrying this sequence number will be applied.
    pub fn request_load(&mut self) {
        self.load_seq += 1;
        let seq = self.load_seq;
        self.load_state = LoadState::Loading;
        if self.req_tx.send(FetchRequest::Load { seq }).is_err() {
            self.load_state = LoadState::Failed("fetch worker is not running".into());
            self.status = "Load failed: fetch worker is not running".into();
            return;
        }
        info!(seq, "load requested");
        self.status = "Loading members...".into();
    }

    pub fn handle_fetch_response(&mut self, resp: FetchResponse) {
        match resp {
            FetchResponse::Loaded { seq, members } => {
                if seq != self.load_seq {
                    debug!(seq, latest = self.load_seq, "discarding stale load");
                    return;
                }
                self.store.load(members);
                self.load_state = LoadState::Ready;
                self.all_checked = false;
                self.clamp_cursor();
                if matches!(self.mode, AppMode::Editing { .. }) && !self.store.is_editing() {
                    self.mode = AppMode::Normal;
                }
                self.status = format!("Loaded {} members", self.store.records().len());
            }
            FetchResponse::Failed { seq, error } => {
                if seq != self.load_seq {
                    debug!(seq, latest = self.load_seq, "discarding stale load failure");
                    return;
                }
                warn!(%error, "load failed");
                self.load_state = LoadState::Failed(format!("Failed to fetch users: {error}"));
                self.status = "Load failed; press r to retry or q to quit".into();
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.load_state == LoadState::Ready
    }

    /// Mutating intents are only accepted once a collection is loaded.
    fn ensure_ready(&mut self) -> bool {
        match &self.load_state {
            LoadState::Ready => true,
            LoadState::Loading => {
                self.status = "Still loading members...".into();
                false
            }
            LoadState::Failed(_) => {
                self.status = "Nothing loaded; press r to reload".into();
                false
            }
        }
    }

    // ===== Search =====

    pub fn begin_search(&mut self) {
        self.mode = AppMode::Searching;
        self.status = "Search: type and Enter to apply (Esc to close)".into();
    }

    pub fn search_input_char(&mut self, c: char) {
        let mut q = self.store.query().to_string();
        q.push(c);
        self.store.set_query(q);
    }

    pub fn search_backspace(&mut self) {
        let mut q = self.store.query().to_string();
        q.pop();
        self.store.set_query(q);
    }

    pub fn submit_search(&mut self) {
        self.mode = AppMode::Normal;
        self.store.search();
        self.all_checked = false;
        self.clamp_cursor();
        let n = self.store.filtered().len();
        self.status = if self.store.query().is_empty() {
            format!("Showing all {n} members")
        } else {
            format!("Search \"{}\": {n} matches", self.store.query())
        };
    }

    pub fn close_search(&mut self) {
        self.mode = AppMode::Normal;
        self.status = "Search closed".into();
    }

    pub fn clear_search(&mut self) {
        self.store.set_query("");
        self.submit_search();
    }

    // ===== Cursor and pages =====

    pub fn current_row(&self) -> Option<&Member> {
        self.store.derive_page().rows.get(self.cursor_row)
    }

    fn clamp_cursor(&mut self) {
        let rows = self.store.derive_page().rows.len();
        self.cursor_row = self.cursor_row.min(rows.saturating_sub(1));
    }

    pub fn move_up(&mut self) {
        self.cursor_row = self.cursor_row.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        let rows = self.store.derive_page().rows.len();
        if self.cursor_row + 1 < rows {
            self.cursor_row += 1;
        }
    }

    fn goto_page(&mut self, page: usize) {
        if page != self.store.page() {
            self.store.set_page(page);
            self.cursor_row = 0;
            self.all_checked = false;
        }
    }

    pub fn next_page(&mut self) {
        let page = self.store.page();
        if page < self.store.last_page() {
            self.goto_page(page + 1);
        }
    }

    pub fn prev_page(&mut self) {
        let page = self.store.page();
        let last = self.store.last_page();
        if page > last {
            self.goto_page(last);
        } else if page > 0 {
            self.goto_page(page - 1);
        }
    }

    pub fn first_page(&mut self) {
        self.goto_page(0);
    }

    pub fn last_page(&mut self) {
        self.goto_page(self.store.last_page());
    }

    /// "Total N users, Total P page(s)."
    pub fn pagination_summary(&self) -> String {
        let page = self.store.derive_page();
        format!(
            "Total {} users, Total {} page{}.",
            page.total,
            page.page_count,
            if page.page_count > 1 { "s" } else { "" }
        )
    }

    // ===== Selection and deletion =====

    pub fn toggle_select_current(&mut self) {
        if !self.ensure_ready() {
            return;
        }
        if self.store.toggle_select(self.cursor_row) {
            self.status = format!("{} selected", self.store.selection_len());
        }
    }

    pub fn toggle_select_all(&mut self) {
        if !self.ensure_ready() {
            return;
        }
        self.all_checked = !self.all_checked;
        self.store.select_all(self.all_checked);
        self.status = format!("{} selected", self.store.selection_len());
    }

    pub fn delete_current(&mut self) {
        if !self.ensure_ready() {
            return;
        }
        let Some(row) = self.current_row().cloned() else {
            self.status = "No row to delete".into();
            return;
        };
        if self.store.delete_one(&row.id) {
            // rows shift up from the next page, so the header no longer holds
            self.all_checked = false;
            info!(id = %row.id, "member deleted");
            self.status = format!("Deleted {}", row.name);
        }
        self.clamp_cursor();
    }

    pub fn delete_selected(&mut self) {
        if !self.ensure_ready() {
            return;
        }
        let removed = self.store.delete_selected();
        self.all_checked = false;
        self.clamp_cursor();
        if removed == 0 {
            self.status = "Nothing selected".into();
        } else {
            info!(removed, "selected members deleted");
            self.status = format!("Deleted {removed} members");
        }
    }

    // ===== Editing =====

    pub fn begin_edit_current(&mut self) {
        if !self.ensure_ready() {
            return;
        }
        let Some(id) = self.current_row().map(|m| m.id.clone()) else {
            self.status = "No row to edit".into();
            return;
        };
        if self.store.begin_edit(&id) {
            let cursor = self.edit_value(Field::Name).len();
            self.mode = AppMode::Editing {
                field: Field::Name,
                cursor,
            };
            self.status = "Editing: Tab to switch field, Enter to save, Esc to cancel".into();
        }
    }

    pub fn submit_edit(&mut self) {
        self.mode = AppMode::Normal;
        let name = self.store.editing().map(|m| m.name.clone());
        if self.store.save_edit() {
            self.status = format!("Saved {}", name.unwrap_or_default());
        } else {
            self.status = "Nothing to save".into();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.mode = AppMode::Normal;
        self.store.cancel_edit();
        self.status = "Edit cancelled".into();
    }

    fn edit_value(&self, field: Field) -> String {
        self.store
            .editing()
            .map(|m| m.get(field).to_string())
            .unwrap_or_default()
    }

    fn focus_field(&mut self, field: Field) {
        let cursor = self.edit_value(field).len();
        self.mode = AppMode::Editing { field, cursor };
    }

    pub fn edit_next_field(&mut self) {
        if let AppMode::Editing { field, .. } = self.mode {
            self.focus_field(field.next());
        }
    }

    pub fn edit_prev_field(&mut self) {
        if let AppMode::Editing { field, .. } = self.mode {
            self.focus_field(field.prev());
        }
    }

    pub fn edit_input_insert(&mut self, ch: char) {
        if let AppMode::Editing { field, cursor } = self.mode {
            let mut value = self.edit_value(field);
            let at = cursor.min(value.len());
            value.insert(at, ch);
            self.store.update_edit_field(field, value);
            self.mode = AppMode::Editing {
                field,
                cursor: at + ch.len_utf8(),
            };
        }
    }

    pub fn edit_input_backspace(&mut self) {
        if let AppMode::Editing { field, cursor } = self.mode
            && cursor > 0
        {
            let mut value = self.edit_value(field);
            let start = prev_char_boundary(&value, cursor);
            value.drain(start..cursor);
            self.store.update_edit_field(field, value);
            self.mode = AppMode::Editing {
                field,
                cursor: start,
            };
        }
    }

    pub fn edit_input_delete(&mut self) {
        if let AppMode::Editing { field, cursor } = self.mode {
            let mut value = self.edit_value(field);
            if cursor < value.len() {
                let end = next_char_boundary(&value, cursor);
                value.drain(cursor..end);
                self.store.update_edit_field(field, value);
            }
        }
    }

    pub fn edit_input_left(&mut self) {
        if let AppMode::Editing { field, cursor } = self.mode {
            let cursor = prev_char_boundary(&self.edit_value(field), cursor);
            self.mode = AppMode::Editing { field, cursor };
        }
    }

    pub fn edit_input_right(&mut self) {
        if let AppMode::Editing { field, cursor } = self.mode {
            let cursor = next_char_boundary(&self.edit_value(field), cursor);
            self.mode = AppMode::Editing { field, cursor };
        }
    }

    pub fn edit_input_home(&mut self) {
        if let AppMode::Editing { field, .. } = self.mode {
            self.mode = AppMode::Editing { field, cursor: 0 };
        }
    }

    pub fn edit_input_end(&mut self) {
        if let AppMode::Editing { field, .. } = self.mode {
            self.focus_field(field);
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }
}

fn prev_char_boundary(s: &str, idx: usize) -> usize {
    let idx = idx.min(s.len());
    s[..idx]
        .char_indices()
        .next_back()
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn next_char_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    s[idx..]
        .chars()
        .next()
        .map(|c| idx + c.len_utf8())
        .unwrap_or(s.len())
}

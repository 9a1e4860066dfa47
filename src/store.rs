//! In-memory member store: filtering, selection, paging and the edit buffer.
//!
//! The store owns the full collection plus a derived, filtered view. The
//! visible page is computed on demand from the view and the page cursor.
//! Selection is keyed by member id, so it cannot drift onto other rows when
//! the view or the page changes.

use std::collections::BTreeSet;

use tracing::debug;

use crate::record::{Field, Member};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// The slice of the filtered view visible at the current cursor.
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    pub rows: &'a [Member],
    /// Cursor as stored, not clamped.
    pub page: usize,
    /// Always at least 1, so an empty view renders as "page 1 of 1".
    pub page_count: usize,
    /// Length of the filtered view.
    pub total: usize,
    /// Offset of `rows[0]` within the filtered view.
    pub start: usize,
}

impl Page<'_> {
    pub fn is_past_end(&self) -> bool {
        self.page >= self.page_count
    }
}

#[derive(Debug, Clone)]
pub struct RecordStore {
    records: Vec<Member>,
    filtered: Vec<Member>,
    query: String,
    selection: BTreeSet<String>,
    page: usize,
    page_size: usize,
    edit: Option<Member>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl RecordStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            records: Vec::new(),
            filtered: Vec::new(),
            query: String::new(),
            selection: BTreeSet::new(),
            page: 0,
            page_size: page_size.max(1),
            edit: None,
        }
    }

    // ===== Accessors =====

    pub fn records(&self) -> &[Member] {
        &self.records
    }

    pub fn filtered(&self) -> &[Member] {
        &self.filtered
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn editing(&self) -> Option<&Member> {
        self.edit.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.edit.is_some()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    pub fn selection_len(&self) -> usize {
        self.selection.len()
    }

    // ===== Loading and filtering =====

    /// Replace the whole collection and re-apply the current query.
    pub fn load(&mut self, records: Vec<Member>) {
        self.records = records;
        self.filtered = self.apply_query();
        self.selection.clear();
        if let Some(edit) = &self.edit
            && !self.records.iter().any(|m| m.id == edit.id)
        {
            self.edit = None;
        }
        debug!(
            records = self.records.len(),
            visible = self.filtered.len(),
            "store loaded"
        );
    }

    /// Store the query without filtering; `search` applies it.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Recompute the filtered view from the collection and the stored query.
    /// The page cursor is left alone; a cursor past the end yields an empty page.
    /// Selection keeps only members still rendered on the active page.
    pub fn search(&mut self) {
        self.filtered = self.apply_query();
        let visible: BTreeSet<String> = self
            .derive_page()
            .rows
            .iter()
            .map(|m| m.id.clone())
            .collect();
        self.selection.retain(|id| visible.contains(id));
        debug!(query = %self.query, visible = self.filtered.len(), "search applied");
    }

    fn apply_query(&self) -> Vec<Member> {
        let needle = self.query.to_lowercase();
        self.records
            .iter()
            .filter(|m| m.matches(&needle))
            .cloned()
            .collect()
    }

    // ===== Paging =====

    pub fn derive_page(&self) -> Page<'_> {
        let total = self.filtered.len();
        let page_count = total.div_ceil(self.page_size).max(1);
        let start = self.page.saturating_mul(self.page_size).min(total);
        let end = start.saturating_add(self.page_size).min(total);
        Page {
            rows: &self.filtered[start..end],
            page: self.page,
            page_count,
            total,
            start,
        }
    }

    /// Highest page index that has rows (0 for an empty view).
    pub fn last_page(&self) -> usize {
        self.filtered.len().div_ceil(self.page_size).saturating_sub(1)
    }

    /// Move the cursor; no clamping here. Changing page drops the selection.
    pub fn set_page(&mut self, page: usize) {
        if page != self.page {
            self.selection.clear();
        }
        self.page = page;
    }

    // ===== Selection =====

    /// Select every row on the active page, or clear the selection entirely.
    pub fn select_all(&mut self, checked: bool) {
        if checked {
            let ids = self
                .derive_page()
                .rows
                .iter()
                .map(|m| m.id.clone())
                .collect();
            self.selection = ids;
        } else {
            self.selection.clear();
        }
    }

    /// Toggle the row at `index` on the active page. Returns false when the
    /// index is not a visible row.
    pub fn toggle_select(&mut self, index: usize) -> bool {
        let Some(id) = self.derive_page().rows.get(index).map(|m| m.id.clone()) else {
            return false;
        };
        if !self.selection.remove(&id) {
            self.selection.insert(id);
        }
        true
    }

    // ===== Deletion =====

    /// Remove the member with `id` from both the collection and the view.
    pub fn delete_one(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|m| m.id != id);
        self.filtered.retain(|m| m.id != id);
        self.selection.remove(id);
        if self.edit.as_ref().is_some_and(|e| e.id == id) {
            self.edit = None;
        }
        before != self.records.len()
    }

    /// Remove every selected member and clear the selection. Returns how many
    /// members were removed.
    pub fn delete_selected(&mut self) -> usize {
        if self.selection.is_empty() {
            return 0;
        }
        let selected = std::mem::take(&mut self.selection);
        let before = self.records.len();
        self.records.retain(|m| !selected.contains(&m.id));
        self.filtered.retain(|m| !selected.contains(&m.id));
        if self.edit.as_ref().is_some_and(|e| selected.contains(&e.id)) {
            self.edit = None;
        }
        before - self.records.len()
    }

    // ===== Editing =====

    /// Snapshot the member with `id` into the edit buffer.
    pub fn begin_edit(&mut self, id: &str) -> bool {
        match self.records.iter().find(|m| m.id == id) {
            Some(m) => {
                self.edit = Some(m.clone());
                true
            }
            None => false,
        }
    }

    pub fn update_edit_field(&mut self, field: Field, value: impl Into<String>) -> bool {
        match self.edit.as_mut() {
            Some(edit) => {
                edit.set(field, value);
                true
            }
            None => false,
        }
    }

    /// Merge the edit buffer back into the collection and the view.
    pub fn save_edit(&mut self) -> bool {
        let Some(edit) = self.edit.take() else {
            return false;
        };
        let Some(pos) = self.records.iter().position(|m| m.id == edit.id) else {
            self.edit = Some(edit);
            return false;
        };
        if let Some(row) = self.filtered.iter_mut().find(|m| m.id == edit.id) {
            *row = edit.clone();
        }
        debug!(id = %edit.id, "edit saved");
        self.records[pos] = edit;
        true
    }

    /// Drop the edit buffer without touching the collection.
    pub fn cancel_edit(&mut self) -> bool {
        self.edit.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(n: usize) -> Vec<Member> {
        (1..=n)
            .map(|i| {
                let role = if i % 3 == 0 { "admin" } else { "member" };
                Member::new(
                    i.to_string(),
                    format!("User {i}"),
                    format!("user{i}@mailinator.com"),
                    role,
                )
            })
            .collect()
    }

    fn store_with(n: usize) -> RecordStore {
        let mut s = RecordStore::default();
        s.load(members(n));
        s
    }

    fn ids(rows: &[Member]) -> Vec<&str> {
        rows.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn scenario_filter_then_bulk_delete() {
        let mut s = RecordStore::default();
        s.load(vec![
            Member::new("1", "Alice", "a@x.com", "Admin"),
            Member::new("2", "Bob", "b@x.com", "User"),
        ]);
        s.set_query("admin");
        s.search();
        assert_eq!(ids(s.filtered()), ["1"]);

        assert!(s.toggle_select(0));
        assert_eq!(s.delete_selected(), 1);
        assert_eq!(ids(s.records()), ["2"]);
        assert!(s.filtered().is_empty());
        assert_eq!(s.selection_len(), 0);
    }

    #[test]
    fn search_matches_any_field_case_insensitively() {
        let mut s = RecordStore::default();
        let all = vec![
            Member::new("1", "Aaron Miles", "aaron@mailinator.com", "member"),
            Member::new("2", "Aishwarya Naik", "aishwarya@MAILINATOR.com", "member"),
            Member::new("3", "Arvind Kumar", "arvind@example.com", "ADMIN"),
        ];
        s.load(all.clone());

        for q in ["", "a", "AARON", "mailinator", "admin", "member", "zzz", "kumar"] {
            s.set_query(q);
            s.search();
            let needle = q.to_lowercase();
            let expected: Vec<&str> = all
                .iter()
                .filter(|m| {
                    m.name.to_lowercase().contains(&needle)
                        || m.email.to_lowercase().contains(&needle)
                        || m.role.to_lowercase().contains(&needle)
                })
                .map(|m| m.id.as_str())
                .collect();
            assert_eq!(ids(s.filtered()), expected, "query {q:?}");
        }
    }

    #[test]
    fn set_query_does_not_filter_until_search() {
        let mut s = store_with(12);
        s.set_query("admin");
        assert_eq!(s.filtered().len(), 12);
        s.search();
        assert_eq!(s.filtered().len(), 4);
    }

    #[test]
    fn search_is_idempotent() {
        let mut s = store_with(30);
        s.set_query("user 1");
        s.search();
        let first = s.filtered().to_vec();
        s.search();
        assert_eq!(s.filtered(), first.as_slice());
    }

    #[test]
    fn load_reapplies_current_query_and_clears_selection() {
        let mut s = store_with(5);
        s.select_all(true);
        s.set_query("admin");
        s.search();
        s.load(members(9));
        assert_eq!(ids(s.filtered()), ["3", "6", "9"]);
        assert_eq!(s.selection_len(), 0);
    }

    #[test]
    fn page_bounds_and_count() {
        for len in 0..=35 {
            let mut s = store_with(len);
            let expected_count = len.div_ceil(10).max(1);
            for p in 0..expected_count + 1 {
                s.set_page(p);
                let page = s.derive_page();
                assert!(page.rows.len() <= 10);
                assert_eq!(page.page_count, expected_count);
                assert_eq!(page.total, len);
            }
        }
    }

    #[test]
    fn empty_view_is_one_empty_page() {
        let s = RecordStore::default();
        let page = s.derive_page();
        assert_eq!(page.page_count, 1);
        assert!(page.rows.is_empty());
        assert!(!page.is_past_end());
        assert_eq!(s.last_page(), 0);
    }

    #[test]
    fn cursor_past_end_after_search_yields_empty_page() {
        let mut s = store_with(30);
        s.set_page(2);
        assert_eq!(s.derive_page().rows.len(), 10);
        s.set_query("admin");
        s.search();
        let page = s.derive_page();
        assert_eq!(page.page, 2);
        assert!(page.rows.is_empty());
        assert!(page.is_past_end());
        assert_eq!(s.last_page(), 0);
    }

    #[test]
    fn page_slices_follow_cursor() {
        let mut s = store_with(25);
        s.set_page(2);
        let page = s.derive_page();
        assert_eq!(page.start, 20);
        assert_eq!(ids(page.rows), ["21", "22", "23", "24", "25"]);
    }

    #[test]
    fn custom_page_size_is_respected() {
        let mut s = RecordStore::new(4);
        s.load(members(10));
        assert_eq!(s.derive_page().page_count, 3);
        s.set_page(2);
        assert_eq!(s.derive_page().rows.len(), 2);
        assert_eq!(RecordStore::new(0).page_size(), 1);
    }

    #[test]
    fn select_all_covers_only_the_active_page() {
        let mut s = store_with(25);
        s.select_all(true);
        assert_eq!(s.selection_len(), 10);
        s.set_page(2);
        s.select_all(true);
        assert_eq!(s.selection_len(), 5);
        assert!(s.is_selected("21"));
        assert!(!s.is_selected("1"));
        s.select_all(false);
        assert_eq!(s.selection_len(), 0);
    }

    #[test]
    fn toggle_select_adds_then_removes() {
        let mut s = store_with(15);
        s.set_page(1);
        assert!(s.toggle_select(0));
        assert!(s.is_selected("11"));
        assert!(s.toggle_select(0));
        assert!(!s.is_selected("11"));
        assert!(!s.toggle_select(9));
        assert_eq!(s.selection_len(), 0);
    }

    #[test]
    fn changing_page_clears_selection() {
        let mut s = store_with(25);
        s.toggle_select(3);
        s.set_page(0);
        assert_eq!(s.selection_len(), 1);
        s.set_page(1);
        assert_eq!(s.selection_len(), 0);
    }

    #[test]
    fn search_prunes_selection_to_visible_members() {
        let mut s = store_with(9);
        s.select_all(true);
        s.set_query("admin");
        s.search();
        assert_eq!(s.selection_len(), 3);
        assert_eq!(s.delete_selected(), 3);
        assert_eq!(s.records().len(), 6);
        assert!(s.records().iter().all(|m| m.role == "member"));
    }

    #[test]
    fn narrowing_search_drops_selection_off_the_active_page() {
        let mut s = store_with(25);
        s.set_page(2);
        s.select_all(true);
        assert_eq!(s.selection_len(), 5);

        // "user 2" matches 7 members, all on page 0; page 2 is now past the end
        s.set_query("user 2");
        s.search();
        assert!(s.derive_page().rows.is_empty());
        assert_eq!(s.selection_len(), 0);
        assert_eq!(s.delete_selected(), 0);
        assert_eq!(s.records().len(), 25);
    }

    #[test]
    fn search_keeps_selected_rows_still_on_the_page() {
        let mut s = store_with(25);
        s.select_all(true);
        s.set_query("user 1");
        s.search();
        // view is User 1, User 10..=19; page 0 shows 1 and 10..=18
        assert_eq!(s.selection_len(), 2);
        assert!(s.is_selected("1"));
        assert!(s.is_selected("10"));

        assert_eq!(s.delete_selected(), 2);
        assert!(s.records().iter().any(|m| m.id == "19"));
        assert_eq!(ids(s.filtered()).len(), 9);
    }

    #[test]
    fn delete_selected_uses_identity_on_later_pages() {
        let mut s = store_with(25);
        s.set_page(1);
        s.toggle_select(0);
        s.toggle_select(4);
        assert_eq!(s.delete_selected(), 2);
        assert!(!s.records().iter().any(|m| m.id == "11" || m.id == "15"));
        assert_eq!(s.records().len(), 23);
        assert_eq!(s.filtered().len(), 23);
    }

    #[test]
    fn delete_selected_without_selection_is_noop() {
        let mut s = store_with(3);
        assert_eq!(s.delete_selected(), 0);
        assert_eq!(s.records().len(), 3);
    }

    #[test]
    fn delete_one_removes_from_collection_and_view() {
        let mut s = store_with(12);
        s.set_query("admin");
        s.search();
        assert!(s.delete_one("6"));
        assert_eq!(s.records().len(), 11);
        assert!(!s.records().iter().any(|m| m.id == "6"));
        assert!(!s.filtered().iter().any(|m| m.id == "6"));
        // the view keeps its filter
        assert_eq!(ids(s.filtered()), ["3", "9", "12"]);
    }

    #[test]
    fn delete_one_unknown_id_changes_nothing() {
        let mut s = store_with(4);
        assert!(!s.delete_one("404"));
        assert_eq!(s.records().len(), 4);
    }

    #[test]
    fn delete_one_drops_selection_and_edit_of_that_member() {
        let mut s = store_with(4);
        s.toggle_select(1);
        s.begin_edit("2");
        s.delete_one("2");
        assert_eq!(s.selection_len(), 0);
        assert!(!s.is_editing());
    }

    #[test]
    fn edit_round_trip_changes_only_target_field() {
        let mut s = store_with(5);
        let original = s.records()[2].clone();
        assert!(s.begin_edit("3"));
        assert!(s.update_edit_field(Field::Email, "new@x.com"));
        assert!(s.save_edit());
        assert!(!s.is_editing());

        let saved = &s.records()[2];
        assert_eq!(saved.id, original.id);
        assert_eq!(saved.email, "new@x.com");
        assert_eq!(saved.name, original.name);
        assert_eq!(saved.role, original.role);
        assert_eq!(&s.filtered()[2], saved);
    }

    #[test]
    fn cancel_edit_leaves_collection_untouched() {
        let mut s = store_with(5);
        let before = s.records().to_vec();
        s.begin_edit("1");
        s.update_edit_field(Field::Name, "Changed");
        assert!(s.cancel_edit());
        assert_eq!(s.records(), before.as_slice());
        assert!(!s.cancel_edit());
    }

    #[test]
    fn edit_buffer_does_not_alias_collection() {
        let mut s = store_with(2);
        s.begin_edit("1");
        s.update_edit_field(Field::Role, "owner");
        assert_eq!(s.records()[0].role, "member");
        assert_eq!(s.editing().map(|m| m.role.as_str()), Some("owner"));
    }

    #[test]
    fn edit_preconditions_are_noops() {
        let mut s = store_with(2);
        assert!(!s.update_edit_field(Field::Name, "x"));
        assert!(!s.save_edit());
        assert!(!s.begin_edit("missing"));
        assert!(!s.is_editing());
    }

    #[test]
    fn saved_edit_keeps_row_in_view_until_next_search() {
        let mut s = store_with(6);
        s.set_query("admin");
        s.search();
        s.begin_edit("3");
        s.update_edit_field(Field::Role, "member");
        s.save_edit();
        assert_eq!(ids(s.filtered()), ["3", "6"]);
        s.search();
        assert_eq!(ids(s.filtered()), ["6"]);
    }

    #[test]
    fn reload_discards_edit_of_vanished_member() {
        let mut s = store_with(5);
        s.begin_edit("5");
        s.load(members(3));
        assert!(!s.is_editing());
        s.begin_edit("2");
        s.load(members(3));
        assert!(s.is_editing());
    }
}

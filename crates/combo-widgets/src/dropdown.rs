#![forbid(unsafe_code)]

//! Shared drop-down engine.
//!
//! [`Dropdown`] composes the pieces both combo boxes need: the query
//! controller, the rendered entry list, the virtual row layout, scroll and
//! highlight state, and overlay geometry. The widgets own the selection
//! model and decide what confirming a row means; everything else lives
//! here.
//!
//! Any change to the query, the source, or the selection rebuilds the entry
//! list and the offset table. Scrolling never does.

use std::borrow::Cow;
use std::time::{Duration, Instant};

use combo_core::event::{KeyCode, KeyEvent, Modifiers};
use combo_core::geometry::{Rect, Size};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::ComboBoxConfig;
use crate::entries::{Entry, EntryList, EntryParams};
use crate::fuzzy;
use crate::navigation::{NavCommand, Navigator};
use crate::option::{OptionValue, SelectOption};
use crate::overlay::{OverlayGeometry, OverlayRequest, OverlayTracker, natural_content_width};
use crate::query::{FetchOutcome, FetchResult, FetchTicket, QueryController, QueryStatus};
use crate::selection::{ComboState, ComboTransition, SelectAllState};
use crate::source::OptionSource;
use crate::view::{
    GroupHeaderView, ListStatus, ListView, Role, RowView, all_id, custom_id, group_id, option_id,
};
use crate::virtualized::{RowDescriptor, RowLayout, ScrollState};

/// Columns reserved next to each label (selection marker and spacing).
const ROW_CHROME: u16 = 2;

/// Result of feeding a key to the query editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryEdit {
    /// The query text changed.
    Changed,
    /// Backspace with an empty query.
    BackspaceOnEmpty,
    /// The key does not edit the query.
    Ignored,
}

/// What an absolute pointer position lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// A row of the open list.
    Row(usize),
    /// List area below the last row, or padding.
    List,
    /// The trigger.
    Trigger,
    /// Anywhere else.
    Outside,
}

/// State shared by the single- and multi-select widgets.
pub struct Dropdown<V> {
    config: ComboBoxConfig,
    multi: bool,
    query: QueryController<V>,
    state: ComboState,
    entries: EntryList<V>,
    layout: RowLayout,
    scroll: ScrollState,
    nav: Navigator,
    overlay: OverlayTracker,
    trigger: Rect,
    viewport: Size,
}

impl<V: OptionValue> Dropdown<V> {
    /// Create a closed drop-down over `source`.
    pub fn new(source: OptionSource<V>, config: ComboBoxConfig, multi: bool) -> Self {
        let query = QueryController::new(source).with_debounce(config.debounce);
        let scroll = ScrollState {
            overscan: config.overscan,
            ..ScrollState::default()
        };
        let mut dropdown = Self {
            config,
            multi,
            query,
            state: ComboState::Closed,
            entries: EntryList::default(),
            layout: RowLayout::default(),
            scroll,
            nav: Navigator::new(),
            overlay: OverlayTracker::new(),
            trigger: Rect::default(),
            // Unbounded until the host reports a size.
            viewport: Size::new(u16::MAX, u16::MAX),
        };
        dropdown.rebuild(&[]);
        dropdown
    }

    /// Configuration.
    pub fn config(&self) -> &ComboBoxConfig {
        &self.config
    }

    /// Open state.
    pub fn state(&self) -> ComboState {
        self.state
    }

    /// Whether the list is shown.
    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Current query text.
    pub fn query(&self) -> &str {
        self.query.query()
    }

    /// Loading/error flags of the option source.
    pub fn status(&self) -> QueryStatus {
        self.query.status()
    }

    /// Options currently eligible for display.
    pub fn working_set(&self) -> &[SelectOption<V>] {
        self.query.working_set()
    }

    /// Rendered rows.
    pub fn entries(&self) -> &EntryList<V> {
        &self.entries
    }

    /// Row offset table.
    pub fn layout(&self) -> &RowLayout {
        &self.layout
    }

    /// Scroll state.
    pub fn scroll(&self) -> &ScrollState {
        &self.scroll
    }

    /// Highlighted row.
    pub fn highlight(&self) -> Option<usize> {
        self.nav.highlight()
    }

    /// Current overlay geometry.
    pub fn geometry(&self) -> OverlayGeometry {
        self.overlay.geometry()
    }

    /// Highlighted row and the option it stands for (`None` for "select
    /// all").
    pub fn highlighted(&self) -> Option<(Entry, Option<&SelectOption<V>>)> {
        let row = self.nav.highlight()?;
        let entry = self.entries.get(row)?;
        Some((entry, self.entries.option(row, self.query.working_set())))
    }

    /// Id of the highlighted row while open.
    pub fn active_descendant(&self) -> Option<String> {
        if !self.is_open() {
            return None;
        }
        self.nav.highlight().and_then(|row| self.row_id(row))
    }

    /// Stable id of a row.
    pub fn row_id(&self, row: usize) -> Option<String> {
        let prefix = self.config.id_prefix.as_str();
        Some(match self.entries.get(row)? {
            Entry::SelectAll => all_id(prefix),
            Entry::Custom => custom_id(prefix),
            Entry::Ghost(_) | Entry::Option(_) => {
                let option = self.entries.option(row, self.query.working_set())?;
                option_id(prefix, &option.value)
            }
        })
    }

    /// Re-derive entries, layout, and geometry.
    pub fn rebuild(&mut self, selected: &[SelectOption<V>]) {
        let working = self.query.working_set();
        self.entries = EntryList::build(EntryParams {
            working,
            filtered: self.query.filtered(),
            query: self.query.query(),
            create_custom_value: self.config.create_custom_value,
            enable_all_option: self.multi && self.config.enable_all_option,
            selected,
        });
        self.layout = RowLayout::build(self.entries.shapes(working), self.config.row_metrics);
        self.update_overlay();
        self.nav.clamp(self.entries.len(), |row| {
            self.entries.is_navigable(row, self.query.working_set())
        });
        self.scroll.clamp(&self.layout);
    }

    fn update_overlay(&mut self) {
        let working = self.query.working_set();
        let labels = (0..self.entries.len()).map(|row| match self.entries.get(row) {
            Some(Entry::SelectAll) => Cow::Owned(select_all_label(self.entries.concrete_count())),
            _ => self
                .entries
                .option(row, working)
                .map_or(Cow::Borrowed(""), SelectOption::display_label),
        });
        let natural = natural_content_width(labels, self.config.width_scan_limit);
        self.overlay.update(OverlayRequest {
            trigger: self.trigger,
            viewport: self.viewport,
            content_width: natural.saturating_add(ROW_CHROME),
            content_height: self.layout.total_height(),
            max_rows_height: self.config.max_rows_height(),
            width: self.config.width,
            min_width: self.config.min_width,
            max_width: self.config.max_width,
        });
        self.scroll.viewport_height = self.overlay.geometry().height;
    }

    /// Report the trigger's bounds.
    pub fn set_trigger_area(&mut self, trigger: Rect) {
        self.trigger = trigger;
        self.update_overlay();
        self.scroll.clamp(&self.layout);
    }

    /// Report the host viewport size.
    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
        self.update_overlay();
        self.scroll.clamp(&self.layout);
    }

    /// Trigger bounds.
    pub fn trigger_area(&self) -> Rect {
        self.trigger
    }

    /// Open the list, highlighting `focus` if it is listed.
    pub fn open_at(&mut self, now: Instant, focus: Option<&V>) -> bool {
        if self.config.disabled || self.is_open() {
            return false;
        }
        self.state = self.state.apply(ComboTransition::Open);
        self.query.refresh_at(now);
        let working = self.query.working_set();
        match focus.and_then(|v| self.entries.position_of(v, working)) {
            Some(row) => {
                self.nav
                    .set(row, self.entries.len(), |r| self.entries.is_navigable(r, working));
            }
            None => self
                .nav
                .reset(self.entries.len(), |r| self.entries.is_navigable(r, working)),
        }
        self.reveal_highlight();
        tracing::debug!(state = ?self.state, rows = self.entries.len(), "combo opened");
        true
    }

    /// Apply a close-type transition (`Commit` or `Dismiss`).
    ///
    /// Drops the highlight and the query. Returns `true` if it was open.
    pub fn close(&mut self, transition: ComboTransition, selected: &[SelectOption<V>]) -> bool {
        if !self.is_open() {
            return false;
        }
        self.state = self.state.apply(transition);
        self.nav.clear();
        self.scroll.scroll_top = 0;
        self.query.reset_query();
        self.rebuild(selected);
        tracing::debug!(transition = ?transition, "combo closed");
        true
    }

    /// Record a confirm that keeps the list open.
    pub fn toggle_transition(&mut self) {
        self.state = self.state.apply(ComboTransition::Toggle);
    }

    /// Replace the query text.
    pub fn set_query_at(&mut self, text: &str, now: Instant, selected: &[SelectOption<V>]) -> bool {
        if self.config.disabled || !self.query.set_query_at(text, now) {
            return false;
        }
        self.state = self.state.apply(ComboTransition::Query {
            empty: text.is_empty(),
        });
        self.rebuild(selected);
        let working = self.query.working_set();
        self.nav
            .reset(self.entries.len(), |r| self.entries.is_navigable(r, working));
        self.scroll.scroll_top = 0;
        tracing::trace!(query = text, rows = self.entries.len(), state = ?self.state, "query changed");
        true
    }

    /// Feed a key to the query editor.
    pub fn edit_query_at(
        &mut self,
        key: &KeyEvent,
        now: Instant,
        selected: &[SelectOption<V>],
    ) -> QueryEdit {
        let mut text = self.query.query().to_owned();
        match key.code {
            KeyCode::Char('u') if key.modifiers.contains(Modifiers::CTRL) => {
                if text.is_empty() {
                    return QueryEdit::Ignored;
                }
                text.clear();
            }
            KeyCode::Char(c) if !key.modifiers.intersects(Modifiers::CTRL | Modifiers::ALT) => {
                text.push(c);
            }
            KeyCode::Backspace => {
                let Some((cut, _)) = text.grapheme_indices(true).next_back() else {
                    return QueryEdit::BackspaceOnEmpty;
                };
                text.truncate(cut);
            }
            _ => return QueryEdit::Ignored,
        }
        if self.set_query_at(&text, now, selected) {
            QueryEdit::Changed
        } else {
            QueryEdit::Ignored
        }
    }

    /// Append pasted text to the query, line breaks removed.
    pub fn paste_at(&mut self, pasted: &str, now: Instant, selected: &[SelectOption<V>]) -> bool {
        let mut text = self.query.query().to_owned();
        text.extend(pasted.chars().filter(|c| !matches!(c, '\n' | '\r')));
        self.set_query_at(&text, now, selected)
    }

    /// Move the highlight.
    pub fn navigate(&mut self, command: NavCommand) -> bool {
        let from = self.nav.highlight().unwrap_or(0);
        let page = self
            .layout
            .rows_per_page(from, self.scroll.viewport_height);
        let working = self.query.working_set();
        let changed = self.nav.apply(command, self.entries.len(), page, |r| {
            self.entries.is_navigable(r, working)
        });
        if changed {
            self.reveal_highlight();
        }
        changed
    }

    /// Highlight a row under the pointer.
    pub fn hover(&mut self, row: usize) -> bool {
        let working = self.query.working_set();
        self.nav
            .set(row, self.entries.len(), |r| self.entries.is_navigable(r, working))
    }

    /// Row under an absolute pointer position, if over the open list.
    pub fn row_at(&self, x: u16, y: u16) -> Option<usize> {
        if !self.is_open() {
            return None;
        }
        let area = self.overlay.geometry().rect();
        if !area.contains(x, y) {
            return None;
        }
        let offset = self.scroll.scroll_top + u32::from(y - area.y);
        if offset >= self.layout.total_height() {
            return None;
        }
        self.layout.row_at_offset(offset)
    }

    /// Whether a pointer position is over the open list.
    pub fn list_contains(&self, x: u16, y: u16) -> bool {
        self.is_open() && self.overlay.geometry().rect().contains(x, y)
    }

    /// Hit-test a pointer position.
    pub fn pointer_target(&self, x: u16, y: u16) -> PointerTarget {
        if let Some(row) = self.row_at(x, y) {
            PointerTarget::Row(row)
        } else if self.list_contains(x, y) {
            PointerTarget::List
        } else if self.trigger.contains(x, y) {
            PointerTarget::Trigger
        } else {
            PointerTarget::Outside
        }
    }

    /// Scroll by whole base rows (positive = down).
    pub fn scroll_rows(&mut self, rows: i32) {
        let base = i32::from(self.config.row_metrics.base.max(1));
        self.scroll.scroll_by(rows.saturating_mul(base), &self.layout);
    }

    fn reveal_highlight(&mut self) {
        if let Some(row) = self.nav.highlight() {
            self.scroll.reveal(row, &self.layout);
        }
    }

    /// Replace the option source.
    pub fn set_source_at(
        &mut self,
        source: OptionSource<V>,
        now: Instant,
        selected: &[SelectOption<V>],
    ) {
        self.query.set_source_at(source, now);
        self.rebuild(selected);
        tracing::debug!(options = self.query.working_set().len(), "option source replaced");
    }

    /// Issue the pending async lookup if due.
    pub fn poll_fetch_at(&mut self, now: Instant) -> Option<FetchTicket<V>> {
        self.query.poll_fetch_at(now)
    }

    /// Time left before the pending lookup is due.
    pub fn time_until_fetch(&self, now: Instant) -> Option<Duration> {
        self.query.time_until_fetch(now)
    }

    /// Hand back a finished lookup.
    pub fn complete_fetch(
        &mut self,
        fetch: FetchResult<V>,
        selected: &[SelectOption<V>],
    ) -> FetchOutcome {
        let outcome = self.query.complete(fetch);
        match outcome {
            FetchOutcome::Applied => {
                self.rebuild(selected);
                if self.is_open() {
                    let working = self.query.working_set();
                    self.nav
                        .reset(self.entries.len(), |r| self.entries.is_navigable(r, working));
                }
                self.scroll.scroll_top = 0;
            }
            FetchOutcome::Failed => self.rebuild(selected),
            FetchOutcome::Stale => {}
        }
        outcome
    }

    /// Build the list view model; `None` while closed.
    pub fn list_view(
        &self,
        is_selected: impl Fn(&V) -> bool,
        select_all: Option<SelectAllState>,
    ) -> Option<ListView> {
        if !self.is_open() {
            return None;
        }
        let status = self.query.status();
        let list_status = if status.has_error {
            ListStatus::Error
        } else if self.entries.is_empty() && status.is_loading {
            ListStatus::Loading
        } else if self.entries.is_empty() {
            ListStatus::NoResults
        } else {
            ListStatus::Ready
        };

        let hide_rows = list_status == ListStatus::Error && !self.config.show_error_with_results;
        let window = self.scroll.window(&self.layout);
        let rows = if hide_rows {
            Vec::new()
        } else {
            window
                .rows
                .iter()
                .filter_map(|d| self.row_view(d.row, d, &is_selected, select_all))
                .collect()
        };

        Some(ListView {
            role: Role::Listbox,
            status: list_status,
            rows,
            row_count: self.entries.len(),
            total_height: window.total_height,
            scroll_top: self.scroll.scroll_top,
            geometry: self.overlay.geometry(),
        })
    }

    fn row_view(
        &self,
        row: usize,
        descriptor: &RowDescriptor,
        is_selected: &impl Fn(&V) -> bool,
        select_all: Option<SelectAllState>,
    ) -> Option<RowView> {
        let entry = self.entries.get(row)?;
        let prefix = self.config.id_prefix.as_str();
        let highlighted = self.nav.highlight() == Some(row);
        let base = RowView {
            id: String::new(),
            role: Role::Option,
            row,
            label: String::new(),
            description: None,
            group_header: None,
            offset: descriptor.offset,
            height: descriptor.height,
            highlighted,
            selected: false,
            select_all: None,
            ghost: false,
            matches: fuzzy::MatchPositions::new(),
        };

        if entry == Entry::SelectAll {
            let state = select_all.unwrap_or(SelectAllState::Unchecked);
            return Some(RowView {
                id: all_id(prefix),
                label: select_all_label(self.entries.concrete_count()),
                selected: state == SelectAllState::Checked,
                select_all: Some(state),
                ..base
            });
        }

        let option = self.entries.option(row, self.query.working_set())?;
        let label = option.display_label().into_owned();
        let query = self.query.query();
        let matches = match entry {
            Entry::Option(_) if !query.is_empty() => fuzzy::match_positions(&label, query),
            _ => fuzzy::MatchPositions::new(),
        };
        let group_header = descriptor.group_header_id.and_then(|n| {
            option.group.as_ref().map(|g| GroupHeaderView {
                role: Role::GroupHeader,
                id: group_id(prefix, n),
                label: g.clone(),
            })
        });
        Some(RowView {
            id: if entry == Entry::Custom {
                custom_id(prefix)
            } else {
                option_id(prefix, &option.value)
            },
            role: if option.is_selectable() {
                Role::Option
            } else {
                Role::Presentation
            },
            label,
            description: option.description.clone().filter(|d| !d.is_empty()),
            group_header,
            selected: entry != Entry::Custom && is_selected(&option.value),
            ghost: matches!(entry, Entry::Ghost(_)),
            matches,
            ..base
        })
    }
}

fn select_all_label(count: usize) -> String {
    format!("Select all ({count})")
}

impl<V: OptionValue> std::fmt::Debug for Dropdown<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dropdown")
            .field("state", &self.state)
            .field("query", &self.query)
            .field("rows", &self.entries.len())
            .field("highlight", &self.nav.highlight())
            .field("scroll_top", &self.scroll.scroll_top)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::string_options;

    fn fruit() -> Dropdown<String> {
        let options = string_options([
            ("Apple", "apple"),
            ("Banana", "banana"),
            ("Carrot", "carrot"),
        ]);
        Dropdown::new(options.into(), ComboBoxConfig::default(), false)
    }

    #[test]
    fn starts_closed_with_all_rows() {
        let d = fruit();
        assert!(!d.is_open());
        assert_eq!(d.entries().len(), 3);
        assert_eq!(d.layout().total_height(), 3);
        assert!(d.list_view(|_| false, None).is_none());
    }

    #[test]
    fn open_highlights_focus_value() {
        let mut d = fruit();
        assert!(d.open_at(Instant::now(), Some(&"carrot".to_string())));
        assert_eq!(d.highlight(), Some(2));
        assert_eq!(d.active_descendant().as_deref(), Some("combobox-option-carrot"));
        assert!(!d.open_at(Instant::now(), None));
    }

    #[test]
    fn typing_filters_and_opens() {
        let mut d = fruit();
        let now = Instant::now();
        let key = KeyEvent::new(KeyCode::Char('n'));
        assert_eq!(d.edit_query_at(&key, now, &[]), QueryEdit::Changed);
        assert_eq!(d.state(), ComboState::Filtering);
        let view = d.list_view(|_| false, None).expect("open");
        assert_eq!(view.labels(), vec!["Banana"]);
        assert_eq!(view.rows[0].matches.as_slice(), &[2]);
    }

    #[test]
    fn backspace_removes_grapheme() {
        let mut d = fruit();
        let now = Instant::now();
        d.set_query_at("ae\u{301}", now, &[]);
        let bs = KeyEvent::new(KeyCode::Backspace);
        assert_eq!(d.edit_query_at(&bs, now, &[]), QueryEdit::Changed);
        assert_eq!(d.query(), "a");
        assert_eq!(d.edit_query_at(&bs, now, &[]), QueryEdit::Changed);
        assert_eq!(d.state(), ComboState::Browsing);
        assert_eq!(d.edit_query_at(&bs, now, &[]), QueryEdit::BackspaceOnEmpty);
    }

    #[test]
    fn ctrl_u_clears_and_paste_strips_newlines() {
        let mut d = fruit();
        let now = Instant::now();
        assert!(d.paste_at("car\nrot", now, &[]));
        assert_eq!(d.query(), "carrot");
        let ctrl_u = KeyEvent::new(KeyCode::Char('u')).with_modifiers(Modifiers::CTRL);
        assert_eq!(d.edit_query_at(&ctrl_u, now, &[]), QueryEdit::Changed);
        assert_eq!(d.query(), "");
    }

    #[test]
    fn close_resets_query() {
        let mut d = fruit();
        let now = Instant::now();
        d.set_query_at("ban", now, &[]);
        assert!(d.close(ComboTransition::Dismiss, &[]));
        assert_eq!(d.query(), "");
        assert_eq!(d.entries().len(), 3);
        assert_eq!(d.highlight(), None);
        assert!(!d.close(ComboTransition::Dismiss, &[]));
    }

    #[test]
    fn pointer_maps_to_rows() {
        let mut d = fruit();
        d.set_viewport(Size::new(40, 20));
        d.set_trigger_area(Rect::new(5, 2, 12, 1));
        d.open_at(Instant::now(), None);
        let g = d.geometry();
        assert_eq!(g.top, 3);
        assert_eq!(d.row_at(6, 3), Some(0));
        assert_eq!(d.row_at(6, 5), Some(2));
        assert_eq!(d.row_at(6, 6), None);
        assert_eq!(d.row_at(0, 3), None);
        assert_eq!(d.pointer_target(6, 5), PointerTarget::Row(2));
        assert_eq!(d.pointer_target(6, 2), PointerTarget::Trigger);
        assert_eq!(d.pointer_target(30, 15), PointerTarget::Outside);
    }

    #[test]
    fn disabled_never_opens() {
        let mut d = Dropdown::new(
            string_options([("A", "a")]).into(),
            ComboBoxConfig::default().with_disabled(true),
            false,
        );
        assert!(!d.open_at(Instant::now(), None));
        assert!(!d.set_query_at("a", Instant::now(), &[]));
    }

    #[test]
    fn status_rows() {
        let mut d = fruit();
        d.set_query_at("zzz", Instant::now(), &[]);
        let view = d.list_view(|_| false, None).expect("open");
        assert_eq!(view.status, ListStatus::NoResults);
        assert!(view.rows.is_empty());
    }
}

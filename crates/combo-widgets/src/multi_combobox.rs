#![forbid(unsafe_code)]

//! Multi-select combo box.
//!
//! Shares the drop-down engine with [`ComboBox`](crate::combobox::ComboBox)
//! but confirming a row toggles its membership instead of closing the list,
//! and the query survives the toggle so several matches can be picked in a
//! row. Chosen values are shown as tokens in the trigger.
//!
//! Backspace on an empty query removes the most recently added token;
//! [`MultiComboBox::remove`] removes any token without touching the query.
//!
//! With `enable_all_option`, a "select all" row heads the list whenever more
//! than one concrete option is shown. Its checkbox state is derived from
//! the selection, and toggling it adds or removes every option currently
//! shown (the filtered set, not the whole source).

use std::time::{Duration, Instant};

use combo_core::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use combo_core::geometry::{Rect, Size};

use crate::config::ComboBoxConfig;
use crate::dropdown::{Dropdown, PointerTarget, QueryEdit};
use crate::entries::Entry;
use crate::navigation::NavCommand;
use crate::option::{OptionValue, SelectOption};
use crate::query::{FetchOutcome, FetchResult, FetchTicket, QueryStatus};
use crate::selection::{
    ComboState, ComboTransition, MultiSelection, MultiValue, SelectAllState,
};
use crate::source::OptionSource;
use crate::view::{ComboView, Role, TokenView, TriggerView, all_id, option_id};

/// Token text shown while every option is chosen through the sentinel.
const ALL_TOKEN_LABEL: &str = "All";

/// What a multi-select combo box reports to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiAction<V> {
    /// The chosen set changed; carries the full new selection in order.
    Change(Vec<SelectOption<V>>),
    /// The list was closed.
    Dismiss,
}

/// Searchable multi-select drop-down.
pub struct MultiComboBox<V> {
    dropdown: Dropdown<V>,
    selection: MultiSelection<V>,
}

impl<V: OptionValue> MultiComboBox<V> {
    /// Create a multi-select combo box.
    pub fn new(source: impl Into<OptionSource<V>>, config: ComboBoxConfig) -> Self {
        Self {
            dropdown: Dropdown::new(source.into(), config, true),
            selection: MultiSelection::default(),
        }
    }

    /// Set the initial value (builder).
    #[must_use]
    pub fn with_value(mut self, value: impl Into<MultiValue<V>>) -> Self {
        self.set_value(value.into());
        self
    }

    /// The chosen value, `All` when the sentinel is held.
    pub fn value(&self) -> MultiValue<V> {
        self.selection.to_value()
    }

    /// Explicitly chosen options in the order they were added.
    pub fn chosen(&self) -> &[SelectOption<V>] {
        self.selection.chosen()
    }

    /// Whether `value` is chosen.
    pub fn contains(&self, value: &V) -> bool {
        self.selection.contains(value)
    }

    /// Replace the value from the caller side. Does not emit an action.
    pub fn set_value(&mut self, value: MultiValue<V>) {
        self.selection = MultiSelection::from_value(value);
        self.rebuild();
    }

    /// Remove one chosen value (token remove control). The query is kept.
    pub fn remove(&mut self, value: &V) -> Option<MultiAction<V>> {
        if self.dropdown.config().disabled {
            return None;
        }
        let working = self.dropdown.working_set();
        if self.selection.is_all() {
            // Only a value the sentinel stands for can be removed from it.
            if !working.iter().any(|o| o.is_selectable() && &o.value == value) {
                return None;
            }
            self.selection.materialize(working);
        }
        self.selection.remove(value)?;
        self.rebuild();
        tracing::debug!(widget = "MultiComboBox", value = %value, "token removed");
        Some(self.change())
    }

    /// Remove every chosen value if the combo box is clearable.
    pub fn clear(&mut self) -> Option<MultiAction<V>> {
        let config = self.dropdown.config();
        if !config.clearable || config.disabled || !self.selection.clear() {
            return None;
        }
        self.rebuild();
        tracing::debug!(widget = "MultiComboBox", "selection cleared");
        Some(MultiAction::Change(Vec::new()))
    }

    // --- Options ---

    /// Replace the options with a static list.
    pub fn set_options(&mut self, options: Vec<SelectOption<V>>) {
        self.set_source_at(OptionSource::Static(options), Instant::now());
    }

    /// Replace the option source. Chosen values absent from the new set
    /// stay chosen and show up as ghosts.
    pub fn set_source_at(&mut self, source: OptionSource<V>, now: Instant) {
        self.dropdown
            .set_source_at(source, now, self.selection.chosen());
    }

    /// Issue the pending async lookup if its debounce has elapsed.
    pub fn poll_fetch_at(&mut self, now: Instant) -> Option<FetchTicket<V>> {
        self.dropdown.poll_fetch_at(now)
    }

    /// Time until the pending async lookup is due.
    pub fn time_until_fetch(&self, now: Instant) -> Option<Duration> {
        self.dropdown.time_until_fetch(now)
    }

    /// Hand back a finished async lookup.
    pub fn complete_fetch(&mut self, fetch: FetchResult<V>) -> FetchOutcome {
        self.dropdown.complete_fetch(fetch, self.selection.chosen())
    }

    // --- State ---

    /// Open state.
    pub fn state(&self) -> ComboState {
        self.dropdown.state()
    }

    /// Whether the list is shown.
    pub fn is_open(&self) -> bool {
        self.dropdown.is_open()
    }

    /// Current query.
    pub fn query(&self) -> &str {
        self.dropdown.query()
    }

    /// Option source status.
    pub fn status(&self) -> QueryStatus {
        self.dropdown.status()
    }

    /// Shared drop-down engine.
    pub fn dropdown(&self) -> &Dropdown<V> {
        &self.dropdown
    }

    /// Report the trigger's bounds.
    pub fn set_trigger_area(&mut self, area: Rect) {
        self.dropdown.set_trigger_area(area);
    }

    /// Report the host viewport size.
    pub fn set_viewport(&mut self, viewport: Size) {
        self.dropdown.set_viewport(viewport);
    }

    /// Open the list with the first row highlighted.
    pub fn open_at(&mut self, now: Instant) -> bool {
        self.dropdown.open_at(now, None)
    }

    /// Close the list.
    pub fn dismiss(&mut self) -> Option<MultiAction<V>> {
        self.dropdown
            .close(ComboTransition::Dismiss, self.selection.chosen())
            .then_some(MultiAction::Dismiss)
    }

    /// Derived state of the "select all" row, if it is shown.
    pub fn select_all_state(&self) -> Option<SelectAllState> {
        let entries = self.dropdown.entries();
        if entries.get(0) != Some(Entry::SelectAll) {
            return None;
        }
        let working = self.dropdown.working_set();
        Some(self.selection.select_all_state(entries.options(working)))
    }

    // --- Events ---

    /// Handle an input event using the wall clock.
    pub fn handle_event(&mut self, event: &Event) -> Option<MultiAction<V>> {
        self.handle_event_at(event, Instant::now())
    }

    /// Handle an input event at `now`.
    pub fn handle_event_at(&mut self, event: &Event, now: Instant) -> Option<MultiAction<V>> {
        let _span = tracing::debug_span!("widget_event", widget = "MultiComboBox").entered();
        if self.dropdown.config().disabled {
            return None;
        }

        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key, now),
            Event::Mouse(mouse) => self.handle_mouse(mouse, now),
            Event::Paste(paste) => {
                self.dropdown
                    .paste_at(&paste.text, now, self.selection.chosen());
                None
            }
            Event::Focus(true) => {
                self.open_at(now);
                None
            }
            Event::Focus(false) => self.dismiss(),
            Event::Resize { width, height } => {
                self.set_viewport(Size::new(*width, *height));
                None
            }
            Event::Key(_) => None,
        }
    }

    fn handle_key(&mut self, key: &KeyEvent, now: Instant) -> Option<MultiAction<V>> {
        if matches!(key.code, KeyCode::Tab | KeyCode::BackTab) {
            return self.dismiss();
        }

        if let Some(command) = NavCommand::from_key(key) {
            if !self.is_open() {
                if matches!(
                    command,
                    NavCommand::Next | NavCommand::Prev | NavCommand::Confirm
                ) {
                    self.open_at(now);
                }
                return None;
            }
            return match command {
                NavCommand::Confirm => self.confirm(),
                NavCommand::Dismiss => self.dismiss(),
                movement => {
                    self.dropdown.navigate(movement);
                    None
                }
            };
        }

        match self.dropdown.edit_query_at(key, now, self.selection.chosen()) {
            QueryEdit::BackspaceOnEmpty => self.remove_last(),
            QueryEdit::Changed | QueryEdit::Ignored => None,
        }
    }

    fn handle_mouse(&mut self, mouse: &MouseEvent, now: Instant) -> Option<MultiAction<V>> {
        let (x, y) = mouse.position();
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => match self.dropdown.pointer_target(x, y) {
                PointerTarget::Row(row) => {
                    self.dropdown.hover(row);
                    if self.dropdown.highlight() == Some(row) {
                        self.confirm()
                    } else {
                        None
                    }
                }
                PointerTarget::Trigger if self.is_open() => self.dismiss(),
                PointerTarget::Trigger => {
                    self.open_at(now);
                    None
                }
                PointerTarget::List => None,
                PointerTarget::Outside => self.dismiss(),
            },
            MouseEventKind::Moved => {
                if let Some(row) = self.dropdown.row_at(x, y) {
                    self.dropdown.hover(row);
                }
                None
            }
            MouseEventKind::ScrollDown if self.is_open() => {
                self.dropdown.scroll_rows(1);
                None
            }
            MouseEventKind::ScrollUp if self.is_open() => {
                self.dropdown.scroll_rows(-1);
                None
            }
            _ => None,
        }
    }

    /// Toggle the highlighted row. The list stays open.
    pub fn confirm(&mut self) -> Option<MultiAction<V>> {
        let (entry, option) = self.dropdown.highlighted()?;
        let option = option.cloned();
        let working = self.dropdown.working_set();
        self.selection.materialize(working);

        let focus = match (entry, option) {
            (Entry::SelectAll, _) => {
                let changed = self
                    .selection
                    .toggle_all(self.dropdown.entries().options(working));
                if !changed {
                    return None;
                }
                tracing::debug!(widget = "MultiComboBox", chosen = self.selection.len(), "select all toggled");
                None
            }
            (_, Some(option)) if option.is_selectable() => {
                let added = self.selection.toggle(option.clone());
                tracing::debug!(widget = "MultiComboBox", value = %option.value, added, "value toggled");
                Some(option.value)
            }
            (_, option) => {
                tracing::trace!(widget = "MultiComboBox", value = ?option.map(|o| o.value), "ignored confirm on info row");
                return None;
            }
        };

        self.dropdown.toggle_transition();
        let highlight = self.dropdown.highlight();
        self.rebuild();
        // Ghost rows come and go with the selection; follow the value.
        let working = self.dropdown.working_set();
        match focus.and_then(|v| self.dropdown.entries().position_of(&v, working)) {
            Some(row) => {
                self.dropdown.hover(row);
            }
            None => {
                if let Some(row) = highlight {
                    self.dropdown.hover(row);
                }
            }
        }
        Some(self.change())
    }

    fn remove_last(&mut self) -> Option<MultiAction<V>> {
        self.selection.materialize(self.dropdown.working_set());
        let removed = self.selection.pop_last()?;
        self.rebuild();
        tracing::debug!(widget = "MultiComboBox", value = %removed.value, "last token removed");
        Some(self.change())
    }

    fn change(&self) -> MultiAction<V> {
        MultiAction::Change(self.selection.chosen().to_vec())
    }

    fn rebuild(&mut self) {
        self.dropdown.rebuild(self.selection.chosen());
    }

    // --- View ---

    fn tokens(&self) -> Vec<TokenView> {
        let prefix = self.dropdown.config().id_prefix.as_str();
        if self.selection.is_all() {
            return vec![TokenView {
                label: ALL_TOKEN_LABEL.to_owned(),
                id: all_id(prefix),
                ghost: false,
            }];
        }
        let entries = self.dropdown.entries();
        self.selection
            .chosen()
            .iter()
            .map(|o| TokenView {
                label: o.display_label().into_owned(),
                id: option_id(prefix, &o.value),
                ghost: entries.is_ghost(&o.value),
            })
            .collect()
    }

    /// Build the view model for the current frame.
    pub fn view(&self) -> ComboView {
        let config = self.dropdown.config();
        let trigger = TriggerView {
            role: Role::Combobox,
            expanded: self.is_open(),
            active_descendant: self.dropdown.active_descendant(),
            text: self.dropdown.query().to_owned(),
            placeholder: config.placeholder.clone(),
            tokens: self.tokens(),
            show_clear: config.clearable && !config.disabled && !self.selection.is_empty(),
            disabled: config.disabled,
            invalid: config.invalid,
            loading: config.loading || self.dropdown.status().is_loading,
        };
        ComboView {
            trigger,
            list: self
                .dropdown
                .list_view(|v| self.selection.contains(v), self.select_all_state()),
        }
    }
}

impl<V: OptionValue> std::fmt::Debug for MultiComboBox<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiComboBox")
            .field("dropdown", &self.dropdown)
            .field("selection", &self.selection)
            .finish()
    }
}

#![forbid(unsafe_code)]

//! Single-select combo box.
//!
//! A searchable drop-down that commits one value at a time. The widget is
//! controlled: it reports a [`ComboAction::Change`] and updates its own
//! copy of the value, but the caller owns the value and may override it
//! with [`ComboBox::set_value`] at any time.
//!
//! # Keys
//!
//! | Key | Closed | Open |
//! |-----|--------|------|
//! | Up / Down / Enter | open | move / confirm |
//! | PageUp / PageDown / Home / End | - | move |
//! | Escape | - | close without committing |
//! | printable, Backspace, Ctrl+U, paste | edit query (opens) | edit query |
//! | Tab | - | close without committing |
//!
//! # Pointer
//!
//! Clicking the trigger toggles the list; clicking a row is the same as
//! highlighting it and pressing Enter; clicking elsewhere closes the list.
//! Hover moves the highlight and the wheel scrolls.
//!
//! # Example
//!
//! ```
//! use combo_core::event::{Event, KeyCode};
//! use combo_widgets::combobox::{ComboAction, ComboBox};
//! use combo_widgets::config::ComboBoxConfig;
//! use combo_widgets::option::string_options;
//!
//! let options = string_options([("Apple", "apple"), ("Carrot", "carrot")]);
//! let mut combo = ComboBox::new(options, ComboBoxConfig::default());
//!
//! combo.handle_event(&Event::key(KeyCode::Char('c')));
//! let action = combo.handle_event(&Event::key(KeyCode::Enter));
//! match action {
//!     Some(ComboAction::Change(Some(option))) => assert_eq!(option.value, "carrot"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

use std::time::{Duration, Instant};

use combo_core::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use combo_core::geometry::{Rect, Size};

use crate::config::ComboBoxConfig;
use crate::dropdown::{Dropdown, PointerTarget};
use crate::entries::Entry;
use crate::navigation::NavCommand;
use crate::option::{OptionValue, SelectOption};
use crate::query::{FetchOutcome, FetchResult, FetchTicket, QueryStatus};
use crate::selection::{ComboState, ComboTransition, SingleSelection};
use crate::source::OptionSource;
use crate::view::{ComboView, Role, TriggerView};

/// What a single-select combo box reports to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComboAction<V> {
    /// A value was committed (`Some`) or cleared (`None`).
    Change(Option<SelectOption<V>>),
    /// The list was closed without committing.
    Dismiss,
}

/// Searchable single-select drop-down.
///
/// # Invariants
///
/// 1. While closed there is no highlight and the query is empty.
/// 2. Confirming an info-only row changes nothing.
/// 3. A value absent from the options is kept and listed as a ghost row.
pub struct ComboBox<V> {
    dropdown: Dropdown<V>,
    selection: SingleSelection<V>,
}

impl<V: OptionValue> ComboBox<V> {
    /// Create a combo box over a static list or an async source.
    pub fn new(source: impl Into<OptionSource<V>>, config: ComboBoxConfig) -> Self {
        Self {
            dropdown: Dropdown::new(source.into(), config, false),
            selection: SingleSelection::default(),
        }
    }

    /// Set the initial value (builder).
    #[must_use]
    pub fn with_value(mut self, value: Option<SelectOption<V>>) -> Self {
        self.set_value(value);
        self
    }

    // --- Value ---

    /// The committed option.
    pub fn value(&self) -> Option<&SelectOption<V>> {
        self.selection.active()
    }

    /// Replace the value from the caller side. Does not emit an action.
    pub fn set_value(&mut self, value: Option<SelectOption<V>>) {
        if self.selection.set(value) {
            self.rebuild();
        }
    }

    /// Replace the value by identity, borrowing label and description from
    /// the current options when the value is listed there.
    pub fn set_value_by_key(&mut self, value: Option<V>) {
        let option = value.map(|v| {
            self.dropdown
                .working_set()
                .iter()
                .find(|o| o.value == v)
                .cloned()
                .unwrap_or_else(|| SelectOption::new(v))
        });
        self.set_value(option);
    }

    /// Clear the value if the combo box is clearable.
    pub fn clear(&mut self) -> Option<ComboAction<V>> {
        if !self.dropdown.config().clearable || self.dropdown.config().disabled {
            return None;
        }
        if !self.selection.clear() {
            return None;
        }
        self.dropdown.close(ComboTransition::Dismiss, &[]);
        self.rebuild();
        tracing::debug!(widget = "ComboBox", "value cleared");
        Some(ComboAction::Change(None))
    }

    // --- Options ---

    /// Replace the options with a static list.
    pub fn set_options(&mut self, options: Vec<SelectOption<V>>) {
        self.set_source_at(OptionSource::Static(options), Instant::now());
    }

    /// Replace the option source.
    pub fn set_source_at(&mut self, source: OptionSource<V>, now: Instant) {
        let selected = self.selection.active().cloned();
        self.dropdown.set_source_at(source, now, selected.as_slice());
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
        let selected = self.selection.active().cloned();
        self.dropdown.complete_fetch(fetch, selected.as_slice())
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

    /// Open the list.
    pub fn open_at(&mut self, now: Instant) -> bool {
        let focus = self.selection.value().cloned();
        self.dropdown.open_at(now, focus.as_ref())
    }

    /// Close the list without committing.
    pub fn dismiss(&mut self) -> Option<ComboAction<V>> {
        let selected = self.selection.active().cloned();
        self.dropdown
            .close(ComboTransition::Dismiss, selected.as_slice())
            .then_some(ComboAction::Dismiss)
    }

    // --- Events ---

    /// Handle an input event using the wall clock.
    pub fn handle_event(&mut self, event: &Event) -> Option<ComboAction<V>> {
        self.handle_event_at(event, Instant::now())
    }

    /// Handle an input event at `now`.
    ///
    /// Returns an action when the value changed or the list was dismissed.
    pub fn handle_event_at(&mut self, event: &Event, now: Instant) -> Option<ComboAction<V>> {
        let _span = tracing::debug_span!("widget_event", widget = "ComboBox").entered();
        if self.dropdown.config().disabled {
            return None;
        }

        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key, now),
            Event::Mouse(mouse) => self.handle_mouse(mouse, now),
            Event::Paste(paste) => {
                let selected = self.selection.active().cloned();
                self.dropdown.paste_at(&paste.text, now, selected.as_slice());
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

    fn handle_key(&mut self, key: &KeyEvent, now: Instant) -> Option<ComboAction<V>> {
        if key.code == KeyCode::Tab || key.code == KeyCode::BackTab {
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

        let selected = self.selection.active().cloned();
        self.dropdown.edit_query_at(key, now, selected.as_slice());
        None
    }

    fn handle_mouse(&mut self, mouse: &MouseEvent, now: Instant) -> Option<ComboAction<V>> {
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

    /// Commit the highlighted row.
    pub fn confirm(&mut self) -> Option<ComboAction<V>> {
        let option = match self.dropdown.highlighted()? {
            (Entry::SelectAll, _) | (_, None) => return None,
            (_, Some(option)) => option.clone(),
        };
        if !option.is_selectable() {
            tracing::trace!(widget = "ComboBox", value = %option.value, "ignored confirm on info row");
            return None;
        }

        self.selection.set(Some(option.clone()));
        self.dropdown
            .close(ComboTransition::Commit, std::slice::from_ref(&option));
        tracing::debug!(widget = "ComboBox", value = %option.value, "value committed");
        Some(ComboAction::Change(Some(option)))
    }

    fn rebuild(&mut self) {
        let selected = self.selection.active().cloned();
        self.dropdown.rebuild(selected.as_slice());
    }

    // --- View ---

    /// Build the view model for the current frame.
    pub fn view(&self) -> ComboView {
        let config = self.dropdown.config();
        let open = self.is_open();
        let selected_label = self
            .selection
            .active()
            .map(|o| o.display_label().into_owned());

        let (text, placeholder) = if open {
            (
                self.dropdown.query().to_owned(),
                selected_label.or_else(|| config.placeholder.clone()),
            )
        } else {
            (selected_label.unwrap_or_default(), config.placeholder.clone())
        };

        let trigger = TriggerView {
            role: Role::Combobox,
            expanded: open,
            active_descendant: self.dropdown.active_descendant(),
            text,
            placeholder,
            tokens: Vec::new(),
            show_clear: config.clearable && !config.disabled && self.selection.active().is_some(),
            disabled: config.disabled,
            invalid: config.invalid,
            loading: config.loading || self.dropdown.status().is_loading,
        };

        ComboView {
            trigger,
            list: self
                .dropdown
                .list_view(|v| self.selection.is_selected(v), None),
        }
    }
}

impl<V: OptionValue> std::fmt::Debug for ComboBox<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComboBox")
            .field("dropdown", &self.dropdown)
            .field("selection", &self.selection)
            .finish()
    }
}

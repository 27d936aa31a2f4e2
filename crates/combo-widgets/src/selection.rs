#![forbid(unsafe_code)]

//! Selection state machines.
//!
//! # Open state
//!
//! | From      | Transition              | To        |
//! |-----------|-------------------------|-----------|
//! | Closed    | `Open`                  | Browsing  |
//! | Closed    | `Query` (non-empty)     | Filtering |
//! | Browsing  | `Query` (non-empty)     | Filtering |
//! | Filtering | `Query` (empty)         | Browsing  |
//! | any open  | `Commit`                | Closed    |
//! | any open  | `Toggle`                | unchanged |
//! | any       | `Dismiss`               | Closed    |
//!
//! Single-select confirms with `Commit`; multi-select confirms with
//! `Toggle`, so its list stays open across confirmations.
//!
//! # Values
//!
//! [`SingleSelection`] holds at most one option. [`MultiSelection`] holds
//! an ordered, value-deduplicated list, or the "all" sentinel meaning every
//! concrete option is chosen. Neither drops a value just because the
//! current option set does not contain it.

use std::collections::HashSet;

use crate::option::{OptionValue, SelectOption};

/// Open/closed state of a combo box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComboState {
    /// List hidden.
    #[default]
    Closed,
    /// List shown, no query typed.
    Browsing,
    /// List shown, filtered by a non-empty query.
    Filtering,
}

/// Input to the [`ComboState`] machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboTransition {
    /// Focus, click, or arrow key on the trigger.
    Open,
    /// The query text changed; `empty` is whether it is now empty.
    Query {
        /// The new query is empty.
        empty: bool,
    },
    /// A value was confirmed in single-select mode.
    Commit,
    /// A value was toggled in multi-select mode.
    Toggle,
    /// Escape or blur.
    Dismiss,
}

impl ComboState {
    /// Whether the list is shown.
    #[inline]
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Closed)
    }

    /// Apply a transition.
    pub const fn apply(self, transition: ComboTransition) -> Self {
        match (self, transition) {
            (Self::Closed, ComboTransition::Open) => Self::Browsing,
            (_, ComboTransition::Query { empty: true }) if self.is_open() => Self::Browsing,
            (_, ComboTransition::Query { empty: true }) => Self::Closed,
            (_, ComboTransition::Query { empty: false }) => Self::Filtering,
            (_, ComboTransition::Commit | ComboTransition::Dismiss) => Self::Closed,
            (state, ComboTransition::Open | ComboTransition::Toggle) => state,
        }
    }
}

/// The one active value of a single-select combo box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleSelection<V> {
    active: Option<SelectOption<V>>,
}

impl<V> Default for SingleSelection<V> {
    fn default() -> Self {
        Self { active: None }
    }
}

impl<V: OptionValue> SingleSelection<V> {
    /// Create with an initial value.
    pub fn new(active: Option<SelectOption<V>>) -> Self {
        Self { active }
    }

    /// The active option.
    pub fn active(&self) -> Option<&SelectOption<V>> {
        self.active.as_ref()
    }

    /// The active value.
    pub fn value(&self) -> Option<&V> {
        self.active.as_ref().map(|o| &o.value)
    }

    /// Whether `value` is the active one.
    pub fn is_selected(&self, value: &V) -> bool {
        self.value() == Some(value)
    }

    /// Replace the active option. Returns `true` if the value changed.
    pub fn set(&mut self, option: Option<SelectOption<V>>) -> bool {
        let changed = self.value() != option.as_ref().map(|o| &o.value);
        self.active = option;
        changed
    }

    /// Clear the active option. Returns `true` if there was one.
    pub fn clear(&mut self) -> bool {
        self.active.take().is_some()
    }
}

/// Caller-facing multi-select value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiValue<V> {
    /// Every concrete option is chosen.
    All,
    /// An explicit list.
    Options(Vec<SelectOption<V>>),
}

impl<V> Default for MultiValue<V> {
    fn default() -> Self {
        Self::Options(Vec::new())
    }
}

impl<V: OptionValue> MultiValue<V> {
    /// Explicit list of bare values; labels fall back to the values.
    pub fn values(values: impl IntoIterator<Item = V>) -> Self {
        Self::Options(values.into_iter().map(SelectOption::new).collect())
    }
}

impl<V> From<Vec<SelectOption<V>>> for MultiValue<V> {
    fn from(options: Vec<SelectOption<V>>) -> Self {
        Self::Options(options)
    }
}

/// Derived state of the "select all" row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllState {
    /// No concrete option chosen.
    Unchecked,
    /// Some but not all concrete options chosen.
    Indeterminate,
    /// Every concrete option chosen.
    Checked,
}

/// Ordered, deduplicated set of chosen options.
#[derive(Debug, Clone)]
pub struct MultiSelection<V> {
    chosen: Vec<SelectOption<V>>,
    values: HashSet<V>,
    all: bool,
}

impl<V> Default for MultiSelection<V> {
    fn default() -> Self {
        Self {
            chosen: Vec::new(),
            values: HashSet::new(),
            all: false,
        }
    }
}

impl<V: OptionValue> MultiSelection<V> {
    /// Build from a caller value, dropping duplicate values.
    pub fn from_value(value: MultiValue<V>) -> Self {
        let mut selection = Self::default();
        match value {
            MultiValue::All => selection.all = true,
            MultiValue::Options(options) => {
                for option in options {
                    selection.insert(option);
                }
            }
        }
        selection
    }

    /// The caller-facing value.
    pub fn to_value(&self) -> MultiValue<V> {
        if self.all {
            MultiValue::All
        } else {
            MultiValue::Options(self.chosen.clone())
        }
    }

    /// Chosen options in the order they were added.
    ///
    /// Empty while the "all" sentinel is held; see
    /// [`materialize`](Self::materialize).
    pub fn chosen(&self) -> &[SelectOption<V>] {
        &self.chosen
    }

    /// Whether the "all" sentinel is held.
    pub fn is_all(&self) -> bool {
        self.all
    }

    /// Number of explicitly chosen options.
    pub fn len(&self) -> usize {
        self.chosen.len()
    }

    /// Whether nothing is chosen.
    pub fn is_empty(&self) -> bool {
        !self.all && self.chosen.is_empty()
    }

    /// Whether `value` is chosen.
    pub fn contains(&self, value: &V) -> bool {
        self.all || self.values.contains(value)
    }

    /// Replace the "all" sentinel with the selectable options of `concrete`.
    pub fn materialize(&mut self, concrete: &[SelectOption<V>]) {
        if !self.all {
            return;
        }
        self.all = false;
        for option in concrete.iter().filter(|o| o.is_selectable()) {
            self.insert(option.clone());
        }
    }

    /// Add if absent, remove if present. Returns `true` if it was added.
    pub fn toggle(&mut self, option: SelectOption<V>) -> bool {
        if self.values.contains(&option.value) {
            self.remove(&option.value);
            false
        } else {
            self.insert(option)
        }
    }

    /// Add an option; returns `false` if its value was already chosen.
    pub fn insert(&mut self, option: SelectOption<V>) -> bool {
        if !self.values.insert(option.value.clone()) {
            return false;
        }
        self.chosen.push(option);
        true
    }

    /// Remove by value, keeping the order of the rest.
    pub fn remove(&mut self, value: &V) -> Option<SelectOption<V>> {
        if !self.values.remove(value) {
            return None;
        }
        let pos = self.chosen.iter().position(|o| &o.value == value)?;
        Some(self.chosen.remove(pos))
    }

    /// Remove the most recently added option.
    pub fn pop_last(&mut self) -> Option<SelectOption<V>> {
        let last = self.chosen.pop()?;
        self.values.remove(&last.value);
        Some(last)
    }

    /// Remove everything, sentinel included. Returns `true` if anything was
    /// chosen.
    pub fn clear(&mut self) -> bool {
        let had = !self.is_empty();
        self.all = false;
        self.chosen.clear();
        self.values.clear();
        had
    }

    /// State of the "select all" row over `concrete` options.
    pub fn select_all_state<'a>(
        &self,
        concrete: impl IntoIterator<Item = &'a SelectOption<V>>,
    ) -> SelectAllState {
        if self.all {
            return SelectAllState::Checked;
        }
        let (mut total, mut chosen) = (0usize, 0usize);
        for option in concrete.into_iter().filter(|o| o.is_selectable()) {
            total += 1;
            if self.values.contains(&option.value) {
                chosen += 1;
            }
        }
        match chosen {
            0 => SelectAllState::Unchecked,
            n if n == total => SelectAllState::Checked,
            _ => SelectAllState::Indeterminate,
        }
    }

    /// Apply the "select all" row to `concrete` options.
    ///
    /// Removes them all if every one is chosen, otherwise adds the missing
    /// ones. Returns `true` if the selection changed.
    pub fn toggle_all<'a>(
        &mut self,
        concrete: impl IntoIterator<Item = &'a SelectOption<V>> + Clone,
    ) -> bool {
        match self.select_all_state(concrete.clone()) {
            SelectAllState::Checked => {
                let before = self.chosen.len();
                for option in concrete {
                    self.values.remove(&option.value);
                }
                let values = &self.values;
                self.chosen.retain(|o| values.contains(&o.value));
                before != self.chosen.len()
            }
            SelectAllState::Unchecked | SelectAllState::Indeterminate => {
                let mut changed = false;
                for option in concrete.into_iter().filter(|o| o.is_selectable()) {
                    changed |= self.insert(option.clone());
                }
                changed
            }
        }
    }
}

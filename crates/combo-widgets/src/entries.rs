#![forbid(unsafe_code)]

//! The rendered row sequence.
//!
//! An [`EntryList`] is the filtered view plus the synthetic rows a combo
//! box adds on top of it, in display order:
//!
//! 1. "Select all" (multi-select, when more than one concrete option is
//!    visible)
//! 2. The custom-value row (when enabled and the query is not exactly an
//!    existing value)
//! 3. Ghost rows: selected values absent from the working set (empty query
//!    only)
//! 4. Filtered options, best match first
//!
//! Entries store indices, not options, so the list is cheap to rebuild on
//! every query change.

use std::collections::HashSet;

use crate::option::{OptionValue, SelectOption};
use crate::virtualized::RowShape;

/// One rendered row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// The synthetic "select all" row.
    SelectAll,
    /// The synthetic custom-value row.
    Custom,
    /// A selected value missing from the working set; index into the
    /// list's ghosts.
    Ghost(usize),
    /// An option; index into the working set.
    Option(usize),
}

/// Inputs to [`EntryList::build`].
#[derive(Debug)]
pub struct EntryParams<'a, V> {
    /// Working set.
    pub working: &'a [SelectOption<V>],
    /// Filtered indices into `working`, display order.
    pub filtered: &'a [usize],
    /// Current query.
    pub query: &'a str,
    /// Offer the query as a custom value.
    pub create_custom_value: bool,
    /// Offer a "select all" row.
    pub enable_all_option: bool,
    /// Selected options, checked for ghosts.
    pub selected: &'a [SelectOption<V>],
}

/// Display-ordered rows of an open combo box.
#[derive(Debug, Clone)]
pub struct EntryList<V> {
    entries: Vec<Entry>,
    custom: Option<SelectOption<V>>,
    ghosts: Vec<SelectOption<V>>,
    ghost_values: HashSet<V>,
    concrete: usize,
}

impl<V> Default for EntryList<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            custom: None,
            ghosts: Vec::new(),
            ghost_values: HashSet::new(),
            concrete: 0,
        }
    }
}

impl<V: OptionValue> EntryList<V> {
    /// Build the row sequence.
    pub fn build(params: EntryParams<'_, V>) -> Self {
        let EntryParams {
            working,
            filtered,
            query,
            create_custom_value,
            enable_all_option,
            selected,
        } = params;

        let custom = if create_custom_value && !query.is_empty() {
            let exact = working.iter().any(|o| o.value.display_eq(query));
            if exact {
                None
            } else {
                SelectOption::custom(query)
            }
        } else {
            None
        };

        let ghost_values: HashSet<V> = if selected.is_empty() {
            HashSet::new()
        } else {
            let present: HashSet<&V> = working.iter().map(|o| &o.value).collect();
            selected
                .iter()
                .filter(|s| !present.contains(&s.value))
                .map(|s| s.value.clone())
                .collect()
        };
        // Ghost rows only head an unfiltered list.
        let ghosts: Vec<SelectOption<V>> = if query.is_empty() && !ghost_values.is_empty() {
            selected
                .iter()
                .filter(|s| ghost_values.contains(&s.value))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        let concrete = filtered
            .iter()
            .filter(|&&i| working.get(i).is_some_and(SelectOption::is_selectable))
            .count();
        let select_all = enable_all_option && concrete > 1;

        let mut entries = Vec::with_capacity(
            filtered.len() + ghosts.len() + usize::from(select_all) + usize::from(custom.is_some()),
        );
        if select_all {
            entries.push(Entry::SelectAll);
        }
        if custom.is_some() {
            entries.push(Entry::Custom);
        }
        entries.extend((0..ghosts.len()).map(Entry::Ghost));
        entries.extend(
            filtered
                .iter()
                .copied()
                .filter(|&i| i < working.len())
                .map(Entry::Option),
        );

        Self {
            entries,
            custom,
            ghosts,
            ghost_values,
            concrete,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Row at `row`.
    pub fn get(&self, row: usize) -> Option<Entry> {
        self.entries.get(row).copied()
    }

    /// All rows.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The custom-value option, if offered.
    pub fn custom(&self) -> Option<&SelectOption<V>> {
        self.custom.as_ref()
    }

    /// Ghost options, in selection order.
    pub fn ghosts(&self) -> &[SelectOption<V>] {
        &self.ghosts
    }

    /// Whether a selected value is missing from the working set.
    ///
    /// Holds whatever the query, even while ghost rows are not listed.
    pub fn is_ghost(&self, value: &V) -> bool {
        self.ghost_values.contains(value)
    }

    /// Number of selectable filtered options.
    pub fn concrete_count(&self) -> usize {
        self.concrete
    }

    /// The option a row stands for. `None` for "select all".
    pub fn option<'a>(
        &'a self,
        row: usize,
        working: &'a [SelectOption<V>],
    ) -> Option<&'a SelectOption<V>> {
        match self.get(row)? {
            Entry::SelectAll => None,
            Entry::Custom => self.custom.as_ref(),
            Entry::Ghost(i) => self.ghosts.get(i),
            Entry::Option(i) => working.get(i),
        }
    }

    /// Whether a row can be highlighted and confirmed.
    pub fn is_navigable(&self, row: usize, working: &[SelectOption<V>]) -> bool {
        match self.get(row) {
            Some(Entry::SelectAll | Entry::Custom | Entry::Ghost(_)) => true,
            Some(Entry::Option(i)) => working.get(i).is_some_and(SelectOption::is_selectable),
            None => false,
        }
    }

    /// First row whose option has `value`.
    pub fn position_of(&self, value: &V, working: &[SelectOption<V>]) -> Option<usize> {
        (0..self.len()).find(|&row| {
            !matches!(self.get(row), Some(Entry::Custom))
                && self.option(row, working).is_some_and(|o| &o.value == value)
        })
    }

    /// Filtered options in display order, synthetic rows excluded.
    pub fn options<'a>(
        &'a self,
        working: &'a [SelectOption<V>],
    ) -> impl Iterator<Item = &'a SelectOption<V>> + Clone + 'a {
        self.entries.iter().filter_map(move |e| match *e {
            Entry::Option(i) => working.get(i),
            _ => None,
        })
    }

    /// Layout shapes for every row.
    pub fn shapes<'a>(
        &'a self,
        working: &'a [SelectOption<V>],
    ) -> impl Iterator<Item = RowShape<'a>> + 'a {
        (0..self.len()).map(move |row| match self.option(row, working) {
            Some(option) => RowShape {
                has_description: option.has_description(),
                group: match self.entries[row] {
                    Entry::Option(_) => option.group.as_deref(),
                    _ => None,
                },
            },
            None => RowShape {
                has_description: false,
                group: None,
            },
        })
    }
}

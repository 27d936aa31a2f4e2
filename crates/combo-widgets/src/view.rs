#![forbid(unsafe_code)]

//! View models emitted by the combo boxes.
//!
//! The widgets do not draw. Each frame they produce a [`ComboView`]: the
//! trigger's text and state, and, when open, the positioned list with only
//! the rows in the visible window. Hosts map these onto their own drawing
//! and accessibility layers.
//!
//! # Row identifiers
//!
//! | Row | Id |
//! |-----|----|
//! | option (including ghosts) | `{prefix}-option-{value}` |
//! | group header | `{prefix}-group-{n}` |
//! | custom value | `{prefix}-custom` |
//! | select all | `{prefix}-all` |

use std::fmt;

use crate::fuzzy::MatchPositions;
use crate::overlay::OverlayGeometry;
use crate::selection::SelectAllState;

/// Accessibility role of a view element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The trigger input.
    Combobox,
    /// The list container.
    Listbox,
    /// A selectable row.
    Option,
    /// A non-selectable group header.
    GroupHeader,
    /// A non-selectable status row (loading, no results, error) or an
    /// info-only option.
    Presentation,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Combobox => "combobox",
            Self::Listbox => "listbox",
            Self::Option => "option",
            Self::GroupHeader => "group",
            Self::Presentation => "presentation",
        })
    }
}

/// Id of an option row.
pub fn option_id(prefix: &str, value: &impl fmt::Display) -> String {
    format!("{prefix}-option-{value}")
}

/// Id of the `n`th group header.
pub fn group_id(prefix: &str, n: usize) -> String {
    format!("{prefix}-group-{n}")
}

/// Id of the custom-value row.
pub fn custom_id(prefix: &str) -> String {
    format!("{prefix}-custom")
}

/// Id of the "select all" row.
pub fn all_id(prefix: &str) -> String {
    format!("{prefix}-all")
}

/// A chosen value shown as a removable token in a multi-select trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenView {
    /// Token text.
    pub label: String,
    /// Id of the option this token stands for.
    pub id: String,
    /// The value is absent from the current option set.
    pub ghost: bool,
}

/// The trigger (input) element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerView {
    /// Always [`Role::Combobox`].
    pub role: Role,
    /// The list is open.
    pub expanded: bool,
    /// Id of the highlighted row while open.
    pub active_descendant: Option<String>,
    /// Query while typing, otherwise the selected label (single-select).
    pub text: String,
    /// Placeholder shown when `text` is empty and nothing is chosen.
    pub placeholder: Option<String>,
    /// Chosen values (multi-select).
    pub tokens: Vec<TokenView>,
    /// A clear control is shown.
    pub show_clear: bool,
    /// Input is ignored.
    pub disabled: bool,
    /// Presentational invalid flag.
    pub invalid: bool,
    /// Loading indicator: caller flag or an async lookup in progress.
    pub loading: bool,
}

/// What the list area is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStatus {
    /// Rows are available.
    Ready,
    /// Nothing loaded yet and a lookup is in progress.
    Loading,
    /// No row matches the query.
    NoResults,
    /// The last lookup failed.
    Error,
}

/// Group header rendered above a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHeaderView {
    /// Always [`Role::GroupHeader`].
    pub role: Role,
    /// Header id.
    pub id: String,
    /// Group name.
    pub label: String,
}

/// One visible row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    /// Stable id.
    pub id: String,
    /// [`Role::Option`], or [`Role::Presentation`] for info-only rows.
    pub role: Role,
    /// Position in the full row sequence.
    pub row: usize,
    /// Main text.
    pub label: String,
    /// Secondary text.
    pub description: Option<String>,
    /// Header attached above the row, if it starts a group.
    pub group_header: Option<GroupHeaderView>,
    /// Absolute content offset of the row's top (header included).
    pub offset: u32,
    /// Row height (header included).
    pub height: u16,
    /// Keyboard/pointer highlight.
    pub highlighted: bool,
    /// The row's value is selected.
    pub selected: bool,
    /// Checkbox state of the "select all" row.
    pub select_all: Option<SelectAllState>,
    /// The value is absent from the current option set.
    pub ghost: bool,
    /// Char positions in `label` matching the query.
    pub matches: MatchPositions,
}

/// The open list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView {
    /// Always [`Role::Listbox`].
    pub role: Role,
    /// Status shown in place of or above the rows.
    pub status: ListStatus,
    /// Visible rows (overscan included).
    pub rows: Vec<RowView>,
    /// Total number of rows.
    pub row_count: usize,
    /// Total virtual content height.
    pub total_height: u32,
    /// Current scroll offset.
    pub scroll_top: u32,
    /// Overlay placement.
    pub geometry: OverlayGeometry,
}

impl ListView {
    /// Visible rows' labels, in order. Mostly for tests.
    pub fn labels(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.label.as_str()).collect()
    }

    /// The highlighted row, if visible.
    pub fn highlighted(&self) -> Option<&RowView> {
        self.rows.iter().find(|r| r.highlighted)
    }
}

/// Everything a host needs to render one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboView {
    /// The trigger.
    pub trigger: TriggerView,
    /// The list, when open.
    pub list: Option<ListView>,
}

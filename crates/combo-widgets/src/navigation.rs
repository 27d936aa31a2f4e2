#![forbid(unsafe_code)]

//! Keyboard/pointer navigation over a list of rows.
//!
//! The [`Navigator`] tracks a highlighted row. It never wraps: moving past
//! either end leaves the highlight where it is. Rows that cannot be
//! confirmed (info-only rows) are skipped by every movement. The navigator
//! only knows row indices and a navigability predicate, so it works the
//! same whether or not the list is virtualized.

use combo_core::event::{KeyCode, KeyEvent};

/// A navigation intent decoded from input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
    /// Move up one row.
    Prev,
    /// Move down one row.
    Next,
    /// Move up one page.
    PageUp,
    /// Move down one page.
    PageDown,
    /// Jump to the first row.
    First,
    /// Jump to the last row.
    Last,
    /// Confirm the highlighted row.
    Confirm,
    /// Close / clear highlight.
    Dismiss,
}

impl NavCommand {
    /// Decode a key press. Modifier-free keys only, except that Ctrl or
    /// Shift do not change arrow meaning.
    pub fn from_key(key: &KeyEvent) -> Option<Self> {
        if !key.is_press() {
            return None;
        }
        Some(match key.code {
            KeyCode::Up => Self::Prev,
            KeyCode::Down => Self::Next,
            KeyCode::PageUp => Self::PageUp,
            KeyCode::PageDown => Self::PageDown,
            KeyCode::Home => Self::First,
            KeyCode::End => Self::Last,
            KeyCode::Enter => Self::Confirm,
            KeyCode::Escape => Self::Dismiss,
            _ => return None,
        })
    }
}

/// Highlight tracker.
///
/// # Invariants
///
/// After any method that takes `len` and `navigable`, the highlight is
/// either `None` or a navigable index `< len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Navigator {
    highlight: Option<usize>,
}

impl Navigator {
    /// Create with no highlight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Highlighted row.
    #[inline]
    pub fn highlight(&self) -> Option<usize> {
        self.highlight
    }

    /// Drop the highlight.
    pub fn clear(&mut self) {
        self.highlight = None;
    }

    /// Highlight the first navigable row.
    pub fn reset(&mut self, len: usize, navigable: impl Fn(usize) -> bool) {
        self.highlight = (0..len).find(|&i| navigable(i));
    }

    /// Highlight `row` if navigable, otherwise leave the highlight alone.
    ///
    /// Returns `true` if the highlight changed.
    pub fn set(&mut self, row: usize, len: usize, navigable: impl Fn(usize) -> bool) -> bool {
        if row >= len || !navigable(row) || self.highlight == Some(row) {
            return false;
        }
        self.highlight = Some(row);
        true
    }

    /// Re-validate after the list changed, falling back to the nearest
    /// navigable row at or after the old highlight, then before it.
    pub fn clamp(&mut self, len: usize, navigable: impl Fn(usize) -> bool) {
        let Some(h) = self.highlight else {
            return;
        };
        let start = h.min(len.saturating_sub(1));
        self.highlight = (start..len)
            .find(|&i| navigable(i))
            .or_else(|| (0..start).rev().find(|&i| navigable(i)));
    }

    /// Apply a movement command. `page` is the number of rows per page.
    ///
    /// Returns `true` if the highlight changed. `Confirm` and `Dismiss` are
    /// not movements and return `false`.
    pub fn apply(
        &mut self,
        command: NavCommand,
        len: usize,
        page: usize,
        navigable: impl Fn(usize) -> bool,
    ) -> bool {
        let first = || (0..len).find(|&i| navigable(i));
        let last = || (0..len).rev().find(|&i| navigable(i));
        let before = self.highlight;

        let next = match (command, self.highlight) {
            (NavCommand::First, _) | (NavCommand::Next | NavCommand::PageDown, None) => first(),
            (NavCommand::Last, _) => last(),
            (NavCommand::Prev | NavCommand::PageUp, None) => last(),
            (NavCommand::Next, Some(h)) => (h + 1..len).find(|&i| navigable(i)).or(Some(h)),
            (NavCommand::Prev, Some(h)) => (0..h).rev().find(|&i| navigable(i)).or(Some(h)),
            (NavCommand::PageDown, Some(h)) => {
                let target = h.saturating_add(page.max(1)).min(len.saturating_sub(1));
                (target..len)
                    .find(|&i| navigable(i))
                    .or_else(|| (h + 1..target).rev().find(|&i| navigable(i)))
                    .or(Some(h))
            }
            (NavCommand::PageUp, Some(h)) => {
                let target = h.saturating_sub(page.max(1));
                (0..=target)
                    .rev()
                    .find(|&i| navigable(i))
                    .or_else(|| (target + 1..h).find(|&i| navigable(i)))
                    .or(Some(h))
            }
            (NavCommand::Confirm | NavCommand::Dismiss, h) => h,
        };

        self.highlight = next.filter(|&i| i < len);
        self.highlight != before
    }
}

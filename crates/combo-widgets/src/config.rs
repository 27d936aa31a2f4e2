#![forbid(unsafe_code)]

//! Combo box configuration.

use std::time::Duration;

use crate::query::DEFAULT_DEBOUNCE;
use crate::virtualized::{DEFAULT_OVERSCAN, RowMetrics};

/// Default cap on visible rows in the overlay.
pub const DEFAULT_MAX_VISIBLE_ROWS: u16 = 8;

/// Default number of labels scanned when measuring natural width.
pub const DEFAULT_WIDTH_SCAN_LIMIT: usize = 100_000;

/// Behavior and sizing knobs shared by [`ComboBox`](crate::combobox::ComboBox)
/// and [`MultiComboBox`](crate::multi_combobox::MultiComboBox).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboBoxConfig {
    /// Text shown in the trigger when nothing is selected or typed.
    pub placeholder: Option<String>,
    /// Allow clearing the selection.
    pub clearable: bool,
    /// Offer the query as a custom value.
    pub create_custom_value: bool,
    /// Offer a "select all" row (multi-select only).
    pub enable_all_option: bool,
    /// Ignore all input.
    pub disabled: bool,
    /// Presentational invalid flag, reported in the view.
    pub invalid: bool,
    /// Presentational loading flag, reported in the view.
    pub loading: bool,
    /// Delay before an async lookup is issued.
    pub debounce: Duration,
    /// Extra rows described above and below the viewport.
    pub overscan: usize,
    /// Overlay height cap, in base rows.
    pub max_visible_rows: u16,
    /// Row building-block heights.
    pub row_metrics: RowMetrics,
    /// Fixed overlay width.
    pub width: Option<u16>,
    /// Minimum overlay width.
    pub min_width: Option<u16>,
    /// Maximum overlay width.
    pub max_width: Option<u16>,
    /// Labels scanned when measuring natural width.
    pub width_scan_limit: usize,
    /// Prefix of every row identifier.
    pub id_prefix: String,
    /// Keep stale results visible under the error row.
    pub show_error_with_results: bool,
}

impl Default for ComboBoxConfig {
    fn default() -> Self {
        Self {
            placeholder: None,
            clearable: false,
            create_custom_value: false,
            enable_all_option: false,
            disabled: false,
            invalid: false,
            loading: false,
            debounce: DEFAULT_DEBOUNCE,
            overscan: DEFAULT_OVERSCAN,
            max_visible_rows: DEFAULT_MAX_VISIBLE_ROWS,
            row_metrics: RowMetrics::default(),
            width: None,
            min_width: None,
            max_width: None,
            width_scan_limit: DEFAULT_WIDTH_SCAN_LIMIT,
            id_prefix: "combobox".to_string(),
            show_error_with_results: true,
        }
    }
}

impl ComboBoxConfig {
    /// Set placeholder text.
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Allow clearing.
    #[must_use]
    pub fn with_clearable(mut self, clearable: bool) -> Self {
        self.clearable = clearable;
        self
    }

    /// Offer the query as a custom value.
    #[must_use]
    pub fn with_custom_value(mut self, enabled: bool) -> Self {
        self.create_custom_value = enabled;
        self
    }

    /// Offer a "select all" row.
    #[must_use]
    pub fn with_all_option(mut self, enabled: bool) -> Self {
        self.enable_all_option = enabled;
        self
    }

    /// Disable input.
    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Mark invalid.
    #[must_use]
    pub fn with_invalid(mut self, invalid: bool) -> Self {
        self.invalid = invalid;
        self
    }

    /// Mark loading.
    #[must_use]
    pub fn with_loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    /// Set the async debounce.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set overscan rows.
    #[must_use]
    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    /// Set the visible row cap (at least 1).
    #[must_use]
    pub fn with_max_visible_rows(mut self, rows: u16) -> Self {
        self.max_visible_rows = rows.max(1);
        self
    }

    /// Set row metrics.
    #[must_use]
    pub fn with_row_metrics(mut self, metrics: RowMetrics) -> Self {
        self.row_metrics = metrics;
        self
    }

    /// Set a fixed overlay width.
    #[must_use]
    pub fn with_width(mut self, width: u16) -> Self {
        self.width = Some(width);
        self
    }

    /// Set overlay width bounds.
    #[must_use]
    pub fn with_width_bounds(mut self, min: Option<u16>, max: Option<u16>) -> Self {
        self.min_width = min;
        self.max_width = max;
        self
    }

    /// Set the natural-width scan limit.
    #[must_use]
    pub fn with_width_scan_limit(mut self, limit: usize) -> Self {
        self.width_scan_limit = limit;
        self
    }

    /// Set the row identifier prefix.
    #[must_use]
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    /// Replace stale results with the error row instead of keeping both.
    #[must_use]
    pub fn with_error_replacing_results(mut self) -> Self {
        self.show_error_with_results = false;
        self
    }

    /// Overlay height cap in cells.
    pub fn max_rows_height(&self) -> u16 {
        self.max_visible_rows
            .saturating_mul(self.row_metrics.base.max(1))
    }
}

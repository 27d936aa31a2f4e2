#![forbid(unsafe_code)]

//! Virtualization primitives for long option lists.
//!
//! Row heights are estimated from the data shape instead of measured after
//! rendering, so the total content height and any row's offset are known
//! up front. Only the rows intersecting the viewport (plus an overscan
//! margin) are ever described.
//!
//! # Core Types
//!
//! - [`RowMetrics`] - height of each row building block
//! - [`RowLayout`] - prefix-sum offset table, rebuilt on query/source change
//! - [`RowDescriptor`] - one visible row, computed lazily
//! - [`ScrollState`] - scroll offset and viewport height
//!
//! # Invariants
//!
//! 1. `offset(i + 1) == offset(i) + height(i)` for every row.
//! 2. `total_height() == sum of all row heights`.
//! 3. A group header is attached to the first row of each run of rows
//!    sharing a group name; ungrouped rows never carry one.

use std::ops::Range;

/// Default number of extra rows described above and below the viewport.
pub const DEFAULT_OVERSCAN: usize = 4;

/// Heights of the blocks a row is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowMetrics {
    /// Height of a plain option row.
    pub base: u16,
    /// Extra height when the option has a description.
    pub description: u16,
    /// Extra height for the group header above the first row of a group.
    pub group_header: u16,
}

impl Default for RowMetrics {
    fn default() -> Self {
        Self {
            base: 1,
            description: 1,
            group_header: 1,
        }
    }
}

impl RowMetrics {
    /// Height of a row with the given shape.
    #[inline]
    pub fn height(&self, has_description: bool, starts_group: bool) -> u16 {
        let mut h = self.base.max(1);
        if has_description {
            h = h.saturating_add(self.description);
        }
        if starts_group {
            h = h.saturating_add(self.group_header);
        }
        h
    }
}

/// The data shape the layout needs from each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowShape<'a> {
    /// Whether a description block is rendered.
    pub has_description: bool,
    /// Group name, if any.
    pub group: Option<&'a str>,
}

/// A row inside the visible window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowDescriptor {
    /// Position of the row in the list.
    pub row: usize,
    /// Absolute offset of the row's top edge in the content.
    pub offset: u32,
    /// Full row height, header block included.
    pub height: u16,
    /// The row starts a group and renders its header.
    pub is_group_header_row: bool,
    /// Ordinal of the group header attached to this row.
    pub group_header_id: Option<usize>,
}

/// The rows to render for one viewport position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VisibleWindow {
    /// Described rows, overscan included, in list order.
    pub rows: Vec<RowDescriptor>,
    /// Rows actually intersecting the viewport.
    pub visible: Range<usize>,
    /// Sum of all row heights.
    pub total_height: u32,
}

/// Prefix-sum offset table over the rows of a list.
#[derive(Debug, Clone, Default)]
pub struct RowLayout {
    /// `offsets[i]` is the top of row `i`; `offsets[len]` is the total height.
    offsets: Vec<u32>,
    /// Rows that start a group, ascending. Position = header ordinal.
    group_starts: Vec<usize>,
}

impl RowLayout {
    /// Build the table from row shapes.
    pub fn build<'a>(shapes: impl IntoIterator<Item = RowShape<'a>>, metrics: RowMetrics) -> Self {
        let shapes = shapes.into_iter();
        let mut offsets = Vec::with_capacity(shapes.size_hint().0 + 1);
        let mut group_starts = Vec::new();
        let mut total = 0u32;
        let mut prev_group: Option<&str> = None;

        offsets.push(0);
        for (row, shape) in shapes.enumerate() {
            let starts_group = shape.group.is_some() && shape.group != prev_group;
            if starts_group {
                group_starts.push(row);
            }
            prev_group = shape.group;
            total = total.saturating_add(u32::from(
                metrics.height(shape.has_description, starts_group),
            ));
            offsets.push(total);
        }

        Self {
            offsets,
            group_starts,
        }
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Whether there are no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of all row heights.
    #[inline]
    pub fn total_height(&self) -> u32 {
        self.offsets.last().copied().unwrap_or(0)
    }

    /// Top offset of `row`, or `None` if out of range.
    pub fn offset(&self, row: usize) -> Option<u32> {
        if row < self.len() {
            Some(self.offsets[row])
        } else {
            None
        }
    }

    /// Height of `row`, or `None` if out of range.
    pub fn height(&self, row: usize) -> Option<u16> {
        if row < self.len() {
            let h = self.offsets[row + 1] - self.offsets[row];
            Some(u16::try_from(h).unwrap_or(u16::MAX))
        } else {
            None
        }
    }

    /// Number of group headers in the list.
    #[cfg(test)]
    pub fn group_count(&self) -> usize {
        self.group_starts.len()
    }

    /// Row containing content offset `y`, clamped to the last row.
    pub fn row_at_offset(&self, y: u32) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        // First row whose bottom edge is below y.
        let row = self.offsets[1..].partition_point(|&bottom| bottom <= y);
        Some(row.min(self.len() - 1))
    }

    /// Describe a single row.
    pub fn describe(&self, row: usize) -> Option<RowDescriptor> {
        let offset = self.offset(row)?;
        let height = self.height(row)?;
        let group_header_id = self.group_starts.binary_search(&row).ok();
        Some(RowDescriptor {
            row,
            offset,
            height,
            is_group_header_row: group_header_id.is_some(),
            group_header_id,
        })
    }

    /// Rows intersecting `[scroll_top, scroll_top + viewport_height)`,
    /// extended by `overscan` rows on each side.
    pub fn visible_window(
        &self,
        scroll_top: u32,
        viewport_height: u16,
        overscan: usize,
    ) -> VisibleWindow {
        let total_height = self.total_height();
        if self.is_empty() || viewport_height == 0 {
            return VisibleWindow {
                rows: Vec::new(),
                visible: 0..0,
                total_height,
            };
        }

        let top = scroll_top.min(total_height.saturating_sub(1));
        let bottom = top.saturating_add(u32::from(viewport_height)) - 1;
        let first = self.row_at_offset(top).unwrap_or(0);
        let last = self.row_at_offset(bottom).unwrap_or(first);

        let start = first.saturating_sub(overscan);
        let end = last.saturating_add(1).saturating_add(overscan).min(self.len());
        let rows = (start..end).filter_map(|row| self.describe(row)).collect();

        VisibleWindow {
            rows,
            visible: first..last + 1,
            total_height,
        }
    }

    /// Scroll offset that brings `row` fully into view, moving as little as
    /// possible.
    pub fn scroll_into_view(&self, row: usize, scroll_top: u32, viewport_height: u16) -> u32 {
        let (Some(offset), Some(height)) = (self.offset(row), self.height(row)) else {
            return scroll_top;
        };
        let viewport = u32::from(viewport_height);
        let bottom = offset + u32::from(height);
        let target = if offset < scroll_top || viewport == 0 {
            offset
        } else if bottom > scroll_top.saturating_add(viewport) {
            // Keep the row's top visible if it is taller than the viewport.
            bottom.saturating_sub(viewport).min(offset)
        } else {
            scroll_top
        };
        target.min(self.max_scroll(viewport_height))
    }

    /// Largest valid scroll offset for the viewport.
    #[inline]
    pub fn max_scroll(&self, viewport_height: u16) -> u32 {
        self.total_height()
            .saturating_sub(u32::from(viewport_height))
    }

    /// Number of rows that fit entirely below `row` within one viewport.
    pub fn rows_per_page(&self, row: usize, viewport_height: u16) -> usize {
        let Some(start) = self.offset(row) else {
            return 1;
        };
        let limit = start.saturating_add(u32::from(viewport_height));
        let end = self.offsets[row + 1..].partition_point(|&bottom| bottom <= limit);
        end.max(1)
    }
}

/// Scroll offset plus viewport height for a virtual list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollState {
    /// Content offset at the top of the viewport.
    pub scroll_top: u32,
    /// Height of the viewport.
    pub viewport_height: u16,
    /// Extra rows described above and below the viewport.
    pub overscan: usize,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            scroll_top: 0,
            viewport_height: 0,
            overscan: DEFAULT_OVERSCAN,
        }
    }
}

impl ScrollState {
    /// Scroll by `delta` cells (positive = down), clamped to the content.
    pub fn scroll_by(&mut self, delta: i32, layout: &RowLayout) {
        let next = i64::from(self.scroll_top) + i64::from(delta);
        let max = i64::from(layout.max_scroll(self.viewport_height));
        self.scroll_top = next.clamp(0, max) as u32;
    }

    /// Bring `row` into view.
    pub fn reveal(&mut self, row: usize, layout: &RowLayout) {
        self.scroll_top = layout.scroll_into_view(row, self.scroll_top, self.viewport_height);
    }

    /// Re-clamp after the layout changed.
    pub fn clamp(&mut self, layout: &RowLayout) {
        self.scroll_top = self.scroll_top.min(layout.max_scroll(self.viewport_height));
    }

    /// The window of rows to render.
    pub fn window(&self, layout: &RowLayout) -> VisibleWindow {
        layout.visible_window(self.scroll_top, self.viewport_height, self.overscan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn plain(n: usize) -> RowLayout {
        RowLayout::build(
            (0..n).map(|_| RowShape {
                has_description: false,
                group: None,
            }),
            RowMetrics::default(),
        )
    }

    fn shapes<'a>(table: &'a [(bool, Option<&'a str>)]) -> impl Iterator<Item = RowShape<'a>> {
        table.iter().map(|&(has_description, group)| RowShape {
            has_description,
            group,
        })
    }

    #[test]
    fn heights_follow_data_shape() {
        let table = [
            (false, None),
            (true, None),
            (false, Some("fruit")),
            (true, Some("fruit")),
            (false, Some("veg")),
        ];
        let layout = RowLayout::build(shapes(&table), RowMetrics::default());
        let heights: Vec<u16> = (0..5).map(|i| layout.height(i).unwrap()).collect();
        assert_eq!(heights, vec![1, 2, 2, 2, 2]);
        assert_eq!(layout.total_height(), 9);
        assert_eq!(layout.offset(3), Some(5));
        assert_eq!(layout.group_count(), 2);
    }

    #[test]
    fn group_headers_on_transitions_only() {
        let table = [
            (false, Some("a")),
            (false, Some("a")),
            (false, None),
            (false, Some("a")),
        ];
        let layout = RowLayout::build(shapes(&table), RowMetrics::default());
        let d0 = layout.describe(0).unwrap();
        assert!(d0.is_group_header_row);
        assert_eq!(d0.group_header_id, Some(0));
        assert!(!layout.describe(1).unwrap().is_group_header_row);
        assert!(!layout.describe(2).unwrap().is_group_header_row);
        // Same name again after a break is a new run.
        assert_eq!(layout.describe(3).unwrap().group_header_id, Some(1));
    }

    #[test]
    fn window_includes_overscan() {
        let layout = plain(100);
        let w = layout.visible_window(50, 10, 4);
        assert_eq!(w.visible, 50..60);
        assert_eq!(w.rows.first().unwrap().row, 46);
        assert_eq!(w.rows.last().unwrap().row, 63);
        assert_eq!(w.total_height, 100);
    }

    #[test]
    fn window_clamps_at_edges() {
        let layout = plain(5);
        let w = layout.visible_window(0, 10, 4);
        assert_eq!(w.visible, 0..5);
        assert_eq!(w.rows.len(), 5);

        let w = layout.visible_window(1000, 3, 1);
        assert_eq!(w.visible.end, 5);
    }

    #[test]
    fn empty_layout() {
        let layout = plain(0);
        assert!(layout.is_empty());
        assert_eq!(layout.row_at_offset(0), None);
        assert!(layout.visible_window(0, 10, 4).rows.is_empty());
        assert_eq!(layout.scroll_into_view(3, 7, 10), 7);
    }

    #[test]
    fn row_at_offset_with_tall_rows() {
        let table = [(true, None), (false, None), (true, None)];
        let layout = RowLayout::build(shapes(&table), RowMetrics::default());
        assert_eq!(layout.row_at_offset(0), Some(0));
        assert_eq!(layout.row_at_offset(1), Some(0));
        assert_eq!(layout.row_at_offset(2), Some(1));
        assert_eq!(layout.row_at_offset(3), Some(2));
        assert_eq!(layout.row_at_offset(99), Some(2));
    }

    #[test]
    fn scroll_into_view_moves_minimally() {
        let layout = plain(100);
        assert_eq!(layout.scroll_into_view(5, 0, 10), 0);
        assert_eq!(layout.scroll_into_view(10, 0, 10), 1);
        assert_eq!(layout.scroll_into_view(3, 20, 10), 3);
        assert_eq!(layout.scroll_into_view(99, 0, 10), 90);
    }

    #[test]
    fn rows_per_page_counts_whole_rows() {
        let table = [(true, None), (true, None), (false, None), (false, None)];
        let layout = RowLayout::build(shapes(&table), RowMetrics::default());
        assert_eq!(layout.rows_per_page(0, 5), 2);
        assert_eq!(layout.rows_per_page(2, 5), 2);
        assert_eq!(layout.rows_per_page(0, 1), 1);
    }

    #[test]
    fn scroll_state_clamps() {
        let layout = plain(20);
        let mut s = ScrollState {
            viewport_height: 5,
            ..ScrollState::default()
        };
        s.scroll_by(-3, &layout);
        assert_eq!(s.scroll_top, 0);
        s.scroll_by(100, &layout);
        assert_eq!(s.scroll_top, 15);
        s.reveal(2, &layout);
        assert_eq!(s.scroll_top, 2);
    }

    #[test]
    fn million_rows_layout() {
        let layout = plain(1_000_000);
        assert_eq!(layout.total_height(), 1_000_000);
        let w = layout.visible_window(999_995, 8, 4);
        assert_eq!(w.rows.last().unwrap().row, 999_999);
        assert!(w.rows.len() <= 8 + 2 * 4);
    }

    proptest! {
        #[test]
        fn offsets_are_prefix_sums(
            table in proptest::collection::vec((any::<bool>(), proptest::option::of(0u8..3)), 0..200)
        ) {
            let names = ["a", "b", "c"];
            let layout = RowLayout::build(
                table.iter().map(|&(d, g)| RowShape {
                    has_description: d,
                    group: g.map(|g| names[g as usize]),
                }),
                RowMetrics::default(),
            );
            let mut sum = 0u32;
            for row in 0..layout.len() {
                prop_assert_eq!(layout.offset(row), Some(sum));
                sum += u32::from(layout.height(row).unwrap());
            }
            prop_assert_eq!(layout.total_height(), sum);
        }

        #[test]
        fn window_covers_viewport(n in 1usize..300, top in 0u32..400, vh in 1u16..40) {
            let layout = plain(n);
            let w = layout.visible_window(top, vh, 2);
            prop_assert!(!w.rows.is_empty());
            let clamped = top.min(layout.total_height() - 1);
            let first = w.rows.first().unwrap();
            prop_assert!(first.offset <= clamped);
            for pair in w.rows.windows(2) {
                prop_assert_eq!(pair[0].row + 1, pair[1].row);
            }
        }
    }
}

#![forbid(unsafe_code)]

//! Floating overlay positioning.
//!
//! Computes where the drop-down list goes relative to its trigger:
//!
//! 1. Open below the trigger unless the space below cannot hold the content
//!    and there is more room above, in which case flip above.
//! 2. `max_height` never exceeds the row cap, however tall the viewport.
//! 3. Width is `max(natural content width, trigger width)`, clamped to the
//!    caller's min/max, then to the viewport width. The overlay is shifted
//!    left rather than overflowing the right edge.
//!
//! Geometry is independent of where the host mounts the overlay.

use combo_core::geometry::{Rect, Size};
use unicode_width::UnicodeWidthStr;

/// Width of the vertical scrollbar drawn when content overflows.
#[inline]
pub const fn scrollbar_width() -> u16 {
    1
}

/// Widest label among the first `scan_limit` labels, in cells.
pub fn natural_content_width<S: AsRef<str>>(
    labels: impl IntoIterator<Item = S>,
    scan_limit: usize,
) -> u16 {
    let widest = labels
        .into_iter()
        .take(scan_limit)
        .map(|label| label.as_ref().width())
        .max()
        .unwrap_or(0);
    u16::try_from(widest).unwrap_or(u16::MAX)
}

/// Which side of the trigger the overlay opens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Under the trigger.
    #[default]
    Below,
    /// Over the trigger.
    Above,
}

/// Inputs to the positioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlayRequest {
    /// Trigger bounds.
    pub trigger: Rect,
    /// Host viewport size.
    pub viewport: Size,
    /// Natural width of the list content (widest label plus padding).
    pub content_width: u16,
    /// Total virtual height of the list content.
    pub content_height: u32,
    /// Height cap in cells (max visible rows times the base row height).
    pub max_rows_height: u16,
    /// Fixed width hint; replaces the natural width when set.
    pub width: Option<u16>,
    /// Lower width bound.
    pub min_width: Option<u16>,
    /// Upper width bound.
    pub max_width: Option<u16>,
}

/// Computed overlay placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlayGeometry {
    /// Top edge.
    pub top: u16,
    /// Left edge.
    pub left: u16,
    /// Overlay width, scrollbar included.
    pub width: u16,
    /// Height the list may grow to.
    pub max_height: u16,
    /// Height actually occupied: `min(content, max_height)`.
    pub height: u16,
    /// Side of the trigger used.
    pub placement: Placement,
    /// Content overflows and a scrollbar is drawn.
    pub scrollbar: bool,
}

impl OverlayGeometry {
    /// The occupied area.
    pub fn rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.height)
    }
}

impl OverlayRequest {
    /// Run the positioner.
    pub fn compute(&self) -> OverlayGeometry {
        let below = self.trigger.space_below(self.viewport);
        let above = self.trigger.space_above().min(self.viewport.height);
        let cap = self.max_rows_height.max(1);
        let wanted = u16::try_from(self.content_height)
            .unwrap_or(u16::MAX)
            .clamp(1, cap);

        let placement = if below < wanted && above > below {
            Placement::Above
        } else {
            Placement::Below
        };
        let available = match placement {
            Placement::Below => below,
            Placement::Above => above,
        };
        let max_height = cap.min(available);
        let height = wanted.min(max_height);
        let top = match placement {
            Placement::Below => self.trigger.bottom(),
            Placement::Above => self.trigger.y.saturating_sub(height),
        };

        let scrollbar = self.content_height > u32::from(max_height);
        let natural = if scrollbar {
            self.content_width.saturating_add(scrollbar_width())
        } else {
            self.content_width
        };
        let mut width = self.width.unwrap_or(natural).max(self.trigger.width);
        if let Some(min) = self.min_width {
            width = width.max(min);
        }
        if let Some(max) = self.max_width {
            width = width.min(max);
        }
        width = width.min(self.viewport.width);

        let overflow = self
            .trigger
            .x
            .saturating_add(width)
            .saturating_sub(self.viewport.width);
        let left = self.trigger.x.saturating_sub(overflow);

        OverlayGeometry {
            top,
            left,
            width,
            max_height,
            height,
            placement,
            scrollbar,
        }
    }
}

/// Keeps an overlay's geometry current.
///
/// Feed it the trigger, viewport, and content measurements whenever they
/// may have changed; geometry is recomputed only when an input differs.
#[derive(Debug, Clone, Default)]
pub struct OverlayTracker {
    request: Option<OverlayRequest>,
    geometry: OverlayGeometry,
}

impl OverlayTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update inputs; returns `true` if the geometry was recomputed.
    pub fn update(&mut self, request: OverlayRequest) -> bool {
        if self.request == Some(request) {
            return false;
        }
        let geometry = request.compute();
        if geometry != self.geometry {
            tracing::trace!(
                top = geometry.top,
                left = geometry.left,
                width = geometry.width,
                height = geometry.height,
                placement = ?geometry.placement,
                "overlay geometry changed"
            );
        }
        self.request = Some(request);
        self.geometry = geometry;
        true
    }

    /// Last computed geometry.
    pub fn geometry(&self) -> OverlayGeometry {
        self.geometry
    }
}

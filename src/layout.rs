//! Window layout engine for the three-panel mosaic.
//!
//! The dashboard has exactly three top-level panels (comparison, interval A,
//! interval B). Which panels are visible is authoritative application state;
//! the engine maps a visibility set to one of a fixed enumeration of named
//! layouts, each of which assigns an inset rectangle to all five mosaic
//! slots. This design is closed by construction and does not generalize past
//! three panels.

use egui::{Pos2, Rect};
use serde::{Deserialize, Serialize};

/// One of the three top-level panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanelId {
    Comparison,
    IntervalA,
    IntervalB,
}

impl PanelId {
    pub fn label(&self) -> &'static str {
        match self {
            PanelId::Comparison => "Comparison",
            PanelId::IntervalA => "Interval A",
            PanelId::IntervalB => "Interval B",
        }
    }

    pub fn all() -> [PanelId; 3] {
        [PanelId::Comparison, PanelId::IntervalA, PanelId::IntervalB]
    }
}

/// Authoritative visibility of the three panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelVisibility {
    pub comparison: bool,
    pub interval_a: bool,
    pub interval_b: bool,
}

impl Default for PanelVisibility {
    fn default() -> Self {
        Self {
            comparison: true,
            interval_a: true,
            interval_b: true,
        }
    }
}

impl PanelVisibility {
    pub fn is_visible(&self, panel: PanelId) -> bool {
        match panel {
            PanelId::Comparison => self.comparison,
            PanelId::IntervalA => self.interval_a,
            PanelId::IntervalB => self.interval_b,
        }
    }

    pub fn set_visible(&mut self, panel: PanelId, visible: bool) {
        match panel {
            PanelId::Comparison => self.comparison = visible,
            PanelId::IntervalA => self.interval_a = visible,
            PanelId::IntervalB => self.interval_b = visible,
        }
    }

    pub fn count(&self) -> usize {
        [self.comparison, self.interval_a, self.interval_b]
            .iter()
            .filter(|v| **v)
            .count()
    }

    /// True when no panel is visible. The app renders the "all windows
    /// hidden" notice off this signal.
    pub fn none_visible(&self) -> bool {
        self.count() == 0
    }

    pub fn with_hidden(mut self, panel: PanelId) -> Self {
        self.set_visible(panel, false);
        self
    }

    /// The visibility set a layout implies. `resolve_layout` inverts this.
    pub fn for_layout(layout: LayoutId) -> Self {
        let (comparison, interval_a, interval_b) = match layout {
            LayoutId::All => (true, true, true),
            LayoutId::Intervals => (false, true, true),
            LayoutId::ComparisonIntA => (true, true, false),
            LayoutId::ComparisonIntB => (true, false, true),
            LayoutId::Comparison => (true, false, false),
            LayoutId::IntervalA => (false, true, false),
            LayoutId::IntervalB => (false, false, true),
            LayoutId::None => (false, false, false),
        };
        Self {
            comparison,
            interval_a,
            interval_b,
        }
    }
}

/// CSS-style inset region: distances from each viewport edge in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inset {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Inset {
    const fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Fully collapsed slot (hidden panel).
    pub const HIDDEN: Inset = Inset::new(100.0, 100.0, 100.0, 100.0);

    /// Resolve the inset against a concrete viewport rectangle.
    pub fn rect_in(&self, viewport: Rect) -> Rect {
        let w = viewport.width();
        let h = viewport.height();
        Rect::from_min_max(
            Pos2::new(
                viewport.left() + w * self.left / 100.0,
                viewport.top() + h * self.top / 100.0,
            ),
            Pos2::new(
                viewport.right() - w * self.right / 100.0,
                viewport.bottom() - h * self.bottom / 100.0,
            ),
        )
    }

    /// A slot whose left and right insets meet (or cross) has no width and
    /// is treated as hidden.
    pub fn is_collapsed(&self) -> bool {
        self.left + self.right >= 100.0 || self.top + self.bottom >= 100.0
    }
}

/// Number of slots in the mosaic tree: the three panels plus the two
/// container nodes wrapping the interval pair.
pub const SLOT_COUNT: usize = 5;

/// Named geometric arrangement of the mosaic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutId {
    All,
    Intervals,
    ComparisonIntA,
    ComparisonIntB,
    Comparison,
    IntervalA,
    IntervalB,
    None,
}

impl LayoutId {
    /// Inset for every mosaic slot, in fixed slot order: comparison panel,
    /// right container, interval A panel, inner container, interval B panel.
    pub fn insets(&self) -> [Inset; SLOT_COUNT] {
        match self {
            LayoutId::All => [
                Inset::new(0.0, 75.0, 0.0, 0.0),
                Inset::new(0.0, 0.0, 0.0, 25.0),
                Inset::new(0.0, 37.5, 0.0, 25.0),
                Inset::new(0.0, 0.0, 0.0, 62.5),
                Inset::new(0.0, 0.0, 0.0, 62.5),
            ],
            LayoutId::Intervals => [
                Inset::new(0.0, 100.0, 0.0, 0.0),
                Inset::new(0.0, 0.0, 0.0, 0.0),
                Inset::new(0.0, 50.0, 0.0, 0.0),
                Inset::new(0.0, 0.0, 0.0, 50.0),
                Inset::new(0.0, 0.0, 0.0, 50.0),
            ],
            LayoutId::ComparisonIntA => [
                Inset::new(0.0, 75.0, 0.0, 0.0),
                Inset::new(0.0, 0.0, 0.0, 25.0),
                Inset::new(0.0, 0.0, 0.0, 25.0),
                Inset::new(0.0, 0.0, 0.0, 100.0),
                Inset::new(0.0, 0.0, 0.0, 100.0),
            ],
            LayoutId::ComparisonIntB => [
                Inset::new(0.0, 75.0, 0.0, 0.0),
                Inset::new(0.0, 0.0, 0.0, 25.0),
                Inset::new(0.0, 75.0, 0.0, 25.0),
                Inset::new(0.0, 0.0, 0.0, 25.0),
                Inset::new(0.0, 0.0, 0.0, 25.0),
            ],
            LayoutId::Comparison => [
                Inset::new(0.0, 0.0, 0.0, 0.0),
                Inset::new(0.0, 0.0, 0.0, 100.0),
                Inset::new(0.0, 0.0, 0.0, 100.0),
                Inset::new(0.0, 0.0, 0.0, 100.0),
                Inset::new(0.0, 0.0, 0.0, 100.0),
            ],
            LayoutId::IntervalA => [
                Inset::new(0.0, 100.0, 0.0, 0.0),
                Inset::new(0.0, 0.0, 0.0, 0.0),
                Inset::new(0.0, 0.0, 0.0, 0.0),
                Inset::new(0.0, 0.0, 0.0, 100.0),
                Inset::new(0.0, 0.0, 0.0, 100.0),
            ],
            LayoutId::IntervalB => [
                Inset::new(0.0, 100.0, 0.0, 0.0),
                Inset::new(0.0, 0.0, 0.0, 0.0),
                Inset::new(0.0, 100.0, 0.0, 0.0),
                Inset::new(0.0, 0.0, 0.0, 0.0),
                Inset::new(0.0, 0.0, 0.0, 0.0),
            ],
            LayoutId::None => [Inset::HIDDEN; SLOT_COUNT],
        }
    }

    /// Region assigned to a panel's own slot (slots 0, 2 and 4; slots 1 and
    /// 3 are containers).
    pub fn panel_region(&self, panel: PanelId) -> Inset {
        let insets = self.insets();
        match panel {
            PanelId::Comparison => insets[0],
            PanelId::IntervalA => insets[2],
            PanelId::IntervalB => insets[4],
        }
    }
}

/// Map a visibility set to its layout. Total over all eight subsets.
pub fn resolve_layout(visible: PanelVisibility) -> LayoutId {
    match visible.count() {
        3 => LayoutId::All,
        2 => {
            if visible.comparison {
                if visible.interval_a {
                    LayoutId::ComparisonIntA
                } else {
                    LayoutId::ComparisonIntB
                }
            } else {
                LayoutId::Intervals
            }
        }
        1 => {
            if visible.comparison {
                LayoutId::Comparison
            } else if visible.interval_a {
                LayoutId::IntervalA
            } else {
                LayoutId::IntervalB
            }
        }
        _ => LayoutId::None,
    }
}

/// Layout after closing `panel`, given the current visibility of all three
/// panels. Closing a panel that is not visible leaves the layout unchanged.
pub fn close(visible: PanelVisibility, panel: PanelId) -> LayoutId {
    if !visible.is_visible(panel) {
        return resolve_layout(visible);
    }
    resolve_layout(visible.with_hidden(panel))
}

/// Maximizing is absolute, not a relative transition: the target panel's
/// single-panel layout always wins, whatever was visible before.
pub fn maximize(panel: PanelId) -> LayoutId {
    match panel {
        PanelId::Comparison => LayoutId::Comparison,
        PanelId::IntervalA => LayoutId::IntervalA,
        PanelId::IntervalB => LayoutId::IntervalB,
    }
}

//! Panel widgets: global timeline, comparison charts, interval views.

pub mod comparison;
pub mod interval;
pub mod timeline;

pub use comparison::ComparisonView;
pub use interval::IntervalView;
pub use timeline::TimelineView;

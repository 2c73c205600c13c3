mod component;
mod variant;

pub use component::{FrameCounts, FrameGroupingComponent, StacktraceGroupingComponent};
pub use variant::GroupingVariant;

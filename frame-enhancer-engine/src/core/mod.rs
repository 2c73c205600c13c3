mod enums;
mod frame;
mod component;

// 导出常用项
pub use enums::{ActionRange, FrameFamily, FrameOffset, MatchField};
pub use frame::{normalize_path_like, ExceptionData, MatchFrame, MatchFrameBuilder};
pub use component::{Component, ModificationResult, StacktraceState};

mod glob;
mod cache;
mod frame_matcher;

// 对外只导出具体内容，不导出模块名
pub use glob::translate_glob;
pub use cache::{
    compile_glob, init_pattern_cache, pattern_cache_entry_count, DEFAULT_PATTERN_CACHE_CAPACITY,
};
pub use frame_matcher::{FrameMatcher, MatchContext, UNKNOWN_EXCEPTION_VALUE};

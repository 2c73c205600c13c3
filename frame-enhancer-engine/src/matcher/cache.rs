//! 全局编译模式缓存
//! Key: (通配模式, 是否路径型)
//! Value: 编译后的正则Arc（相同模式只编译一次，跨规则集共享）
//! 条目写入后不可变；淘汰只会导致重新编译，不影响正确性

use std::sync::Arc;

use moka::sync::Cache;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;

use super::glob::translate_glob;
use crate::error::{EngineError, EngineResult};

/// 默认缓存容量：内置基础规则约数百条，留足自定义规则空间
pub const DEFAULT_PATTERN_CACHE_CAPACITY: u64 = 1_000;

type PatternCacheKey = (String, bool);

static PATTERN_CACHE_CAPACITY: OnceCell<u64> = OnceCell::new();

static PATTERN_CACHE: Lazy<Cache<PatternCacheKey, Arc<Regex>>> = Lazy::new(|| {
    let capacity = *PATTERN_CACHE_CAPACITY.get_or_init(|| DEFAULT_PATTERN_CACHE_CAPACITY);
    log::debug!("Pattern cache created | capacity: {}", capacity);
    Cache::builder().max_capacity(capacity).build()
});

/// 设置缓存容量（必须在首次编译模式之前调用）
/// 返回false表示容量已确定（已设置过或缓存已创建）
pub fn init_pattern_cache(capacity: u64) -> bool {
    let applied = PATTERN_CACHE_CAPACITY.set(capacity).is_ok();
    if !applied {
        log::debug!(
            "Pattern cache capacity already fixed, ignoring requested capacity {}",
            capacity
        );
    }
    applied
}

/// 编译通配模式（先查缓存，未命中则编译并写入）
pub fn compile_glob(pattern: &str, path_like: bool) -> EngineResult<Arc<Regex>> {
    let key = (pattern.to_string(), path_like);
    if let Some(re) = PATTERN_CACHE.get(&key) {
        return Ok(re);
    }

    let source = translate_glob(pattern, path_like);
    let re = Regex::new(&source)
        .map_err(|e| EngineError::PatternError(format!("{}: {}", pattern, e)))?;
    let re = Arc::new(re);
    PATTERN_CACHE.insert(key, re.clone());
    Ok(re)
}

/// 当前缓存条目数（近似值，moka异步维护计数）
pub fn pattern_cache_entry_count() -> u64 {
    PATTERN_CACHE.entry_count()
}

//! 全局配置

use frame_enhancer_engine::{DEFAULT_PATTERN_CACHE_CAPACITY, LATEST_VERSION};

/// 未指定时使用的默认分组规则集
pub const DEFAULT_GROUPING_ENHANCEMENTS_ID: &str = "newstyle:2023-01-11";

/// 进程级配置（init_enhancer 时生效一次）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancerConfig {
    /// 编译模式缓存容量
    pub pattern_cache_capacity: u64,
    /// 默认规则集id（default_enhancements / as_dict.latest 使用）
    pub default_enhancements_id: String,
    /// 新建规则集未指定版本时使用的版本
    pub latest_version: u32,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            pattern_cache_capacity: DEFAULT_PATTERN_CACHE_CAPACITY,
            default_enhancements_id: DEFAULT_GROUPING_ENHANCEMENTS_ID.to_string(),
            latest_version: LATEST_VERSION,
        }
    }
}

/// 自定义构建器（链式 API）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: EnhancerConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pattern_cache_capacity(mut self, capacity: u64) -> Self {
        self.config.pattern_cache_capacity = capacity;
        self
    }

    pub fn default_enhancements_id(mut self, id: impl Into<String>) -> Self {
        self.config.default_enhancements_id = id.into();
        self
    }

    pub fn latest_version(mut self, version: u32) -> Self {
        self.config.latest_version = version;
        self
    }

    pub fn build(self) -> EnhancerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = CustomConfigBuilder::new()
            .pattern_cache_capacity(64)
            .latest_version(2)
            .build();
        assert_eq!(config.pattern_cache_capacity, 64);
        assert_eq!(config.latest_version, 2);
        assert_eq!(config.default_enhancements_id, DEFAULT_GROUPING_ENHANCEMENTS_ID);
    }
}

//! frame-enhancer - 堆栈帧增强规则
//! 按规则把堆栈帧标记为应用内/系统帧、打分类标签，并决定哪些帧参与错误分组

pub mod config;
pub mod enhancements;
pub mod error;
pub mod frame;
pub mod global;
pub mod grouping;
pub mod profiling;

// 导出全局错误类型
pub use self::error::{EnhancerError, EnhancerResult};

// 导出配置与全局初始化
pub use crate::config::{CustomConfigBuilder, EnhancerConfig, DEFAULT_GROUPING_ENHANCEMENTS_ID};
pub use crate::global::{enhancer_config, init_enhancer};

// 导出规则集核心接口
pub use crate::enhancements::{
    global_registry, BaseRegistry, EnhancementRuleDict, Enhancements, EnhancementsDict,
};

// 导出帧记录与分组组件
pub use crate::frame::{Frame, FrameData};
pub use crate::grouping::{
    FrameCounts, FrameGroupingComponent, GroupingVariant, StacktraceGroupingComponent,
};

pub use crate::profiling::keep_profiling_rules;

// 引擎类型（调用方构造异常数据时使用）
pub use frame_enhancer_engine as engine;
pub use frame_enhancer_engine::ExceptionData;

// 内置基础规则集 - 仅在开启embedded-rules特性时编译
#[cfg(feature = "embedded-rules")]
#[allow(rust_analyzer::unresolved_env)] // 忽略OUT_DIR未解析提示
pub(crate) mod embedded_configs {
    use lz4_flex::decompress_size_prepended;
    use serde::Deserialize;

    use crate::error::{EnhancerError, EnhancerResult};

    /// 内置规则集条目（字段与build.rs写入的结构一致）
    #[derive(Debug, Deserialize)]
    pub(crate) struct BundledConfig {
        pub id: String,
        pub text: String,
        pub compact: String,
    }

    // 文件名由build.rs注入环境变量
    static BUNDLE_COMPRESSED: &[u8] =
        include_bytes!(concat!(env!("OUT_DIR"), "/", env!("ENHANCEMENT_CONFIGS_FILENAME")));

    /// 解压并反序列化全部内置规则集
    pub(crate) fn load() -> EnhancerResult<Vec<BundledConfig>> {
        let decompressed = decompress_size_prepended(BUNDLE_COMPRESSED).map_err(|e| {
            EnhancerError::RegistryInitError(format!(
                "LZ4 decompress failed: {:?}, bundle bytes: {}",
                e,
                BUNDLE_COMPRESSED.len()
            ))
        })?;
        Ok(serde_json::from_slice(&decompressed)?)
    }
}

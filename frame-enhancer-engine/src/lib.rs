//! frame-enhancer-engine：堆栈帧分类与分组规则引擎内核
//! 负责规则文本解析、帧匹配、分类/贡献两阶段求值以及紧凑格式编解码
//! 不持有任何全局规则集；基础规则集注册与调用方帧记录由上层crate处理

// 核心公共结构体+枚举
pub mod core;
// 内核错误定义
pub mod error;
// 通配模式编译、缓存与帧匹配器
pub mod matcher;
// 规则解析、动作与规则集求值
pub mod rule;
// 紧凑格式（MessagePack + 压缩 + base64）
pub mod codec;
// 日志预览工具
pub mod utils;

// 顶层导出常用类型
pub use core::{
    ActionRange, Component, ExceptionData, FrameFamily, FrameOffset, MatchField,
    MatchFrame, MatchFrameBuilder, ModificationResult, StacktraceState,
};
pub use error::{EngineError, EngineResult};
pub use matcher::{init_pattern_cache, FrameMatcher, MatchContext, DEFAULT_PATTERN_CACHE_CAPACITY};
pub use rule::{
    parse_enhancements, Action, ClassifierAction, ContributionAction, EnhancementRule, RuleSet,
    RuleSetVariant,
};
pub use codec::{
    decode_compact, encode_compact, encode_compact_with, Compressor, ConfigStructure,
    LATEST_VERSION, VERSIONS,
};

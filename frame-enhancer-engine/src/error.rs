//! frame-enhancer-engine 内核错误定义
//! 封装内核层所有错误：规则解析、配置引用、紧凑格式解码，基于thiserror实现类型安全处理
use thiserror::Error;

/// 内核核心错误枚举
/// 只有配置加载/解析/解码路径会失败，规则求值本身不返回错误
#[derive(Error, Debug)]
pub enum EngineError {
    // ===================== 规则解析错误 =====================
    /// 规则文本语法错误（行号从1开始）
    #[error("Invalid stack trace rule on line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// 通配模式编译失败（模式转换后的正则非法）
    #[error("Invalid pattern: {0}")]
    PatternError(String),

    // ===================== 配置错误 =====================
    /// 未知的基础规则集 / 不支持的版本号
    #[error("Invalid enhancements configuration: {0}")]
    ConfigurationError(String),

    // ===================== 紧凑格式错误 =====================
    /// 紧凑格式损坏或被截断（base64/压缩/结构）
    #[error("Invalid compact enhancements payload: {0}")]
    DecodeError(String),

    #[error("MessagePack encode failed: {0}")]
    MsgPackEncodeError(#[from] rmp_serde::encode::Error),

    #[error("MessagePack decode failed: {0}")]
    MsgPackDecodeError(#[from] rmp_serde::decode::Error),

    #[error("IO operation failed: {0}")]
    IoError(#[from] std::io::Error),
}

impl EngineError {
    /// 构造指定行号的解析错误
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        EngineError::ParseError {
            line,
            message: message.into(),
        }
    }

    /// 是否属于规则文本错误（解析失败/模式非法）
    pub fn is_parse_error(&self) -> bool {
        matches!(self, EngineError::ParseError { .. } | EngineError::PatternError(_))
    }

    pub fn is_configuration_error(&self) -> bool {
        matches!(self, EngineError::ConfigurationError(_))
    }

    /// 是否属于紧凑格式解码错误（调用方应回退为默认规则集）
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            EngineError::DecodeError(_)
                | EngineError::MsgPackDecodeError(_)
                | EngineError::IoError(_)
        )
    }
}

/// 内核层全局Result类型别名
pub type EngineResult<T> = Result<T, EngineError>;

//! 全局错误类型定义
use frame_enhancer_engine::EngineError;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnhancerError {
    // 引擎错误（解析/模式/配置/解码）
    #[error(transparent)]
    Engine(#[from] EngineError),

    // 规则集配置错误
    #[error("Unknown enhancements base: {0}")]
    UnknownBase(String),
    #[error("Unknown enhancements version: {0}")]
    UnknownVersion(u32),
    #[error("Base registry initialization failed: {0}")]
    RegistryInitError(String),

    // 序列化/反序列化错误
    #[error("JSON processing failed: {0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO operation failed: {0}")]
    IoError(#[from] IoError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl EnhancerError {
    /// 配置错误：未知基础规则集 / 未知版本
    pub fn is_configuration_error(&self) -> bool {
        match self {
            EnhancerError::UnknownBase(_) | EnhancerError::UnknownVersion(_) => true,
            EnhancerError::Engine(e) => e.is_configuration_error(),
            _ => false,
        }
    }

    /// 规则文本错误
    pub fn is_parse_error(&self) -> bool {
        matches!(self, EnhancerError::Engine(e) if e.is_parse_error())
    }

    /// 紧凑格式损坏
    pub fn is_decode_error(&self) -> bool {
        matches!(self, EnhancerError::Engine(e) if e.is_decode_error())
    }
}

// 全局Result类型
pub type EnhancerResult<T> = Result<T, EnhancerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_taxonomy() {
        assert!(EnhancerError::UnknownBase("x".into()).is_configuration_error());
        assert!(EnhancerError::UnknownVersion(9).is_configuration_error());

        let parse: EnhancerError = EngineError::parse(3, "bad").into();
        assert!(parse.is_parse_error());
        assert!(!parse.is_configuration_error());
        assert_eq!(parse.to_string(), "Invalid stack trace rule on line 3: bad");

        let decode: EnhancerError = EngineError::DecodeError("truncated".into()).into();
        assert!(decode.is_decode_error());
    }
}

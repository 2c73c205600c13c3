use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// 帧行为族（由帧平台推导，回退到事件平台）
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Serialize, Deserialize, Default)]
pub enum FrameFamily {
    Native,
    JavaScript,
    #[default]
    Other,
}

impl FrameFamily {
    /// 平台 → 行为族
    pub fn for_platform(platform: Option<&str>) -> Self {
        match platform {
            Some("objc" | "cocoa" | "swift" | "native" | "c") => FrameFamily::Native,
            Some("javascript" | "node") => FrameFamily::JavaScript,
            _ => FrameFamily::Other,
        }
    }

    /// 规则文本中的族名（`family:native,javascript`）
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "native" => Some(FrameFamily::Native),
            "javascript" => Some(FrameFamily::JavaScript),
            "other" => Some(FrameFamily::Other),
            _ => None,
        }
    }
}

impl Display for FrameFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameFamily::Native => write!(f, "native"),
            FrameFamily::JavaScript => write!(f, "javascript"),
            FrameFamily::Other => write!(f, "other"),
        }
    }
}

/// 匹配字段，定义规则可读取的全部帧/异常属性
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum MatchField {
    Path,
    Module,
    Function,
    Package,
    Family,
    App,
    Category,
    // 异常字段：同一堆栈内所有帧共享
    Type,
    Value,
    Mechanism,
}

impl MatchField {
    /// 规则key（含 `stack.` / `error.` 别名）→ 字段
    pub fn from_key(key: &str) -> Option<Self> {
        let field = match key {
            "stack.abs_path" | "path" => MatchField::Path,
            "stack.module" | "module" => MatchField::Module,
            "stack.function" | "function" => MatchField::Function,
            "stack.package" | "package" => MatchField::Package,
            "family" => MatchField::Family,
            "app" => MatchField::App,
            "category" => MatchField::Category,
            "error.type" | "type" => MatchField::Type,
            "error.value" | "value" => MatchField::Value,
            "error.mechanism" | "mechanism" => MatchField::Mechanism,
            _ => return None,
        };
        Some(field)
    }

    /// 路径型字段：大小写不敏感，`*` 不跨越 `/`
    #[inline(always)]
    pub fn is_path_like(&self) -> bool {
        matches!(self, MatchField::Path | MatchField::Package)
    }

    #[inline(always)]
    pub fn is_exception_field(&self) -> bool {
        matches!(self, MatchField::Type | MatchField::Value | MatchField::Mechanism)
    }
}

impl Display for MatchField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchField::Path => write!(f, "path"),
            MatchField::Module => write!(f, "module"),
            MatchField::Function => write!(f, "function"),
            MatchField::Package => write!(f, "package"),
            MatchField::Family => write!(f, "family"),
            MatchField::App => write!(f, "app"),
            MatchField::Category => write!(f, "category"),
            MatchField::Type => write!(f, "type"),
            MatchField::Value => write!(f, "value"),
            MatchField::Mechanism => write!(f, "mechanism"),
        }
    }
}

/// 匹配器作用的帧偏移（调用者 / 当前帧 / 被调用者）
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Serialize, Deserialize, Default)]
pub enum FrameOffset {
    /// `[ matcher ] |`，即 idx - 1
    Caller,
    #[default]
    Current,
    /// `| [ matcher ]`，即 idx + 1
    Callee,
}

impl FrameOffset {
    pub fn as_i8(&self) -> i8 {
        match self {
            FrameOffset::Caller => -1,
            FrameOffset::Current => 0,
            FrameOffset::Callee => 1,
        }
    }

    pub fn from_i8(value: i8) -> Option<Self> {
        match value {
            -1 => Some(FrameOffset::Caller),
            0 => Some(FrameOffset::Current),
            1 => Some(FrameOffset::Callee),
            _ => None,
        }
    }

    /// 计算目标帧下标，越界返回None
    #[inline(always)]
    pub fn resolve(&self, idx: usize, len: usize) -> Option<usize> {
        match self {
            FrameOffset::Caller => idx.checked_sub(1),
            FrameOffset::Current => Some(idx),
            FrameOffset::Callee => (idx + 1 < len).then_some(idx + 1),
        }
    }
}

/// 标志动作的作用范围
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Serialize, Deserialize, Default)]
pub enum ActionRange {
    /// 仅匹配帧
    #[default]
    Frame,
    /// `^`：匹配帧之后的所有帧（更靠近崩溃点）
    Up,
    /// `v`：匹配帧之前的所有帧
    Down,
    /// `@`：堆栈整体（仅group）
    Stacktrace,
}

impl ActionRange {
    pub fn prefix(&self) -> &'static str {
        match self {
            ActionRange::Frame => "",
            ActionRange::Up => "^",
            ActionRange::Down => "v",
            ActionRange::Stacktrace => "@",
        }
    }

    /// 把动作范围换算为帧下标区间
    #[inline(always)]
    pub fn frame_span(&self, idx: usize, len: usize) -> std::ops::Range<usize> {
        match self {
            ActionRange::Frame => idx..(idx + 1).min(len),
            ActionRange::Up => (idx + 1).min(len)..len,
            ActionRange::Down => 0..idx.min(len),
            ActionRange::Stacktrace => 0..0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_for_platform() {
        assert_eq!(FrameFamily::for_platform(Some("cocoa")), FrameFamily::Native);
        assert_eq!(FrameFamily::for_platform(Some("node")), FrameFamily::JavaScript);
        assert_eq!(FrameFamily::for_platform(Some("python")), FrameFamily::Other);
        assert_eq!(FrameFamily::for_platform(None), FrameFamily::Other);
    }

    #[test]
    fn test_field_aliases() {
        assert_eq!(MatchField::from_key("stack.function"), Some(MatchField::Function));
        assert_eq!(MatchField::from_key("error.mechanism"), Some(MatchField::Mechanism));
        assert_eq!(MatchField::from_key("stack.lineno"), None);
        assert!(MatchField::Package.is_path_like());
        assert!(!MatchField::Module.is_path_like());
    }

    #[test]
    fn test_range_span() {
        assert_eq!(ActionRange::Frame.frame_span(1, 3), 1..2);
        assert_eq!(ActionRange::Up.frame_span(1, 3), 2..3);
        assert_eq!(ActionRange::Down.frame_span(1, 3), 0..1);
        assert_eq!(ActionRange::Up.frame_span(2, 3), 3..3);
        assert!(ActionRange::Stacktrace.frame_span(1, 3).is_empty());
    }

    #[test]
    fn test_offset_resolve() {
        assert_eq!(FrameOffset::Caller.resolve(0, 3), None);
        assert_eq!(FrameOffset::Caller.resolve(2, 3), Some(1));
        assert_eq!(FrameOffset::Callee.resolve(2, 3), None);
        assert_eq!(FrameOffset::Callee.resolve(0, 3), Some(1));
    }
}

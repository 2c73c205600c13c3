use std::fmt::{Display, Formatter};
use std::sync::Arc;

use regex::Regex;
use rustc_hash::FxHashSet;

use super::cache::compile_glob;
use crate::core::{ExceptionData, FrameFamily, FrameOffset, MatchField, MatchFrame, ModificationResult};
use crate::error::{EngineError, EngineResult};

/// 异常字段缺失时参与匹配的占位值
pub const UNKNOWN_EXCEPTION_VALUE: &str = "<unknown>";

/// 求值上下文：只读帧投影 + 本轮分类阶段已产生的修改 + 异常上下文
/// 后续规则通过 `app:` / `category:` 能看到前序规则的决定
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    frames: &'a [MatchFrame],
    exception: &'a ExceptionData,
    modifications: Option<&'a [ModificationResult]>,
}

impl<'a> MatchContext<'a> {
    pub fn new(frames: &'a [MatchFrame], exception: &'a ExceptionData) -> Self {
        Self {
            frames,
            exception,
            modifications: None,
        }
    }

    pub fn with_modifications(
        frames: &'a [MatchFrame],
        exception: &'a ExceptionData,
        modifications: &'a [ModificationResult],
    ) -> Self {
        Self {
            frames,
            exception,
            modifications: Some(modifications),
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline(always)]
    pub fn frame(&self, idx: usize) -> &'a MatchFrame {
        &self.frames[idx]
    }

    pub fn exception(&self) -> &'a ExceptionData {
        self.exception
    }

    /// 当前 in_app（优先取本轮修改）
    pub fn in_app(&self, idx: usize) -> bool {
        self.modifications
            .and_then(|m| m.get(idx))
            .and_then(|m| m.in_app)
            .unwrap_or_else(|| self.frames[idx].in_app())
    }

    /// 当前分类（优先取本轮修改）
    pub fn category(&self, idx: usize) -> Option<&'a str> {
        self.modifications
            .and_then(|m| m.get(idx))
            .and_then(|m| m.category.as_deref())
            .or_else(|| self.frames[idx].category())
    }
}

/// 编译后的匹配模式（解析期编译一次，跨帧复用）
#[derive(Debug, Clone)]
enum CompiledPattern {
    Glob(Arc<Regex>),
    Families { families: FxHashSet<FrameFamily>, all: bool },
    App(bool),
}

/// 单个匹配条件：(字段, 模式, 是否取反, 帧偏移)
/// 纯函数：求值不修改任何帧
#[derive(Debug, Clone)]
pub struct FrameMatcher {
    /// 规则文本中书写的key（保留别名，保证渲染稳定）
    key: String,
    field: MatchField,
    pattern: String,
    negated: bool,
    offset: FrameOffset,
    compiled: CompiledPattern,
}

impl PartialEq for FrameMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.pattern == other.pattern
            && self.negated == other.negated
            && self.offset == other.offset
    }
}

impl Eq for FrameMatcher {}

impl FrameMatcher {
    /// 构建并编译匹配器
    /// 失败原因：未知字段、空模式、非法通配、非法 family/app 取值
    pub fn new(key: &str, pattern: &str, negated: bool, offset: FrameOffset) -> EngineResult<Self> {
        let field = MatchField::from_key(key)
            .ok_or_else(|| EngineError::PatternError(format!("unknown matcher field '{}'", key)))?;
        if pattern.is_empty() {
            return Err(EngineError::PatternError(format!(
                "empty pattern for matcher '{}'",
                key
            )));
        }

        let compiled = match field {
            MatchField::Family => Self::compile_families(pattern)?,
            MatchField::App => CompiledPattern::App(Self::parse_app_flag(pattern)?),
            f if f.is_path_like() => {
                CompiledPattern::Glob(compile_glob(&pattern.to_lowercase(), true)?)
            }
            _ => CompiledPattern::Glob(compile_glob(pattern, false)?),
        };

        Ok(Self {
            key: key.to_string(),
            field,
            pattern: pattern.to_string(),
            negated,
            offset,
            compiled,
        })
    }

    fn compile_families(pattern: &str) -> EngineResult<CompiledPattern> {
        let mut families = FxHashSet::default();
        let mut all = false;
        for name in pattern.split(',').map(str::trim) {
            if name == "all" {
                all = true;
                continue;
            }
            let family = FrameFamily::from_name(name)
                .ok_or_else(|| EngineError::PatternError(format!("unknown family '{}'", name)))?;
            families.insert(family);
        }
        Ok(CompiledPattern::Families { families, all })
    }

    fn parse_app_flag(pattern: &str) -> EngineResult<bool> {
        match pattern {
            "yes" | "true" | "1" => Ok(true),
            "no" | "false" | "0" => Ok(false),
            other => Err(EngineError::PatternError(format!(
                "invalid app matcher value '{}'",
                other
            ))),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn field(&self) -> MatchField {
        self.field
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn negated(&self) -> bool {
        self.negated
    }

    pub fn offset(&self) -> FrameOffset {
        self.offset
    }

    /// 仅依赖异常上下文（与具体帧无关）
    pub fn is_exception_matcher(&self) -> bool {
        self.field.is_exception_field()
    }

    /// 对第idx帧求值；偏移后帧不存在时恒为false（不受取反影响）
    #[inline(always)]
    pub fn matches_frame(&self, ctx: &MatchContext<'_>, idx: usize) -> bool {
        let Some(target) = self.offset.resolve(idx, ctx.len()) else {
            return false;
        };
        self.positive_match(ctx, target) != self.negated
    }

    fn positive_match(&self, ctx: &MatchContext<'_>, idx: usize) -> bool {
        let frame = ctx.frame(idx);
        match (&self.compiled, self.field) {
            (CompiledPattern::Families { families, all }, _) => {
                *all || families.contains(&frame.family())
            }
            (CompiledPattern::App(flag), _) => ctx.in_app(idx) == *flag,
            (CompiledPattern::Glob(re), MatchField::Path) => {
                frame.path().is_some_and(|v| Self::path_like_match(re, v))
            }
            (CompiledPattern::Glob(re), MatchField::Package) => {
                frame.package().is_some_and(|v| Self::path_like_match(re, v))
            }
            (CompiledPattern::Glob(re), MatchField::Module) => {
                frame.module().is_some_and(|v| re.is_match(v))
            }
            (CompiledPattern::Glob(re), MatchField::Function) => {
                frame.function().is_some_and(|v| re.is_match(v))
            }
            (CompiledPattern::Glob(re), MatchField::Category) => {
                ctx.category(idx).is_some_and(|v| re.is_match(v))
            }
            (CompiledPattern::Glob(re), field) => {
                let exception = ctx.exception();
                let value = match field {
                    MatchField::Type => exception.ty.as_deref(),
                    MatchField::Value => exception.value.as_deref(),
                    MatchField::Mechanism => exception.mechanism.as_deref(),
                    _ => return false,
                };
                re.is_match(value.unwrap_or(UNKNOWN_EXCEPTION_VALUE))
            }
        }
    }

    /// 相对路径额外按 `/` + 路径再试一次，使 `**/foo.py` 能匹配 `foo.py`
    #[inline(always)]
    fn path_like_match(re: &Regex, value: &str) -> bool {
        if re.is_match(value) {
            return true;
        }
        !value.starts_with('/') && re.is_match(&format!("/{}", value))
    }

    /// 单个匹配器的文本形式（不含偏移包装）
    fn fmt_inner(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.negated {
            f.write_str("!")?;
        }
        write!(f, "{}:", self.key)?;
        if needs_quoting(&self.pattern) {
            f.write_str("\"")?;
            for ch in self.pattern.chars() {
                if ch == '"' || ch == '\\' {
                    f.write_str("\\")?;
                }
                write!(f, "{}", ch)?;
            }
            f.write_str("\"")
        } else {
            f.write_str(&self.pattern)
        }
    }
}

/// 含空白或括号/竖线的模式需要加引号，否则渲染文本无法原样解析回来
fn needs_quoting(pattern: &str) -> bool {
    pattern.is_empty()
        || pattern.starts_with('"')
        || pattern
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '[' | ']' | '|'))
}

impl Display for FrameMatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.offset {
            FrameOffset::Caller => {
                f.write_str("[ ")?;
                self.fmt_inner(f)?;
                f.write_str(" ] |")
            }
            FrameOffset::Current => self.fmt_inner(f),
            FrameOffset::Callee => {
                f.write_str("| [ ")?;
                self.fmt_inner(f)?;
                f.write_str(" ]")
            }
        }
    }
}

use serde::{Deserialize, Serialize};

use super::enums::FrameFamily;

/// 路径型值标准化：小写 + 反斜杠转正斜杠
#[inline(always)]
pub fn normalize_path_like(value: &str) -> String {
    value.to_lowercase().replace('\\', "/")
}

/// 帧的只读匹配投影
/// 每次求值为每帧构建一次，之后不再修改；规则只能看到这里暴露的属性
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchFrame {
    category: Option<String>,
    family: FrameFamily,
    function: Option<String>,
    in_app: bool,
    in_app_changed: bool,
    module: Option<String>,
    package: Option<String>,
    path: Option<String>,
}

impl MatchFrame {
    pub fn builder() -> MatchFrameBuilder {
        MatchFrameBuilder::default()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn family(&self) -> FrameFamily {
        self.family
    }

    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    pub fn in_app(&self) -> bool {
        self.in_app
    }

    /// 分类阶段是否修改过该帧的 in_app
    pub fn in_app_changed(&self) -> bool {
        self.in_app_changed
    }

    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// 已标准化（小写、`/` 分隔）
    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    /// 已标准化（小写、`/` 分隔）
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

/// MatchFrame 构建器（链式 API）
#[derive(Debug, Clone, Default)]
pub struct MatchFrameBuilder {
    frame: MatchFrame,
}

impl MatchFrameBuilder {
    pub fn category(mut self, category: Option<impl Into<String>>) -> Self {
        self.frame.category = category.map(Into::into);
        self
    }

    pub fn family(mut self, family: FrameFamily) -> Self {
        self.frame.family = family;
        self
    }

    /// `?` 视为缺失函数名
    pub fn function(mut self, function: Option<impl Into<String>>) -> Self {
        self.frame.function = function.map(Into::into).filter(|f| f != "?");
        self
    }

    pub fn in_app(mut self, in_app: bool) -> Self {
        self.frame.in_app = in_app;
        self
    }

    pub fn in_app_changed(mut self, changed: bool) -> Self {
        self.frame.in_app_changed = changed;
        self
    }

    pub fn module(mut self, module: Option<impl Into<String>>) -> Self {
        self.frame.module = module.map(Into::into);
        self
    }

    pub fn package(mut self, package: Option<impl AsRef<str>>) -> Self {
        self.frame.package = package.map(|p| normalize_path_like(p.as_ref()));
        self
    }

    pub fn path(mut self, path: Option<impl AsRef<str>>) -> Self {
        self.frame.path = path.map(|p| normalize_path_like(p.as_ref()));
        self
    }

    pub fn build(self) -> MatchFrame {
        self.frame
    }
}

/// 异常上下文（类型/值/机制），同一堆栈所有帧共享
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionData {
    #[serde(rename = "type", default)]
    pub ty: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub mechanism: Option<String>,
}

impl ExceptionData {
    pub fn new(
        ty: Option<impl Into<String>>,
        value: Option<impl Into<String>>,
        mechanism: Option<impl Into<String>>,
    ) -> Self {
        Self {
            ty: ty.map(Into::into),
            value: value.map(Into::into),
            mechanism: mechanism.map(Into::into),
        }
    }
}

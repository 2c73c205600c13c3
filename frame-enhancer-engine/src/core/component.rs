use serde::{Deserialize, Serialize};

/// 分类阶段单帧结果
/// None 表示没有任何规则触及该目标，调用方保留原值
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModificationResult {
    pub category: Option<String>,
    pub in_app: Option<bool>,
}

/// 贡献阶段的帧组件（引擎侧视图，只含贡献标记与提示）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub contributes: bool,
    pub hint: Option<String>,
}

impl Component {
    pub fn new(contributes: bool) -> Self {
        Self {
            contributes,
            hint: None,
        }
    }

    pub fn with_hint(contributes: bool, hint: Option<String>) -> Self {
        Self { contributes, hint }
    }
}

impl Default for Component {
    fn default() -> Self {
        Self::new(true)
    }
}

/// 堆栈级结果：贡献标记、提示、是否反转堆栈
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StacktraceState {
    pub contributes: bool,
    pub hint: Option<String>,
    pub invert_stacktrace: bool,
}

impl Default for StacktraceState {
    fn default() -> Self {
        Self {
            contributes: true,
            hint: None,
            invert_stacktrace: false,
        }
    }
}

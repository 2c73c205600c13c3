use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// 分组变体：决定系统帧能否参与分组
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupingVariant {
    /// 只有应用内帧参与分组
    App,
    /// 所有帧参与分组
    System,
    #[default]
    Default,
}

impl GroupingVariant {
    /// 变体名 → 变体；未识别的名称按默认变体处理
    pub fn from_name(name: &str) -> Self {
        match name {
            "app" => GroupingVariant::App,
            "system" => GroupingVariant::System,
            _ => GroupingVariant::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupingVariant::App => "app",
            GroupingVariant::System => "system",
            GroupingVariant::Default => "default",
        }
    }
}

impl Display for GroupingVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! 调用方帧记录
//! 规则求值只读 MatchFrame 投影；分类结果通过本模块写回帧记录

use frame_enhancer_engine::{FrameFamily, MatchFrame};
use serde::{Deserialize, Deserializer, Serialize};

/// 堆栈帧（事件中的原始记录，仅包含规则涉及的字段）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abs_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_app: Option<bool>,
    #[serde(default)]
    pub data: FrameData,
}

/// 帧附加数据（规则写回的内容）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// in_app 首次被规则修改前的值：1 / 0 / -1（未设置）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig_in_app: Option<i8>,
    /// 进入分类前客户端上报的 in_app；外层None表示尚未记录
    #[serde(
        default,
        deserialize_with = "deserialize_recorded",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_in_app: Option<Option<bool>>,
}

/// 字段存在即视为已记录（即使值为null）
fn deserialize_recorded<'de, D>(deserializer: D) -> Result<Option<Option<bool>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<bool>::deserialize(deserializer).map(Some)
}

impl Frame {
    /// 修改 in_app；值发生变化时记录原值（只记录第一次）
    pub fn set_in_app(&mut self, value: bool) {
        if self.in_app == Some(value) {
            return;
        }
        let orig = match self.in_app {
            Some(true) => 1,
            Some(false) => 0,
            None => -1,
        };
        self.data.orig_in_app.get_or_insert(orig);
        self.in_app = Some(value);
    }

    /// 记录客户端原始 in_app（已记录则不覆盖）
    pub fn record_client_in_app(&mut self) {
        if self.data.client_in_app.is_none() {
            self.data.client_in_app = Some(self.in_app);
        }
    }

    /// 规则是否改变过该帧的 in_app
    pub fn in_app_changed(&self) -> bool {
        let current = i8::from(self.in_app.unwrap_or(false));
        self.data.orig_in_app.is_some_and(|orig| orig != current)
    }

    /// 构建匹配投影；帧平台缺失时回退到事件平台
    pub fn create_match_frame(&self, platform: Option<&str>) -> MatchFrame {
        let family = FrameFamily::for_platform(self.platform.as_deref().or(platform));
        MatchFrame::builder()
            .category(self.data.category.as_deref())
            .family(family)
            .function(self.function.as_deref())
            .in_app(self.in_app.unwrap_or(false))
            .in_app_changed(self.in_app_changed())
            .module(self.module.as_deref())
            .package(self.package.as_deref())
            .path(self.abs_path.as_deref().or(self.filename.as_deref()))
            .build()
    }
}

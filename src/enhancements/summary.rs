use frame_enhancer_engine::EnhancementRule;
use serde::Serialize;

/// 规则集摘要（可序列化，供展示/调试）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnhancementsDict {
    pub id: Option<String>,
    pub bases: Vec<String>,
    /// 是否为当前默认规则集
    pub latest: bool,
    /// 仅旧版混合格式有值
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<EnhancementRuleDict>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier_rules: Option<Vec<EnhancementRuleDict>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributes_rules: Option<Vec<EnhancementRuleDict>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnhancementRuleDict {
    pub text: String,
    pub matchers: Vec<String>,
    pub actions: Vec<String>,
}

impl From<&EnhancementRule> for EnhancementRuleDict {
    fn from(rule: &EnhancementRule) -> Self {
        Self {
            text: rule.text().to_string(),
            matchers: rule.matchers().iter().map(ToString::to_string).collect(),
            actions: rule.actions().iter().map(ToString::to_string).collect(),
        }
    }
}

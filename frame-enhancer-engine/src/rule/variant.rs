use std::sync::Arc;

use super::enhancement_rule::EnhancementRule;
use super::rule_set::RuleSet;

/// 规则集的存储形态
/// Legacy：版本 <= 2 的混合规则列表；Split：版本 3 起的拆分形态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSetVariant {
    Legacy(Vec<Arc<EnhancementRule>>),
    Split(RuleSet),
}

impl RuleSetVariant {
    /// 转为求值使用的拆分形态（Legacy 需要逐条拆分，构造时执行一次）
    pub fn upgrade(&self) -> RuleSet {
        match self {
            RuleSetVariant::Legacy(rules) => {
                RuleSet::from_rules(rules.iter().map(|rule| EnhancementRule::clone(rule)))
            }
            RuleSetVariant::Split(rule_set) => rule_set.clone(),
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, RuleSetVariant::Legacy(_))
    }

    /// 全部规则文本（Legacy 为混合列表；Split 为分类规则在前）
    pub fn rule_texts(&self) -> Vec<String> {
        match self {
            RuleSetVariant::Legacy(rules) => rules.iter().map(|r| r.text().to_string()).collect(),
            RuleSetVariant::Split(rule_set) => rule_set
                .classifier_rules()
                .iter()
                .chain(rule_set.contributes_rules())
                .map(|r| r.text().to_string())
                .collect(),
        }
    }
}

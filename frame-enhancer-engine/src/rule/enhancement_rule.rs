use std::fmt::{Display, Formatter};

use super::action::Action;
use crate::matcher::{FrameMatcher, MatchContext};

/// 单条堆栈规则：有序匹配条件（逻辑与）+ 有序动作
/// 文本形式为匹配条件与动作的确定性渲染，用于缓存校验和提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancementRule {
    matchers: Vec<FrameMatcher>,
    actions: Vec<Action>,
    text: String,
    matcher_description: String,
    has_classifier_actions: bool,
    has_contributes_actions: bool,
}

impl EnhancementRule {
    pub fn new(matchers: Vec<FrameMatcher>, actions: Vec<Action>) -> Self {
        let matcher_description = matchers
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        let action_text = actions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        let text = if action_text.is_empty() {
            matcher_description.clone()
        } else {
            format!("{} {}", matcher_description, action_text)
        };

        Self {
            has_classifier_actions: actions.iter().any(Action::is_classifier),
            has_contributes_actions: actions.iter().any(Action::is_contribution),
            matchers,
            actions,
            text,
            matcher_description,
        }
    }

    pub fn matchers(&self) -> &[FrameMatcher] {
        &self.matchers
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// 仅匹配条件部分，用于提示文本
    pub fn matcher_description(&self) -> &str {
        &self.matcher_description
    }

    pub fn has_classifier_actions(&self) -> bool {
        self.has_classifier_actions
    }

    pub fn has_contributes_actions(&self) -> bool {
        self.has_contributes_actions
    }

    /// 只保留分类动作的新规则；无分类动作时返回None
    pub fn as_classifier_rule(&self) -> Option<Self> {
        self.has_classifier_actions
            .then(|| self.with_actions(|a| a.is_classifier()))
    }

    /// 只保留贡献动作的新规则；无贡献动作时返回None
    pub fn as_contributes_rule(&self) -> Option<Self> {
        self.has_contributes_actions
            .then(|| self.with_actions(|a| a.is_contribution()))
    }

    fn with_actions(&self, keep: impl Fn(&Action) -> bool) -> Self {
        let actions = self.actions.iter().filter(|a| keep(a)).cloned().collect();
        Self::new(self.matchers.clone(), actions)
    }

    /// 所有匹配条件都命中才算命中
    #[inline(always)]
    pub fn matches_frame(&self, ctx: &MatchContext<'_>, idx: usize) -> bool {
        self.matchers.iter().all(|m| m.matches_frame(ctx, idx))
    }
}

impl Display for EnhancementRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

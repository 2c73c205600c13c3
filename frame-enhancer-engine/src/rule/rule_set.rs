use std::sync::Arc;

use super::action::{Action, ClassifierAction, ContributionAction};
use super::enhancement_rule::EnhancementRule;
use super::parser::parse_enhancements;
use crate::core::{ActionRange, Component, ExceptionData, MatchFrame, ModificationResult, StacktraceState};
use crate::error::EngineResult;
use crate::matcher::MatchContext;

/// 已拆分的求值形态：分类规则 + 贡献规则（各自保持原始顺序）
/// 规则以Arc共享，合并基础规则集时不做深拷贝
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    classifier_rules: Vec<Arc<EnhancementRule>>,
    contributes_rules: Vec<Arc<EnhancementRule>>,
}

impl RuleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// 混合规则列表 → 拆分形态（一条规则可能同时进入两个列表）
    pub fn from_rules<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = EnhancementRule>,
    {
        let mut set = Self::default();
        for rule in rules {
            if let Some(classifier) = rule.as_classifier_rule() {
                set.classifier_rules.push(Arc::new(classifier));
            }
            if let Some(contributes) = rule.as_contributes_rule() {
                set.contributes_rules.push(Arc::new(contributes));
            }
        }
        set
    }

    /// 已拆分的两个列表（如紧凑格式解码结果）；混入的异族动作会被剔除
    pub fn from_split(classifier: Vec<EnhancementRule>, contributes: Vec<EnhancementRule>) -> Self {
        Self {
            classifier_rules: classifier
                .iter()
                .filter_map(EnhancementRule::as_classifier_rule)
                .map(Arc::new)
                .collect(),
            contributes_rules: contributes
                .iter()
                .filter_map(EnhancementRule::as_contributes_rule)
                .map(Arc::new)
                .collect(),
        }
    }

    pub fn parse(text: &str) -> EngineResult<Self> {
        Ok(Self::from_rules(parse_enhancements(text)?))
    }

    /// 追加另一规则集（基础规则在前、自身规则在后）
    pub fn extend_from(&mut self, other: &RuleSet) {
        self.classifier_rules
            .extend(other.classifier_rules.iter().cloned());
        self.contributes_rules
            .extend(other.contributes_rules.iter().cloned());
    }

    pub fn classifier_rules(&self) -> &[Arc<EnhancementRule>] {
        &self.classifier_rules
    }

    pub fn contributes_rules(&self) -> &[Arc<EnhancementRule>] {
        &self.contributes_rules
    }

    pub fn is_empty(&self) -> bool {
        self.classifier_rules.is_empty() && self.contributes_rules.is_empty()
    }

    /// 分类阶段：按顺序执行分类规则，返回每帧的 category / in_app 结果
    /// 单条规则先求出全部命中帧再执行动作；后续规则可见前序结果
    pub fn apply_modifications_to_frames(
        &self,
        frames: &[MatchFrame],
        exception: &ExceptionData,
    ) -> Vec<ModificationResult> {
        let mut results = vec![ModificationResult::default(); frames.len()];
        let mut matched = Vec::with_capacity(frames.len());

        for rule in &self.classifier_rules {
            matched.clear();
            let ctx = MatchContext::with_modifications(frames, exception, &results);
            matched.extend((0..frames.len()).filter(|&idx| rule.matches_frame(&ctx, idx)));

            for &idx in &matched {
                for action in rule.actions() {
                    if let Action::Classifier(action) = action {
                        action.apply_modification(&mut results, idx);
                    }
                }
            }
        }

        results
    }

    /// 贡献阶段：更新帧组件的 contributes / hint，并给出堆栈级结论
    /// 帧与组件数量不一致时按较短者处理
    pub fn assemble_stacktrace_component(
        &self,
        frames: &[MatchFrame],
        exception: &ExceptionData,
        components: &mut [Component],
    ) -> StacktraceState {
        let len = frames.len().min(components.len());
        if frames.len() != components.len() {
            log::warn!(
                "Frame/component count mismatch | frames: {} | components: {} | using: {}",
                frames.len(),
                components.len(),
                len
            );
        }
        let frames = &frames[..len];
        let components = &mut components[..len];
        let ctx = MatchContext::new(frames, exception);

        let mut stacktrace_verdict: Option<(bool, String)> = None;
        let mut max_frames: Option<(usize, &str)> = None;
        let mut min_frames: Option<(usize, &str)> = None;
        let mut invert_stacktrace = false;

        for rule in self.classifier_rules.iter().chain(&self.contributes_rules) {
            let description = rule.matcher_description();
            for idx in 0..len {
                if !rule.matches_frame(&ctx, idx) {
                    continue;
                }
                for action in rule.actions() {
                    match action {
                        Action::Classifier(ClassifierAction::InApp { flag, range }) => {
                            for i in range.frame_span(idx, len) {
                                let frame = &frames[i];
                                if frame.in_app_changed() && frame.in_app() == *flag {
                                    components[i].hint = Some(format!(
                                        "marked {} by stack trace rule ({})",
                                        if *flag { "in-app" } else { "out of app" },
                                        description
                                    ));
                                }
                            }
                        }
                        Action::Classifier(ClassifierAction::Category(_)) => {}
                        Action::Contribution(ContributionAction::Contributes {
                            flag,
                            range: ActionRange::Stacktrace,
                        }) => {
                            let hint = if *flag {
                                format!(
                                    "stack trace marked as contributing by stack trace rule ({})",
                                    description
                                )
                            } else {
                                format!("stack trace ignored by stack trace rule ({})", description)
                            };
                            stacktrace_verdict = Some((*flag, hint));
                        }
                        Action::Contribution(ContributionAction::Contributes { flag, range }) => {
                            for component in &mut components[range.frame_span(idx, len)] {
                                if component.contributes != *flag {
                                    component.contributes = *flag;
                                    component.hint = Some(format!(
                                        "{} by stack trace rule ({})",
                                        if *flag { "un-ignored" } else { "ignored" },
                                        description
                                    ));
                                }
                            }
                        }
                        Action::Contribution(ContributionAction::MaxFrames(n)) => {
                            max_frames = Some((*n, description));
                        }
                        Action::Contribution(ContributionAction::MinFrames(n)) => {
                            min_frames = Some((*n, description));
                        }
                        Action::Contribution(ContributionAction::InvertStacktrace(invert)) => {
                            invert_stacktrace = *invert;
                        }
                    }
                }
            }
        }

        if let Some((limit, description)) = max_frames.filter(|(n, _)| *n > 0) {
            let mut kept = 0;
            for component in components.iter_mut().rev() {
                if !component.contributes {
                    continue;
                }
                if kept < limit {
                    kept += 1;
                    continue;
                }
                component.contributes = false;
                component.hint = Some(format!(
                    "ignored because only {} {} considered by stack trace rule ({})",
                    limit,
                    if limit == 1 { "frame is" } else { "frames are" },
                    description
                ));
            }
        }

        let (mut contributes, mut hint) = match stacktrace_verdict {
            Some((flag, hint)) => (flag, Some(hint)),
            None => (components.iter().any(|c| c.contributes), None),
        };

        if let Some((threshold, description)) = min_frames.filter(|(n, _)| *n > 0) {
            let total = components.iter().filter(|c| c.contributes).count();
            if total > 0 && total < threshold {
                contributes = false;
                hint = Some(format!(
                    "discarded because stack trace only contains {} {} which is under the configured threshold by stack trace rule ({})",
                    total,
                    if total == 1 { "frame" } else { "frames" },
                    description
                ));
            }
        }

        StacktraceState {
            contributes,
            hint,
            invert_stacktrace,
        }
    }
}

use std::fmt::{Display, Formatter};

use crate::core::{ActionRange, ModificationResult};

/// 分类动作：修改帧的 in_app / category
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassifierAction {
    /// `+app` / `-app`，可带 `^` / `v` 范围
    InApp { flag: bool, range: ActionRange },
    /// `category=<ident>`
    Category(String),
}

impl ClassifierAction {
    /// 把动作写入分类结果（仅写本动作涉及的目标）
    pub fn apply_modification(&self, results: &mut [ModificationResult], idx: usize) {
        match self {
            ClassifierAction::InApp { flag, range } => {
                for i in range.frame_span(idx, results.len()) {
                    results[i].in_app = Some(*flag);
                }
            }
            ClassifierAction::Category(category) => {
                if let Some(result) = results.get_mut(idx) {
                    result.category = Some(category.clone());
                }
            }
        }
    }
}

/// 贡献动作：修改帧或堆栈整体是否参与分组
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContributionAction {
    /// `+group` / `-group`；范围为 `@` 时作用于堆栈整体
    Contributes { flag: bool, range: ActionRange },
    /// `max-frames=<n>`
    MaxFrames(usize),
    /// `min-frames=<n>`
    MinFrames(usize),
    /// `invert-stacktrace=<bool>`
    InvertStacktrace(bool),
}

/// 规则动作（带族标签）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    Classifier(ClassifierAction),
    Contribution(ContributionAction),
}

impl Action {
    #[inline(always)]
    pub fn is_classifier(&self) -> bool {
        matches!(self, Action::Classifier(_))
    }

    #[inline(always)]
    pub fn is_contribution(&self) -> bool {
        matches!(self, Action::Contribution(_))
    }
}

fn flag_sign(flag: bool) -> &'static str {
    if flag {
        "+"
    } else {
        "-"
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Classifier(ClassifierAction::InApp { flag, range }) => {
                write!(f, "{}{}app", range.prefix(), flag_sign(*flag))
            }
            Action::Classifier(ClassifierAction::Category(category)) => {
                write!(f, "category={}", category)
            }
            Action::Contribution(ContributionAction::Contributes { flag, range }) => {
                write!(f, "{}{}group", range.prefix(), flag_sign(*flag))
            }
            Action::Contribution(ContributionAction::MaxFrames(n)) => write!(f, "max-frames={}", n),
            Action::Contribution(ContributionAction::MinFrames(n)) => write!(f, "min-frames={}", n),
            Action::Contribution(ContributionAction::InvertStacktrace(invert)) => {
                write!(f, "invert-stacktrace={}", if *invert { 1 } else { 0 })
            }
        }
    }
}

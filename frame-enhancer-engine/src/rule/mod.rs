mod action;
mod enhancement_rule;
mod parser;
mod rule_set;
mod variant;

pub use action::{Action, ClassifierAction, ContributionAction};
pub use enhancement_rule::EnhancementRule;
pub use parser::{parse_action, parse_enhancements, parse_rule};
pub use rule_set::RuleSet;
pub use variant::RuleSetVariant;

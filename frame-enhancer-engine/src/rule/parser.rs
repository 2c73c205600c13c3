//! 堆栈规则文本解析器
//! 行格式：`[caller] <matcher>+ [callee] <action>+`，空行与 `#` 开头的注释行忽略
//! 解析为纯函数：相同文本总是得到结构相同的规则列表（结果参与缓存校验）

use super::action::{Action, ClassifierAction, ContributionAction};
use super::enhancement_rule::EnhancementRule;
use crate::core::{ActionRange, FrameOffset};
use crate::error::{EngineError, EngineResult};
use crate::matcher::FrameMatcher;
use crate::utils::preview_compact;

/// 解析整段规则文本；任一行非法则整体失败（错误中携带行号）
pub fn parse_enhancements(text: &str) -> EngineResult<Vec<EnhancementRule>> {
    let mut rules = Vec::new();
    for (idx, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let rule = parse_rule(line).map_err(|message| {
            log::debug!(
                "Stack trace rule rejected | line: {} | rule: {} | reason: {}",
                idx + 1,
                preview_compact(line, 120),
                message
            );
            EngineError::parse(idx + 1, message)
        })?;
        rules.push(rule);
    }
    log::debug!("Parsed {} stack trace rules", rules.len());
    Ok(rules)
}

/// 解析单行规则（不含注释/空行处理）
pub fn parse_rule(line: &str) -> Result<EnhancementRule, String> {
    let mut cursor = LineCursor::new(line);
    let mut matchers = Vec::new();
    let mut actions = Vec::new();
    let mut has_frame_matcher = false;
    let mut seen_callee = false;

    loop {
        cursor.skip_ws();
        let Some(c) = cursor.peek() else {
            break;
        };

        if actions.is_empty() && !seen_callee {
            if c == '[' {
                if !matchers.is_empty() {
                    return Err("caller matcher must come before frame matchers".to_string());
                }
                cursor.bump();
                matchers.push(parse_bracketed(&mut cursor, FrameOffset::Caller)?);
                cursor.skip_ws();
                cursor.expect('|', "expected '|' after caller matcher")?;
                continue;
            }
            if c == '|' {
                if !has_frame_matcher {
                    return Err("callee matcher must follow a frame matcher".to_string());
                }
                cursor.bump();
                cursor.skip_ws();
                cursor.expect('[', "expected '[' after '|'")?;
                matchers.push(parse_bracketed(&mut cursor, FrameOffset::Callee)?);
                seen_callee = true;
                continue;
            }
            if looks_like_matcher(cursor.rest()) {
                matchers.push(parse_matcher(&mut cursor, FrameOffset::Current, false)?);
                has_frame_matcher = true;
                continue;
            }
        } else if c == '[' || c == '|' || looks_like_matcher(cursor.rest()) {
            return Err(format!(
                "unexpected matcher after {}: '{}'",
                if seen_callee && actions.is_empty() { "callee matcher" } else { "actions" },
                cursor.take_token()
            ));
        }

        let token = cursor.take_token();
        actions.push(parse_action(token)?);
    }

    if !has_frame_matcher {
        return Err("rule has no frame matchers".to_string());
    }
    if actions.is_empty() {
        return Err("rule has no actions".to_string());
    }
    Ok(EnhancementRule::new(matchers, actions))
}

/// 解析单个动作token（规则文本与紧凑格式共用）
pub fn parse_action(token: &str) -> Result<Action, String> {
    if let Some((name, value)) = token.split_once('=') {
        return parse_var_action(name, value);
    }

    let (range, rest) = match token.as_bytes().first() {
        Some(b'^') => (ActionRange::Up, &token[1..]),
        Some(b'v') => (ActionRange::Down, &token[1..]),
        Some(b'@') => (ActionRange::Stacktrace, &token[1..]),
        _ => (ActionRange::Frame, token),
    };
    let (flag, name) = match rest.as_bytes().first() {
        Some(b'+') => (true, &rest[1..]),
        Some(b'-') => (false, &rest[1..]),
        _ => return Err(format!("unknown action '{}'", token)),
    };

    match name {
        "app" if range == ActionRange::Stacktrace => Err(format!(
            "'{}': stack trace scope only applies to group actions",
            token
        )),
        "app" => Ok(Action::Classifier(ClassifierAction::InApp { flag, range })),
        "group" => Ok(Action::Contribution(ContributionAction::Contributes { flag, range })),
        _ => Err(format!("unknown action '{}'", token)),
    }
}

fn parse_var_action(name: &str, value: &str) -> Result<Action, String> {
    let valid_ident = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !valid_ident {
        return Err(format!("invalid value '{}' for '{}'", value, name));
    }

    let parse_count = |value: &str| {
        value
            .parse::<usize>()
            .map_err(|_| format!("'{}' expects an unsigned integer, got '{}'", name, value))
    };

    match name {
        "category" => Ok(Action::Classifier(ClassifierAction::Category(value.to_string()))),
        "max-frames" => Ok(Action::Contribution(ContributionAction::MaxFrames(parse_count(value)?))),
        "min-frames" => Ok(Action::Contribution(ContributionAction::MinFrames(parse_count(value)?))),
        "invert-stacktrace" => {
            let invert = match value {
                "1" | "yes" | "true" => true,
                "0" | "no" | "false" => false,
                other => {
                    return Err(format!("'invert-stacktrace' expects a boolean, got '{}'", other))
                }
            };
            Ok(Action::Contribution(ContributionAction::InvertStacktrace(invert)))
        }
        _ => Err(format!("unknown variable action '{}'", name)),
    }
}

/// `!?key:` 前缀判定
fn looks_like_matcher(rest: &str) -> bool {
    let body = rest.strip_prefix('!').unwrap_or(rest);
    let key_len = body
        .find(|c: char| !is_key_char(c))
        .unwrap_or(body.len());
    key_len > 0 && body[key_len..].starts_with(':')
}

#[inline(always)]
fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn parse_bracketed(cursor: &mut LineCursor<'_>, offset: FrameOffset) -> Result<FrameMatcher, String> {
    cursor.skip_ws();
    if !looks_like_matcher(cursor.rest()) {
        return Err("expected a matcher inside '[ ]'".to_string());
    }
    let matcher = parse_matcher(cursor, offset, true)?;
    cursor.skip_ws();
    cursor.expect(']', "expected ']' to close matcher")?;
    Ok(matcher)
}

fn parse_matcher(
    cursor: &mut LineCursor<'_>,
    offset: FrameOffset,
    in_brackets: bool,
) -> Result<FrameMatcher, String> {
    let negated = cursor.eat('!');
    let key = cursor.take_while(is_key_char);
    cursor.expect(':', "expected ':' after matcher key")?;

    let pattern = if cursor.peek() == Some('"') {
        parse_quoted(cursor)?
    } else {
        let mut argument = cursor.take_while(|c| !c.is_whitespace()).to_string();
        // `[ function:foo]` 形式：末尾未配对的 `]` 属于括号
        if in_brackets
            && argument.ends_with(']')
            && argument.matches('[').count() < argument.matches(']').count()
        {
            argument.pop();
            cursor.pos -= 1;
        }
        argument
    };

    if pattern.is_empty() {
        return Err(format!("empty pattern for matcher '{}'", key));
    }

    FrameMatcher::new(key, &pattern, negated, offset).map_err(|e| match e {
        EngineError::PatternError(message) => message,
        other => other.to_string(),
    })
}

fn parse_quoted(cursor: &mut LineCursor<'_>) -> Result<String, String> {
    cursor.bump();
    let mut value = String::new();
    while let Some(c) = cursor.peek() {
        cursor.bump();
        match c {
            '"' => return Ok(value),
            '\\' => match cursor.peek() {
                Some(escaped) => {
                    cursor.bump();
                    value.push(escaped);
                }
                None => break,
            },
            _ => value.push(c),
        }
    }
    Err("unterminated quoted pattern".to_string())
}

/// 行内游标（按字节位置前进，始终落在字符边界上）
struct LineCursor<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> LineCursor<'a> {
    fn new(line: &'a str) -> Self {
        Self { line, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.line[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char, message: &str) -> Result<(), String> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn skip_ws(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn take_token(&mut self) -> &'a str {
        self.take_while(|c| !c.is_whitespace())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MatchField;
    use proptest::prelude::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_parse_basic_rules() {
        let text = r#"
            # comment line
            stack.function:panic_handler -app

            family:native path:**/libsystem_*.dylib -app -group
            error.type:"Connection Error" category=network
        "#;
        let rules = parse_enhancements(text).unwrap();
        assert_eq!(rules.len(), 3);

        assert_eq!(rules[0].text(), "stack.function:panic_handler -app");
        assert_eq!(rules[1].matchers().len(), 2);
        assert_eq!(rules[1].actions().len(), 2);
        assert_eq!(rules[2].matchers()[0].field(), MatchField::Type);
        assert_eq!(rules[2].matchers()[0].pattern(), "Connection Error");
        assert_eq!(rules[2].text(), "error.type:\"Connection Error\" category=network");
    }

    #[test]
    fn test_parse_ranges_and_variables() {
        let rules = parse_enhancements(
            "function:main ^-app v+group @-group max-frames=5 min-frames=2 invert-stacktrace=1",
        )
        .unwrap();
        assert_eq!(
            rules[0].text(),
            "function:main ^-app v+group @-group max-frames=5 min-frames=2 invert-stacktrace=1"
        );
        assert!(rules[0].has_classifier_actions());
        assert!(rules[0].has_contributes_actions());
    }

    #[test]
    fn test_parse_caller_and_callee() {
        let rules =
            parse_enhancements("[ function:outer ] | function:inner | [ !function:leaf ] -group").unwrap();
        let offsets: Vec<_> = rules[0].matchers().iter().map(|m| m.offset()).collect();
        assert_eq!(
            offsets,
            vec![FrameOffset::Caller, FrameOffset::Current, FrameOffset::Callee]
        );
        assert_eq!(
            rules[0].text(),
            "[ function:outer ] | function:inner | [ !function:leaf ] -group"
        );

        // 括号内不带空格
        let rules = parse_enhancements("[function:outer] | function:inner -group").unwrap();
        assert_eq!(rules[0].matchers()[0].pattern(), "outer");
    }

    #[test]
    fn test_negation() {
        let rules = parse_enhancements("!function:main -app").unwrap();
        assert!(rules[0].matchers()[0].negated());
        assert_eq!(rules[0].matchers()[0].pattern(), "main");
    }

    #[test]
    fn test_errors_name_the_line() {
        init_logger();
        let cases = [
            ("function:a -app\nstack.lineno:5 -app", 2),
            ("function:\"unterminated -app", 1),
            ("\n\nfunction:a +magic", 3),
            ("-app", 1),
            ("function:a", 1),
            ("function:a -app function:b", 1),
            ("function:a @-app", 1),
            ("function:a max-frames=lots", 1),
            ("function:a -app\n[ function:b ] function:c -app", 2),
            ("family:python -app", 1),
        ];
        for (text, line) in cases {
            match parse_enhancements(text) {
                Err(EngineError::ParseError { line: got, .. }) => {
                    assert_eq!(got, line, "wrong line for {:?}", text)
                }
                other => panic!("expected parse error for {:?}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_bare_range_prefix_is_not_an_action() {
        init_logger();
        // `v` 只是范围前缀，`-v` 不是合法动作
        match parse_enhancements("stack.function:panic_handler -v") {
            Err(EngineError::ParseError { line, message }) => {
                assert_eq!(line, 1);
                assert!(message.contains("'-v'"), "{}", message);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(parse_enhancements("stack.function:panic_handler v-app").is_ok());
    }

    #[test]
    fn test_bracket_patterns_render_back_to_same_rule() {
        let caller = FrameMatcher::new("function", "a]", false, FrameOffset::Caller).unwrap();
        let current = FrameMatcher::new("function", "-[UIApplication*", false, FrameOffset::Current).unwrap();
        let callee = FrameMatcher::new("module", "x|y", false, FrameOffset::Callee).unwrap();
        let rule = EnhancementRule::new(
            vec![caller, current, callee],
            vec![parse_action("-app").unwrap()],
        );

        let reparsed = parse_rule(rule.text()).unwrap();
        assert_eq!(reparsed, rule);
        assert_eq!(reparsed.matchers()[0].pattern(), "a]");
    }

    #[test]
    fn test_parse_action_tokens() {
        assert!(parse_action("+app").is_ok());
        assert!(parse_action("v-group").is_ok());
        assert!(parse_action("category=ui.render").is_ok());
        assert!(parse_action("app").is_err());
        assert!(parse_action("category=").is_err());
        assert!(parse_action("invert-stacktrace=maybe").is_err());
    }

    fn rule_line() -> impl Strategy<Value = String> {
        let key = prop::sample::select(vec![
            "path", "stack.module", "function", "package", "error.type", "value", "category",
        ]);
        let matcher = (any::<bool>(), key, "[a-z_*]{1,8}")
            .prop_map(|(neg, key, pattern)| format!("{}{}:{}", if neg { "!" } else { "" }, key, pattern));
        let action = prop::sample::select(vec![
            "+app", "-app", "^-app", "v+app", "+group", "-group", "@+group", "category=io",
            "max-frames=3", "min-frames=1",
        ]);
        (
            prop::collection::vec(matcher, 1..4),
            prop::collection::vec(action, 1..4),
        )
            .prop_map(|(matchers, actions)| format!("{} {}", matchers.join(" "), actions.join(" ")))
    }

    proptest! {
        #[test]
        fn prop_parsing_is_deterministic(lines in prop::collection::vec(rule_line(), 1..6)) {
            let text = lines.join("\n");
            let first = parse_enhancements(&text).unwrap();
            let second = parse_enhancements(&text).unwrap();
            prop_assert_eq!(&first, &second);

            // 渲染文本再次解析得到相同规则
            for rule in &first {
                let reparsed = parse_rule(rule.text()).unwrap();
                prop_assert_eq!(&reparsed, rule);
            }
        }
    }
}

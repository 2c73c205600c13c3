//! 性能剖析规则过滤
//! 剖析侧只支持按路径/模块/函数/包修改 in_app，其余规则整行丢弃

const PROFILING_MATCHER_PREFIXES: &[&str] = &[
    "stack.abs_path",
    "path",
    "stack.module",
    "module",
    "stack.function",
    "function",
    "stack.package",
    "package",
];

const PROFILING_ACTIONS: &[&str] = &["+app", "-app"];

/// 只保留剖析侧可用的规则行（保持原文与顺序）
pub fn keep_profiling_rules(config: &str) -> String {
    config
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| is_profiling_rule(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_profiling_rule(line: &str) -> bool {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((action, matchers)) = tokens.split_last() else {
        return false;
    };
    // 没有匹配器的行不是合法规则
    !matchers.is_empty()
        && PROFILING_ACTIONS.contains(action)
        && matchers
            .iter()
            .all(|m| PROFILING_MATCHER_PREFIXES.iter().any(|p| m.starts_with(p)))
}

//! 通配模式 → 正则源码转换
//! 路径型：`*` / `?` 不跨越 `/`，`**` 在任意位置都匹配任意内容（包括 `**foo`、`lib**.so`）
//! 标识符型：`*` 匹配任意序列
//! 两者均支持 `[...]`、`[!...]` 字符集与 `\` 转义

/// 把通配模式转换为锚定的正则源码
pub fn translate_glob(pattern: &str, path_like: bool) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2 + 8);
    // 异常值可能跨行
    out.push_str("(?s)^");

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                if path_like && chars.get(i + 1) == Some(&'*') {
                    out.push_str(".*");
                    i += 2;
                    // `***` 等价于 `**`
                    while chars.get(i) == Some(&'*') {
                        i += 1;
                    }
                    continue;
                }
                out.push_str(if path_like { "[^/]*" } else { ".*" });
            }
            '?' => out.push_str(if path_like { "[^/]" } else { "." }),
            '[' => match find_class_end(&chars, i) {
                Some(end) => {
                    push_class(&mut out, &chars[i + 1..end]);
                    i = end + 1;
                    continue;
                }
                // 未闭合的 `[` 按字面量处理
                None => out.push_str(r"\["),
            },
            '\\' => match chars.get(i + 1) {
                Some(next) => {
                    push_literal(&mut out, *next);
                    i += 2;
                    continue;
                }
                None => out.push_str(r"\\"),
            },
            c => push_literal(&mut out, c),
        }
        i += 1;
    }

    out.push('$');
    out
}

#[inline(always)]
fn push_literal(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

/// 查找字符集结束位置；`[` 或 `[!` 之后紧跟的 `]` 视为成员
fn find_class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    chars[j.min(chars.len())..]
        .iter()
        .position(|&c| c == ']')
        .map(|pos| j + pos)
}

fn push_class(out: &mut String, body: &[char]) {
    out.push('[');
    let body = match body.split_first() {
        Some(('!', rest)) => {
            out.push('^');
            rest
        }
        _ => body,
    };
    for &c in body {
        match c {
            '\\' | '[' | ']' | '^' | '&' | '~' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push(']');
}

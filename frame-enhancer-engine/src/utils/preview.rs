use std::fmt::Write;

/// 单行预览：空白折叠为单个空格，超过 max_chars 个字符时截断并追加省略号
pub fn preview_compact(s: &str, max_chars: usize) -> String {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &collapsed[..cut]),
        None => collapsed,
    }
}

/// 列表日志预览：最多展示前 `max_items` 项
/// 格式：[a, b, …] (total: N)
pub fn preview_list<S: AsRef<str>>(items: &[S], max_items: usize) -> String {
    if items.is_empty() {
        return "[empty]".to_string();
    }

    const MAX_ITEM_LEN: usize = 40;
    let mut out = String::from("[");
    for (idx, item) in items.iter().take(max_items).enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        out.push_str(&preview_compact(item.as_ref(), MAX_ITEM_LEN));
    }
    if items.len() > max_items {
        let _ = write!(out, ", …] (total: {})", items.len());
    } else {
        out.push(']');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_compact() {
        assert_eq!(preview_compact("function:a   \t -app", 100), "function:a -app");
        assert_eq!(preview_compact("abcdef", 3), "abc…");
        assert_eq!(preview_compact("abc", 3), "abc");
        assert_eq!(preview_compact("  规则  文本 ", 3), "规则 …");
    }

    #[test]
    fn test_preview_list() {
        assert_eq!(preview_list::<&str>(&[], 3), "[empty]");
        assert_eq!(preview_list(&["a", "b"], 3), "[a, b]");
        assert_eq!(preview_list(&["a", "b", "c", "d"], 2), "[a, b, …] (total: 4)");
    }
}

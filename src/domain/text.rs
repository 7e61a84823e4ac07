//! 文本工具
//!
//! 播报文本清理、语音片段 key 规范化、数字读法

/// 0-10 的英文读法，`words` 属性启用时使用
pub const DIGIT_WORDS: [&str; 11] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
];

/// 数字转读法；超出表范围时回退为阿拉伯数字
pub fn integer_to_words(value: i64) -> String {
    usize::try_from(value)
        .ok()
        .and_then(|i| DIGIT_WORDS.get(i))
        .map(|w| w.to_string())
        .unwrap_or_else(|| value.to_string())
}

/// 清理文本：合并空白、去除标点前的空格
pub fn clean(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());

    for ch in collapsed.chars() {
        if matches!(ch, '.' | ',' | '?' | '!' | ';' | ':') && out.ends_with(' ') {
            out.pop();
        }
        out.push(ch);
    }

    out
}

/// 清理并将首字母大写，用于整段播报
pub fn clean_sentence(text: &str) -> String {
    let cleaned = clean(text);
    let mut chars = cleaned.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => cleaned,
    }
}

/// 将任意显示文本转为片段 key（小写，非字母数字替换为下划线）
pub fn filename(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// 文本是否包含可朗读的字母或数字
pub fn has_words(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_alphanumeric())
}

/// 车站列表的显示文本
///
/// - 多个车站: "A, B and C"
/// - 单个车站: calling 上下文为 "A only"，否则为 "A"
pub fn station_list_phrase(names: &[String], calling: bool) -> String {
    match names {
        [] => String::new(),
        [only] if calling => format!("{} only", only),
        [only] => only.clone(),
        [head @ .., last] => format!("{} and {}", head.join(", "), last),
    }
}

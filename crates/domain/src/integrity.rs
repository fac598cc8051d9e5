use std::sync::LazyLock;

use regex::Regex;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.\-]+@([A-Za-z0-9_\-]+\.)+[A-Za-z0-9_\-]{2,4}$")
        .expect("EMAIL_PATTERN is a valid regex pattern")
});

/// 首尾是否有空白字符
pub fn has_surrounding_whitespace(value: &str) -> bool {
    value.trim() != value
}

pub fn contains_whitespace(value: &str) -> bool {
    value.chars().any(char::is_whitespace)
}

/// 基本的邮箱格式检查
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

//! 模式编译器
//!
//! 将原始查询与匹配选项编译为可执行匹配器：
//! - 字面模式下转义全部元字符，只做字面匹配
//! - 整词模式包裹 \b 边界；已锚定或含环视的模式不重复包裹
//! - 匹配永远是"查找全部"，从不是"查找第一个"
//! - 非法模式在扫描开始前一次性检出

use super::{Result, SearchError};
use crate::models::MatchOptions;
use regex::{Regex, RegexBuilder};

/// 退化为"匹配任意内容"的模式源。
/// 逐字符调用匹配器会造成命中风暴，扫描器按整行命中处理
const MATCH_ANYTHING: &[&str] = &[".", ".*", ".+", ".?", ".*?", ".+?", "^.*$"];

const LOOKAROUND_MARKERS: &[&str] = &["(?=", "(?!", "(?<=", "(?<!"];

#[derive(Debug, Clone)]
pub struct CompiledMatcher {
    regex: Regex,
    query: String,
    pattern_source: String,
    options: MatchOptions,
    /// 纯子串扫描的快速路径（字面模式且非整词、非多行）
    literal_needle: Option<String>,
    match_anything: bool,
}

impl CompiledMatcher {
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// 用户输入的原始查询
    pub fn query(&self) -> &str {
        &self.query
    }

    /// 实际编译的模式源（转义、包裹之后）
    pub fn pattern_source(&self) -> &str {
        &self.pattern_source
    }

    pub fn options(&self) -> MatchOptions {
        self.options
    }

    pub fn literal_needle(&self) -> Option<&str> {
        self.literal_needle.as_deref()
    }

    pub fn is_match_anything(&self) -> bool {
        self.match_anything
    }
}

/// 模式是否已自带边界或锚定，整词包裹会破坏其语义
fn is_boundary_anchored(pattern: &str) -> bool {
    if LOOKAROUND_MARKERS.iter().any(|m| pattern.contains(m)) {
        return true;
    }
    let starts = pattern.starts_with(r"\b") || pattern.starts_with('^');
    let ends = (pattern.ends_with(r"\b") && !pattern.ends_with(r"\\b"))
        || (pattern.ends_with('$') && !pattern.ends_with(r"\$"));
    starts && ends
}

pub fn compile_pattern(query: &str, options: &MatchOptions) -> Result<CompiledMatcher> {
    let raw = if options.use_pattern {
        query.to_string()
    } else {
        regex::escape(query)
    };

    let match_anything = options.use_pattern && MATCH_ANYTHING.contains(&query.trim());

    // 非捕获分组保证用户模式里的组号不被挪动
    let pattern_source = if options.whole_word && !is_boundary_anchored(&raw) {
        format!(r"\b(?:{})\b", raw)
    } else {
        raw
    };

    let regex = RegexBuilder::new(&pattern_source)
        .case_insensitive(!options.case_sensitive)
        .multi_line(options.use_pattern && options.multiline)
        .build()
        .map_err(SearchError::InvalidPattern)?;

    let literal_needle = if !options.use_pattern && !options.whole_word {
        Some(query.to_string())
    } else {
        None
    };

    Ok(CompiledMatcher {
        regex,
        query: query.to_string(),
        pattern_source,
        options: *options,
        literal_needle,
        match_anything,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_mode_escapes_metacharacters() {
        let options = MatchOptions::new().whole_word(true);
        let matcher = compile_pattern("a.b*c", &options).unwrap();

        assert!(matcher.regex().is_match("x a.b*c y"));
        assert!(!matcher.regex().is_match("aXbbbc"));
    }

    #[test]
    fn literal_mode_keeps_substring_fast_path() {
        let matcher = compile_pattern("a.b", &MatchOptions::new()).unwrap();
        assert_eq!(matcher.literal_needle(), Some("a.b"));

        let matcher = compile_pattern("a.b", &MatchOptions::new().whole_word(true)).unwrap();
        assert_eq!(matcher.literal_needle(), None);
    }

    #[test]
    fn whole_word_matches_word_not_substring() {
        let options = MatchOptions::new().whole_word(true);
        let matcher = compile_pattern("cat", &options).unwrap();

        assert_eq!(matcher.regex().find_iter("a cat sat").count(), 1);
        assert_eq!(matcher.regex().find_iter("category").count(), 0);
    }

    #[test]
    fn whole_word_does_not_double_wrap_anchored_pattern() {
        let options = MatchOptions::new().whole_word(true).pattern(true);
        let matcher = compile_pattern(r"\bcat\b", &options).unwrap();
        assert_eq!(matcher.pattern_source(), r"\bcat\b");

        let matcher = compile_pattern(r"^cat$", &options).unwrap();
        assert_eq!(matcher.pattern_source(), r"^cat$");
    }

    #[test]
    fn whole_word_wrap_preserves_group_numbering() {
        let options = MatchOptions::new().whole_word(true).pattern(true);
        let matcher = compile_pattern(r"(c)(a)t", &options).unwrap();

        let caps = matcher.regex().captures("a cat sat").unwrap();
        assert_eq!(caps.get(1).unwrap().as_str(), "c");
        assert_eq!(caps.get(2).unwrap().as_str(), "a");
    }

    #[test]
    fn case_insensitive_by_default() {
        let matcher = compile_pattern("Cat", &MatchOptions::new().whole_word(true)).unwrap();
        assert!(matcher.regex().is_match("the CAT sat"));

        let matcher = compile_pattern(
            "Cat",
            &MatchOptions::new().whole_word(true).case_sensitive(true),
        )
        .unwrap();
        assert!(!matcher.regex().is_match("the cat sat"));
    }

    #[test]
    fn invalid_pattern_fails_at_compile() {
        let options = MatchOptions::new().pattern(true);
        let err = compile_pattern("fo(o", &options).unwrap_err();
        assert!(matches!(err, SearchError::InvalidPattern(_)));
    }

    #[test]
    fn bad_pattern_text_is_fine_in_literal_mode() {
        let matcher = compile_pattern("fo(o", &MatchOptions::new()).unwrap();
        assert!(matcher.regex().is_match("fo(o bar"));
    }

    #[test]
    fn match_anything_detection() {
        let options = MatchOptions::new().pattern(true);
        assert!(compile_pattern(".*", &options).unwrap().is_match_anything());
        assert!(compile_pattern(".", &options).unwrap().is_match_anything());
        assert!(!compile_pattern("a.*", &options).unwrap().is_match_anything());
        // 字面模式下 .* 只是两个普通字符
        assert!(!compile_pattern(".*", &MatchOptions::new())
            .unwrap()
            .is_match_anything());
    }
}

//! Structural validation of rule values.
//!
//! These checks need no database access. Target-user checks for block and
//! hide rules live in the store because they consult the user directory.

use super::error::BlockError;
use super::safe_regex;
use crate::app_config::BlockLimits;
use once_cell::sync::Lazy;
use regex::Regex;

/// Letters of any script (CJK included), digits, combining marks, spaces and
/// common ASCII/CJK punctuation.
static KEYWORD_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[\p{L}\p{N}\p{M} \-_.,!?'"~@#&+:;/()\[\]…，。！？、：；“”‘’《》（）【】～·]+$"#)
        .expect("keyword charset pattern is valid")
});

fn check_length(value: &str, max: usize, what: &str) -> Result<(), BlockError> {
    let len = value.chars().count();
    if len == 0 || value.trim().is_empty() {
        return Err(BlockError::validation(format!("{} must not be empty", what)));
    }
    if len > max {
        return Err(BlockError::validation(format!(
            "{} must be at most {} characters",
            what, max
        )));
    }
    Ok(())
}

/// Validate a blocked keyword.
///
/// A keyword is matched literally, but when the raw text also reads as a
/// regular expression it must pass the safe-regex check, so a keyword such
/// as `(a+)+` is refused.
pub fn validate_keyword(keyword: &str, limits: &BlockLimits) -> Result<(), BlockError> {
    check_length(keyword, limits.keyword_max_length, "keyword")?;

    if !KEYWORD_CHARSET.is_match(keyword) {
        return Err(BlockError::validation(
            "keyword contains unsupported characters",
        ));
    }

    match safe_regex::check(keyword, limits.regex_max_repetitions) {
        Ok(()) | Err(safe_regex::UnsafePattern::Syntax(_)) => Ok(()),
        Err(e) => Err(BlockError::validation(format!("unsafe keyword: {}", e))),
    }
}

/// Validate a custom block pattern.
pub fn validate_regex(pattern: &str, limits: &BlockLimits) -> Result<(), BlockError> {
    check_length(pattern, limits.regex_max_length, "regex")?;

    if let Err(e) = Regex::new(pattern) {
        return Err(BlockError::validation(format!(
            "regex does not compile: {}",
            e
        )));
    }

    safe_regex::check(pattern, limits.regex_max_repetitions)
        .map_err(|e| BlockError::validation(format!("unsafe regex: {}", e)))
}

/// Validate a blocked tag id.
// TODO: ask the tag service whether the tag exists once it exposes a lookup
pub fn validate_tag(tag_id: i32) -> Result<(), BlockError> {
    if tag_id <= 0 {
        return Err(BlockError::validation("tag id must be a positive integer"));
    }
    Ok(())
}

/// Validate a target user id before it is resolved.
pub fn validate_user_id(user_id: i32) -> Result<(), BlockError> {
    if user_id <= 0 {
        return Err(BlockError::validation("user id must be a positive integer"));
    }
    Ok(())
}

/// Build the case-insensitive alternation used to match every keyword at once.
pub fn keyword_union<'a, I>(keywords: I) -> Option<Regex>
where
    I: IntoIterator<Item = &'a str>,
{
    let escaped: Vec<String> = keywords.into_iter().map(regex::escape).collect();
    if escaped.is_empty() {
        return None;
    }

    match Regex::new(&format!("(?i)(?:{})", escaped.join("|"))) {
        Ok(re) => Some(re),
        Err(e) => {
            log::error!("Failed to compile keyword union: {}", e);
            None
        }
    }
}

/// Compile a stored custom pattern for matching (case-insensitive).
pub fn compile_rule_regex(pattern: &str) -> Option<Regex> {
    match Regex::new(&format!("(?i){}", pattern)) {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("Dropping stored block regex that no longer compiles: {}", e);
            None
        }
    }
}

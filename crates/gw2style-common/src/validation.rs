//! Input validation utilities.
//!
//! Centralized validation helpers used across API routes.

use std::sync::LazyLock;

use validator::Validate;

use crate::error::StyleError;

/// Shape of a GW2 API key: two hyphenated GUID-like groups.
pub static API_KEY_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"^(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{20}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
    )
    .expect("API key pattern is valid")
});

/// Validate a request body, returning a StyleError::Validation on failure.
pub fn validate_request<T: Validate>(body: &T) -> Result<(), StyleError> {
    body.validate().map_err(|e| StyleError::Validation {
        message: format_validation_errors(e),
    })
}

/// Format validation errors into a human-readable string.
fn format_validation_errors(errors: validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for '{field}'"))
            })
        })
        .collect();
    // HashMap iteration order is unstable; keep messages deterministic.
    messages.sort();
    messages.join("; ")
}

/// Normalize a comma-separated tag filter: trimmed, empties dropped, duplicates removed.
pub fn parse_tag_list(raw: Option<&str>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.unwrap_or_default().split(',').map(str::trim) {
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_owned());
        }
    }
    tags
}

/// Validate each tag of a submitted post.
pub fn validate_tags(tags: &[String]) -> Result<(), validator::ValidationError> {
    if tags.len() > 20 {
        return Err(validator::ValidationError::new("too_many_tags")
            .with_message("A post can have at most 20 tags".into()));
    }
    if tags.iter().any(|t| t.trim().is_empty() || t.chars().count() > 50) {
        return Err(validator::ValidationError::new("invalid_tag")
            .with_message("Tags must be 1-50 characters".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_pattern_matches_real_shape() {
        assert!(API_KEY_REGEX.is_match(
            "564F181A-F0FC-114A-A55D-3C1DCD45F3767AF3848F-AB29-4EBF-9594-F91E6A75E015"
        ));
        assert!(API_KEY_REGEX.is_match(
            "564f181a-f0fc-114a-a55d-3c1dcd45f3767af3848f-ab29-4ebf-9594-f91e6a75e015"
        ));
        assert!(!API_KEY_REGEX.is_match("hunter2"));
        assert!(!API_KEY_REGEX.is_match(
            "564F181A-F0FC-114A-A55D-3C1DCD45F376 7AF3848F-AB29-4EBF-9594-F91E6A75E015"
        ));
    }

    #[test]
    fn tag_list_is_trimmed_and_deduplicated() {
        assert_eq!(
            parse_tag_list(Some(" norn , light armor,, norn ,")),
            vec!["norn".to_string(), "light armor".to_string()]
        );
        assert!(parse_tag_list(None).is_empty());
        assert!(parse_tag_list(Some(" , ")).is_empty());
    }

    #[test]
    fn tag_rules() {
        assert!(validate_tags(&["asura".into(), "heavy".into()]).is_ok());
        assert!(validate_tags(&[" ".into()]).is_err());
        assert!(validate_tags(&["x".repeat(51)]).is_err());
        let many: Vec<String> = (0..21).map(|i| format!("t{i}")).collect();
        assert!(validate_tags(&many).is_err());
    }
}

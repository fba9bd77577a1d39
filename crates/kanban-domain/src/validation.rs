use kanban_core::{KanbanError, KanbanResult};

pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_TEXT_LENGTH: usize = 10_000;

/// Trim and check a required text field.
pub fn required_text(field: &str, value: &str, max_len: usize) -> KanbanResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(KanbanError::BadRequest(format!("{} must not be empty", field)));
    }
    if trimmed.chars().count() > max_len {
        return Err(KanbanError::BadRequest(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(trimmed.to_string())
}

/// Optional text: blank input collapses to `None`.
pub fn optional_text(field: &str, value: Option<String>, max_len: usize) -> KanbanResult<Option<String>> {
    match value {
        Some(v) if !v.trim().is_empty() => required_text(field, &v, max_len).map(Some),
        _ => Ok(None),
    }
}

pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        assert_eq!(required_text("name", "  Board  ", 10).unwrap(), "Board");
        assert!(matches!(
            required_text("name", "   ", 10),
            Err(KanbanError::BadRequest(_))
        ));
        assert!(required_text("name", "abcdefghijk", 10).is_err());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text("d", None, 10).unwrap(), None);
        assert_eq!(optional_text("d", Some("  ".into()), 10).unwrap(), None);
        assert_eq!(
            optional_text("d", Some(" x ".into()), 10).unwrap(),
            Some("x".to_string())
        );
    }

    #[test]
    fn test_is_hex_color() {
        assert!(is_hex_color("#1a2B3c"));
        assert!(!is_hex_color("1a2b3c"));
        assert!(!is_hex_color("#12345"));
        assert!(!is_hex_color("#12345g"));
    }
}

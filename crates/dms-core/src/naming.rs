// Name validation for elements, services and views.
//
// Both validators trim their input and return the trimmed name. Element and
// service names forbid the full path/shell-sensitive character set; view
// names only forbid `|`, since views are addressed by `|`-separated paths.

use crate::error::DmsError;

/// Longest name accepted for elements, services and views.
pub const MAX_NAME_LENGTH: usize = 200;

const FORBIDDEN_ELEMENT_CHARS: [char; 10] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|', ';'];

fn check_common(trimmed: &str, param: &str) -> Result<(), DmsError> {
    let length = trimmed.chars().count();
    if length > MAX_NAME_LENGTH {
        return Err(DmsError::invalid(
            param,
            format!("length {length} exceeds the maximum of {MAX_NAME_LENGTH} characters"),
        ));
    }
    if trimmed.starts_with('.') || trimmed.ends_with('.') {
        return Err(DmsError::invalid(param, "must not start or end with '.'"));
    }
    if trimmed.matches('%').count() > 1 {
        return Err(DmsError::invalid(param, "must not contain more than one '%'"));
    }
    Ok(())
}

/// Validate an element or service name, returning it trimmed.
pub fn validate_name(name: &str, param: &str) -> Result<String, DmsError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DmsError::invalid(param, "must not be empty or whitespace"));
    }
    check_common(trimmed, param)?;
    if let Some(c) = trimmed.chars().find(|c| FORBIDDEN_ELEMENT_CHARS.contains(c)) {
        return Err(DmsError::invalid(
            param,
            format!("contains the forbidden character '{c}'"),
        ));
    }
    Ok(trimmed.to_owned())
}

/// Validate a view name, returning it trimmed.
///
/// An empty name is only accepted for the root view.
pub fn validate_view_name(name: &str, is_root: bool) -> Result<String, DmsError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return if is_root {
            Ok(String::new())
        } else {
            Err(DmsError::invalid("name", "must not be empty or whitespace"))
        };
    }
    check_common(trimmed, "name")?;
    if trimmed.contains('|') {
        return Err(DmsError::invalid("name", "contains the forbidden character '|'"));
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn length_boundary() {
        let ok = "a".repeat(200);
        assert_eq!(validate_name(&ok, "name").unwrap(), ok);
        assert!(validate_name(&"a".repeat(201), "name").is_err());
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(validate_name("  Router 1 ", "name").unwrap(), "Router 1");
        let padded = format!("  {}  ", "b".repeat(200));
        assert!(validate_name(&padded, "name").is_ok());
    }

    #[test]
    fn dots_at_the_edges_are_rejected() {
        assert!(validate_name(".router", "name").is_err());
        assert!(validate_name("router.", "name").is_err());
        assert!(validate_name("router.core", "name").is_ok());
    }

    #[test]
    fn percent_limit() {
        assert!(validate_name("50% load", "name").is_ok());
        assert!(validate_name("50% of 80%", "name").is_err());
    }

    #[test]
    fn forbidden_characters() {
        for bad in ["a\\b", "a/b", "a:b", "a*b", "a?b", "a\"b", "a<b", "a>b", "a|b", "a;b"] {
            assert!(validate_name(bad, "name").is_err(), "'{bad}' should be rejected");
        }
    }

    #[test]
    fn empty_names() {
        assert!(validate_name("", "name").is_err());
        assert!(validate_name("   ", "name").is_err());
        assert!(validate_view_name("  ", false).is_err());
        assert_eq!(validate_view_name("  ", true).unwrap(), "");
    }

    #[test]
    fn view_names_only_forbid_pipe() {
        assert!(validate_view_name("Site A|Rack 1", false).is_err());
        assert!(validate_view_name("50% of 80%", false).is_err());
        assert!(validate_view_name(".hidden", false).is_err());
        assert_eq!(
            validate_view_name("Sites/Rack: 1", false).unwrap(),
            "Sites/Rack: 1"
        );
        assert!(validate_view_name(&"v".repeat(201), false).is_err());
    }
}

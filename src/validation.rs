//! Field assertions used by handlers.
//!
//! Each assertion is a pure function returning the failure message; a [`Validation`]
//! collects failures per field and turns them into one 400.

use std::collections::BTreeMap;
use ::validator::ValidateUrl;

use crate::database::models::{role_access, service};
use crate::error::ApiError;

pub type Assertion = Result<(), String>;

#[derive(Debug, Default)]
pub struct Validation {
    failures: BTreeMap<String, String>,
}

impl Validation {
    pub fn new() -> Self {
        Self::default()
    }

    /// First failure per field wins
    pub fn check(&mut self, field: &str, result: Assertion) -> &mut Self {
        if let Err(message) = result {
            self.failures.entry(field.to_string()).or_insert(message);
        }
        self
    }

    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn finish(&mut self) -> Result<(), ApiError> {
        if self.failures.is_empty() {
            return Ok(());
        }
        let failures = std::mem::take(&mut self.failures);
        let message = failures
            .iter()
            .map(|(field, message)| format!("{} {}", field, message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ApiError::validation(message, failures))
    }
}

pub fn assert_id(value: i64) -> Assertion {
    if value >= 1 {
        Ok(())
    } else {
        Err("must be a valid id".to_string())
    }
}

fn assert_length(value: &str, min: usize, max: usize) -> Assertion {
    let length = value.chars().count();
    if length < min || length > max {
        return Err(format!("must have a length between {} and {}", min, max));
    }
    Ok(())
}

/// Printable text, 1-50 characters
pub fn assert_name(value: &str) -> Assertion {
    assert_length(value, 1, 50)?;
    if value.chars().any(|c| c.is_control()) {
        return Err("must contain only printable characters".to_string());
    }
    Ok(())
}

pub fn assert_long_name(value: &str) -> Assertion {
    assert_length(value, 1, 255)
}

pub fn assert_slug(value: &str) -> Assertion {
    assert_length(value, 1, 50)?;
    let valid = value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !value.starts_with('-')
        && !value.ends_with('-');
    if valid {
        Ok(())
    } else {
        Err("must be a lowercase slug".to_string())
    }
}

pub fn assert_url(value: &str) -> Assertion {
    if value.validate_url() && (value.starts_with("http://") || value.starts_with("https://")) {
        Ok(())
    } else {
        Err("must be a valid URL".to_string())
    }
}

/// Event identifiers such as `idos:feature.created` or `feature.*`
pub fn assert_trigger_name(value: &str) -> Assertion {
    assert_length(value, 1, 50)?;
    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '_' | '-' | '*'));
    if valid {
        Ok(())
    } else {
        Err("must be a valid trigger name".to_string())
    }
}

pub fn assert_trigger_list(values: &[String]) -> Assertion {
    values.iter().try_for_each(|value| assert_trigger_name(value))
}

/// Lowercase word, 1-50 characters (setting sections and properties, raw collections)
pub fn assert_identifier(value: &str) -> Assertion {
    assert_length(value, 1, 50)?;
    let valid = value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err("must contain only lowercase letters, digits, '.', '_' and '-'".to_string())
    }
}

/// Named route such as `review:listAll`
pub fn assert_route_name(value: &str) -> Assertion {
    assert_length(value, 3, 50)?;
    let valid = value.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-' | '.'))
        && value.split_once(':').map(|(group, action)| !group.is_empty() && !action.is_empty()) == Some(true);
    if valid {
        Ok(())
    } else {
        Err("must be a route name such as resource:action".to_string())
    }
}

pub fn assert_username(value: &str) -> Assertion {
    assert_length(value, 1, 50)?;
    if value.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')) {
        Ok(())
    } else {
        Err("must be a valid username".to_string())
    }
}

pub fn assert_role(value: &str) -> Assertion {
    match value {
        "user" | "admin" | "owner" | "member" | "guest" => Ok(()),
        _ => Err("must be one of user, admin, owner, member, guest".to_string()),
    }
}

pub fn assert_service_access(value: i32) -> Assertion {
    match value {
        service::ACCESS_PRIVATE | service::ACCESS_COMPANY | service::ACCESS_PUBLIC => Ok(()),
        _ => Err("must be 0 (private), 1 (company) or 2 (public)".to_string()),
    }
}

pub fn assert_role_access(value: i32) -> Assertion {
    if (role_access::ACCESS_NONE..=role_access::ACCESS_ALL).contains(&value) {
        Ok(())
    } else {
        Err("must be a combination of exec (1), write (2) and read (4)".to_string())
    }
}

/// Probability style value in `[0, 1]`
pub fn assert_support(value: f64) -> Assertion {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err("must be between 0 and 1".to_string())
    }
}

pub fn assert_score(value: f64) -> Assertion {
    if value.is_finite() {
        Ok(())
    } else {
        Err("must be a finite number".to_string())
    }
}

pub fn assert_value(value: &str) -> Assertion {
    assert_length(value, 0, 65_535)
}

pub fn assert_ip_address(value: &str) -> Assertion {
    value
        .parse::<std::net::IpAddr>()
        .map(|_| ())
        .map_err(|_| "must be a valid IP address".to_string())
}

pub fn assert_json_object(value: &serde_json::Value) -> Assertion {
    if value.is_object() {
        Ok(())
    } else {
        Err("must be an object".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls() {
        assert!(assert_url("https://example.com/hooks").is_ok());
        assert!(assert_url("ftp://example.com").is_err());
        assert!(assert_url("not a url").is_err());
    }

    #[test]
    fn slugs_and_names() {
        assert!(assert_slug("date-of-birth").is_ok());
        assert!(assert_slug("Date").is_err());
        assert!(assert_slug("-x").is_err());
        assert!(assert_name("").is_err());
        assert!(assert_name(&"x".repeat(51)).is_err());
        assert!(assert_name("Full name").is_ok());
    }

    #[test]
    fn trigger_names() {
        assert!(assert_trigger_name("idos:feature.created").is_ok());
        assert!(assert_trigger_name("feature.*").is_ok());
        assert!(assert_trigger_name("bad trigger").is_err());
        assert!(assert_trigger_list(&["a.b".to_string(), "c d".to_string()]).is_err());
    }

    #[test]
    fn route_names() {
        assert!(assert_route_name("review:listAll").is_ok());
        assert!(assert_route_name("review").is_err());
        assert!(assert_route_name(":listAll").is_err());
        assert!(assert_route_name("review:list all").is_err());
    }

    #[test]
    fn access_values() {
        assert!(assert_service_access(2).is_ok());
        assert!(assert_service_access(3).is_err());
        assert!(assert_role_access(0x07).is_ok());
        assert!(assert_role_access(0x08).is_err());
    }

    #[test]
    fn collector_combines_failures() {
        let mut validation = Validation::new();
        validation
            .check("url", assert_url("nope"))
            .check("trigger", assert_trigger_name(""))
            .check("url", assert_name(""));
        assert!(!validation.is_valid());

        let err = validation.finish().unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(
            err.message(),
            "trigger must have a length between 1 and 50; url must be a valid URL"
        );
    }

    #[test]
    fn collector_passes_when_clean() {
        let mut validation = Validation::new();
        validation.check("id", assert_id(4)).check("support", assert_support(0.5));
        assert!(validation.finish().is_ok());
    }
}

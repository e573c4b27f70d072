//! Request validation from descriptor rules, plus shared field checks.

use crate::config::ValidationRule;
use crate::error::AppError;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::OnceLock;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("email regex compiles")
    })
}

pub fn is_valid_email(s: &str) -> bool {
    email_regex().is_match(s)
}

/// Trimmed, non-empty string or a validation error naming the field.
pub fn required_text(value: &str, field: &str) -> Result<String, AppError> {
    let t = value.trim();
    if t.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(t.to_string())
}

pub fn ensure_email(value: &str, field: &str) -> Result<String, AppError> {
    let t = value.trim().to_lowercase();
    if !is_valid_email(&t) {
        return Err(AppError::Validation(format!("{} must be a valid email", field)));
    }
    Ok(t)
}

pub fn ensure_password(value: &str) -> Result<(), AppError> {
    if value.chars().count() < 8 {
        return Err(AppError::Validation("password must be at least 8 characters".into()));
    }
    Ok(())
}

pub struct RequestValidator;

impl RequestValidator {
    /// Validate body against per-column rules. All required fields must be present.
    pub fn validate(body: &Map<String, Value>, rules: &HashMap<String, ValidationRule>) -> Result<(), AppError> {
        let mut cols: Vec<_> = rules.keys().collect();
        cols.sort();
        for col in cols {
            let rule = &rules[col];
            let val = body.get(col);
            if rule.required == Some(true) && val.map_or(true, is_blank) {
                return Err(AppError::Validation(format!("{} is required", col)));
            }
            if let Some(v) = val {
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in body (for PATCH). Required fields may not be cleared.
    pub fn validate_partial(body: &Map<String, Value>, rules: &HashMap<String, ValidationRule>) -> Result<(), AppError> {
        for (col, v) in body {
            if let Some(rule) = rules.get(col) {
                if rule.required == Some(true) && is_blank(v) {
                    return Err(AppError::Validation(format!("{} cannot be cleared", col)));
                }
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let (Some(max), Some(s)) = (rule.max_length, v.as_str()) {
        if s.chars().count() > max as usize {
            return Err(AppError::Validation(format!("{} must be at most {} characters", col, max)));
        }
    }
    if let (Some(min), Some(s)) = (rule.min_length, v.as_str()) {
        if s.chars().count() < min as usize {
            return Err(AppError::Validation(format!("{} must be at least {} characters", col, min)));
        }
    }
    if let Some(ref pattern) = rule.pattern {
        let re = Regex::new(pattern).map_err(|_| AppError::Validation(format!("invalid pattern for {}", col)))?;
        if let Some(s) = v.as_str() {
            if !re.is_match(s) {
                return Err(AppError::Validation(format!("{} does not match required pattern", col)));
            }
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            let names: Vec<String> = allowed.iter().map(|a| a.as_str().map(String::from).unwrap_or_else(|| a.to_string())).collect();
            return Err(AppError::Validation(format!("{} must be one of: {}", col, names.join(", "))));
        }
    }
    if let (Some(min), Some(n)) = (rule.minimum, v.as_f64()) {
        if n < min {
            return Err(AppError::Validation(format!("{} must be at least {}", col, min)));
        }
    }
    if let (Some(max), Some(n)) = (rule.maximum, v.as_f64()) {
        if n > max {
            return Err(AppError::Validation(format!("{} must be at most {}", col, max)));
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::String(t)) => s == t,
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), AppError> {
    let Some(s) = v.as_str() else {
        return Err(AppError::Validation(format!("{} must be a string", col)));
    };
    let ok = match format.to_lowercase().as_str() {
        "email" => is_valid_email(s),
        "uuid" => uuid::Uuid::parse_str(s).is_ok(),
        "datetime" => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
        _ => true,
    };
    if !ok {
        return Err(AppError::Validation(format!("{} must be a valid {}", col, format)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules() -> HashMap<String, ValidationRule> {
        let mut r = HashMap::new();
        r.insert("email".to_string(), ValidationRule::required().format("email"));
        r.insert("status".to_string(), ValidationRule::default().allowed(&["new", "read"]));
        r.insert("when".to_string(), ValidationRule::default().format("datetime"));
        r
    }

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn email_regex_accepts_and_rejects() {
        assert!(is_valid_email("jane.doe+shop@example.co.uk"));
        assert!(!is_valid_email("jane@localhost"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@example.com"));
    }

    #[test]
    fn required_fields_must_be_present_on_create() {
        assert!(RequestValidator::validate(&obj(json!({"status": "new"})), &rules()).is_err());
        assert!(RequestValidator::validate(&obj(json!({"email": "  "})), &rules()).is_err());
        assert!(RequestValidator::validate(&obj(json!({"email": "a@b.io"})), &rules()).is_ok());
    }

    #[test]
    fn partial_validation_ignores_missing_but_rejects_cleared_required() {
        assert!(RequestValidator::validate_partial(&obj(json!({"status": "read"})), &rules()).is_ok());
        assert!(RequestValidator::validate_partial(&obj(json!({"email": null})), &rules()).is_err());
        assert!(RequestValidator::validate_partial(&obj(json!({"status": "archived"})), &rules()).is_err());
    }

    #[test]
    fn datetime_format_is_rfc3339() {
        assert!(RequestValidator::validate_partial(&obj(json!({"when": "2025-03-01T10:00:00Z"})), &rules()).is_ok());
        assert!(RequestValidator::validate_partial(&obj(json!({"when": "tomorrow"})), &rules()).is_err());
    }
}

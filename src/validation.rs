//! Declarative form validation: each form lists `(field, check, message)`
//! rules and `validate` reports the first failing rule per field.

use chrono::NaiveDate;
use serde::Serialize;
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Required,
    Digits,
    ExactLen(usize),
    MinLen(usize),
    MaxLen(usize),
    /// `YYYY-MM-DD`.
    Date,
    DateNotFuture,
    Url,
    MatchesField(&'static str),
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub field: &'static str,
    pub check: Check,
    pub message: Cow<'static, str>,
}

impl Rule {
    pub fn new(field: &'static str, check: Check, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            field,
            check,
            message: message.into(),
        }
    }
}

pub trait Form {
    /// Raw value of a named field; `None` when the form does not carry it.
    fn field(&self, name: &str) -> Option<&str>;
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn is_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    let Some(rest) = rest else {
        return false;
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    !host.is_empty() && !value.chars().any(char::is_whitespace)
}

fn passes(check: Check, value: &str, form: &dyn Form, today: NaiveDate) -> bool {
    let trimmed = value.trim();
    if check == Check::Required {
        return !trimmed.is_empty();
    }
    // Optional fields only get checked once they hold something.
    if trimmed.is_empty() {
        return form_matches(check, value, form);
    }
    match check {
        Check::Required => true,
        Check::Digits => trimmed.chars().all(|c| c.is_ascii_digit()),
        Check::ExactLen(n) => trimmed.chars().count() == n,
        Check::MinLen(n) => value.chars().count() >= n,
        Check::MaxLen(n) => trimmed.chars().count() <= n,
        Check::Date => parse_date(trimmed).is_some(),
        Check::DateNotFuture => parse_date(trimmed).map(|d| d <= today).unwrap_or(true),
        Check::Url => is_url(trimmed),
        Check::MatchesField(_) => form_matches(check, value, form),
    }
}

fn form_matches(check: Check, value: &str, form: &dyn Form) -> bool {
    match check {
        Check::MatchesField(other) => form.field(other).unwrap_or("") == value,
        _ => true,
    }
}

pub fn validate(form: &dyn Form, rules: &[Rule], today: NaiveDate) -> Result<(), Vec<FieldError>> {
    let mut errors: Vec<FieldError> = Vec::new();
    for rule in rules {
        if errors.iter().any(|e| e.field == rule.field) {
            continue;
        }
        let value = form.field(rule.field).unwrap_or("");
        if !passes(rule.check, value, form, today) {
            errors.push(FieldError {
                field: rule.field,
                message: rule.message.to_string(),
            });
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

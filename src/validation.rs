use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::RequestError;

pub const TITLE_MAX_LENGTH: usize = 255;
pub const PASSWORD_MIN_LENGTH: usize = 6;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email regex is valid")
});

/// Collects `"<Field> <problem>"` messages.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, problem: &str) {
        self.errors.push(format!("{field} {problem}"));
    }

    /// Records "can't be blank" and returns false when the value is missing or whitespace.
    pub fn presence(&mut self, field: &str, value: Option<&str>) -> bool {
        match value {
            Some(value) if !value.trim().is_empty() => true,
            _ => {
                self.add(field, "can't be blank");
                false
            }
        }
    }

    pub fn max_length(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(
                field,
                &format!("is too long (maximum is {max} characters)"),
            );
        }
    }

    pub fn min_length(&mut self, field: &str, value: &str, min: usize) {
        if value.chars().count() < min {
            self.add(
                field,
                &format!("is too short (minimum is {min} characters)"),
            );
        }
    }

    pub fn email_format(&mut self, field: &str, value: &str) {
        if !EMAIL_REGEX.is_match(value) {
            self.add(field, "is invalid");
        }
    }

    pub fn finish(self) -> Result<(), RequestError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(RequestError::Validation(self.errors))
        }
    }
}

pub fn validate_signup(
    name: Option<&str>,
    email: Option<&str>,
    password: Option<&str>,
    image: Option<&str>,
) -> Result<(), RequestError> {
    let mut v = Validator::new();
    v.presence("Name", name);
    if v.presence("Email", email) {
        v.email_format("Email", email.unwrap_or_default());
    }
    match password {
        Some(password) if !password.is_empty() => {
            v.min_length("Password", password, PASSWORD_MIN_LENGTH)
        }
        _ => v.add("Password", "can't be blank"),
    }
    v.presence("Image", image);
    v.finish()
}

/// Checks a post's final state: the values it will have once written.
pub fn validate_post(title: &str, body: &str, tags: &[String]) -> Result<(), RequestError> {
    let mut v = Validator::new();
    if v.presence("Title", Some(title)) {
        v.max_length("Title", title, TITLE_MAX_LENGTH);
    }
    v.presence("Body", Some(body));
    if tags.is_empty() {
        v.add("Tags", "must have at least one tag");
    }
    v.finish()
}

pub fn validate_comment(content: Option<&str>) -> Result<(), RequestError> {
    let mut v = Validator::new();
    v.presence("Content", content);
    v.finish()
}

pub fn validate_tag_name(name: Option<&str>) -> Result<(), RequestError> {
    let mut v = Validator::new();
    v.presence("Name", name);
    v.finish()
}

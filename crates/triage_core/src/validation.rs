//! Input validation
//!
//! Violations are collected rather than returned on the first failure so that
//! a client can fix every field of a form in one round trip.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{CoreError, Result};

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// Types that can check their own field constraints
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

impl<T: Validate> Validate for Option<T> {
    fn validate(&self) -> Result<()> {
        match self {
            Some(inner) => inner.validate(),
            None => Ok(()),
        }
    }
}

/// Accumulates violations for one input value
#[derive(Debug, Default)]
pub struct Validator {
    violations: Vec<FieldViolation>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn check(&mut self, field: &str, ok: bool, message: impl Into<String>) {
        if !ok {
            self.fail(field, message);
        }
    }

    /// Require `min..=max` characters
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min || len > max {
            if min == 0 {
                self.fail(field, format!("must be at most {max} characters"));
            } else {
                self.fail(field, format!("must be between {min} and {max} characters"));
            }
        }
    }

    pub fn optional_length(&mut self, field: &str, value: Option<&str>, min: usize, max: usize) {
        if let Some(value) = value {
            self.length(field, value, min, max);
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        if !is_valid_email(value) {
            self.fail(field, "must be a valid email address");
        }
    }

    pub fn range<T>(&mut self, field: &str, value: T, min: T, max: T)
    where
        T: PartialOrd + std::fmt::Display,
    {
        if value < min || value > max {
            self.fail(field, format!("must be between {min} and {max}"));
        }
    }

    /// Validate every element of a list, prefixing nested fields with `field[i]`
    pub fn each<T: Validate>(&mut self, field: &str, items: &[T]) {
        for (index, item) in items.iter().enumerate() {
            self.nested(&format!("{field}[{index}]"), item);
        }
    }

    pub fn nested<T: Validate>(&mut self, field: &str, item: &T) {
        if let Err(CoreError::Validation { fields, .. }) = item.validate() {
            for violation in fields {
                self.fail(format!("{field}.{}", violation.field), violation.message);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn finish(self) -> Result<()> {
        if self.violations.is_empty() {
            return Ok(());
        }

        let message = match self.violations.as_slice() {
            [single] => format!("{}: {}", single.field, single.message),
            many => format!("{} fields are invalid", many.len()),
        };

        Err(CoreError::Validation {
            message,
            fields: self.violations,
        })
    }
}

/// Lightweight structural check: `local@domain.tld` with no whitespace
pub fn is_valid_email(value: &str) -> bool {
    if value.len() > 254 || value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty()
        && tld.len() >= 2
        && !domain.starts_with('.')
        && !domain.contains("..")
        && domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

/// Normalise emails for storage and comparison
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

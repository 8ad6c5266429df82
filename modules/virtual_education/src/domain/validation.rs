//! Field checks shared by the services. Messages follow the wording clients
//! of the REST API already rely on.

use uuid::Uuid;

use crate::domain::error::{DomainError, FieldViolation};

pub(crate) const REQUIRED: &str = "This field is required.";
pub(crate) const BLANK: &str = "This field may not be blank.";

pub(crate) fn too_long(max: usize) -> String {
    format!("Ensure this field has no more than {max} characters.")
}

pub(crate) fn missing_pk(id: Uuid) -> String {
    format!("Invalid pk \"{id}\" - object does not exist.")
}

/// Collects every violation before failing, so clients see all bad fields at once.
#[derive(Debug, Default)]
pub(crate) struct Violations(Vec<FieldViolation>);

impl Violations {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldViolation::new(field, message));
    }

    /// Non-blank text of at most `max` characters.
    pub fn text(&mut self, field: &str, value: &str, max: Option<usize>) {
        if value.trim().is_empty() {
            self.push(field, BLANK);
        } else if let Some(max) = max {
            if value.chars().count() > max {
                self.push(field, too_long(max));
            }
        }
    }

    pub fn email(&mut self, field: &str, value: &str, max: usize) {
        self.text(field, value, Some(max));
        if !value.trim().is_empty() && !is_valid_email(value) {
            self.push(field, "Enter a valid email address.");
        }
    }

    pub fn score(&mut self, field: &str, value: f64, max: f64) {
        if !value.is_finite() || value < 0.0 {
            self.push(field, "Ensure this value is greater than or equal to 0.");
        } else if value > max {
            self.push(field, format!("Ensure this value is less than or equal to {max}."));
        }
    }

    pub fn non_negative(&mut self, field: &str, value: i32) {
        if value < 0 {
            self.push(field, "Ensure this value is greater than or equal to 0.");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), DomainError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation { violations: self.0 })
        }
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Round to two decimal places, the stored precision of scores.
pub(crate) fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

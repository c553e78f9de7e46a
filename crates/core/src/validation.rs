use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Field-level validation errors collected while checking an input form.
///
/// Keys are field names, values the messages for that field in the order
/// they were raised. `__all__` holds errors that span several fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormErrors {
    pub fields: BTreeMap<String, Vec<String>>,
}

pub const NON_FIELD: &str = "__all__";

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Append every message of `other`.
    pub fn merge(&mut self, other: FormErrors) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when nothing was recorded, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Trim a required text field and check its length (in characters).
pub fn required_text(errors: &mut FormErrors, field: &str, value: &str, max_len: usize) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, "This field is required.");
    } else if trimmed.chars().count() > max_len {
        errors.add(
            field,
            format!("Ensure this value has at most {max_len} characters."),
        );
    }
    trimmed.to_string()
}

/// Trim an optional (blank allowed) text field and check its length.
pub fn optional_text(errors: &mut FormErrors, field: &str, value: &str, max_len: usize) -> String {
    let trimmed = value.trim();
    if trimmed.chars().count() > max_len {
        errors.add(
            field,
            format!("Ensure this value has at most {max_len} characters."),
        );
    }
    trimmed.to_string()
}

/// Check a non-negative decimal against a `(max_digits, decimal_places)` column shape.
pub fn decimal(
    errors: &mut FormErrors,
    field: &str,
    value: f64,
    max_digits: u32,
    decimal_places: u32,
) {
    if !value.is_finite() {
        errors.add(field, "Enter a number.");
        return;
    }
    if value < 0.0 {
        errors.add(field, "Ensure this value is greater than or equal to 0.");
        return;
    }
    let whole_digits = max_digits - decimal_places;
    if value >= 10f64.powi(whole_digits as i32) {
        errors.add(
            field,
            format!("Ensure that there are no more than {whole_digits} digits before the decimal point."),
        );
    }
    let scaled = value * 10f64.powi(decimal_places as i32);
    if (scaled - scaled.round()).abs() > 1e-6 * scaled.abs().max(1.0) {
        errors.add(
            field,
            format!("Ensure that there are no more than {decimal_places} decimal places."),
        );
    }
}

pub fn optional_decimal(
    errors: &mut FormErrors,
    field: &str,
    value: Option<f64>,
    max_digits: u32,
    decimal_places: u32,
) {
    if let Some(v) = value {
        decimal(errors, field, v, max_digits, decimal_places);
    }
}

/// Loose email shape check: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !domain.ends_with('.')
        }
        None => false,
    }
}

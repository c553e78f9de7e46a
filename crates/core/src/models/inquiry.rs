use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{self, FormErrors};

/// A message a user leaves for the site operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: u64,
    pub author_id: u64,
    pub title: String,
    pub content: String,
    /// Refreshed on every save
    pub written_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InquiryInput {
    pub title: String,
    pub content: String,
}

impl InquiryInput {
    pub fn clean(mut self) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();
        self.title = validation::required_text(&mut errors, "title", &self.title, 100);
        if self.content.trim().is_empty() {
            errors.add("content", "This field is required.");
        }
        errors.into_result()?;
        Ok(self)
    }
}

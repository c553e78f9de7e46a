use chrono::{DateTime, Utc};

use crate::errors::CoreError;
use crate::models::database::Database;
use crate::models::inquiry::{Inquiry, InquiryInput};

/// Inquiries users leave for the operators.
///
/// Anyone may read them; only the author or a staff member may edit or delete.
pub struct InquiryService;

impl InquiryService {
    pub fn new() -> Self {
        Self
    }

    pub fn write(
        &self,
        db: &mut Database,
        author_id: u64,
        input: InquiryInput,
        now: DateTime<Utc>,
    ) -> Result<Inquiry, CoreError> {
        let input = input.clean()?;
        let inquiry = Inquiry {
            id: db.next_id(),
            author_id,
            title: input.title,
            content: input.content,
            written_at: now,
        };
        db.inquiries.push(inquiry.clone());
        Ok(inquiry)
    }

    /// Every inquiry, newest first.
    pub fn list_all<'a>(&self, db: &'a Database) -> Vec<&'a Inquiry> {
        let mut rows: Vec<&Inquiry> = db.inquiries.iter().collect();
        rows.sort_by(|a, b| b.written_at.cmp(&a.written_at).then(b.id.cmp(&a.id)));
        rows
    }

    pub fn list_by_author<'a>(&self, db: &'a Database, author_id: u64) -> Vec<&'a Inquiry> {
        self.list_all(db)
            .into_iter()
            .filter(|i| i.author_id == author_id)
            .collect()
    }

    pub fn get<'a>(&self, db: &'a Database, id: u64) -> Result<&'a Inquiry, CoreError> {
        db.inquiries
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| CoreError::not_found("Inquiry", id))
    }

    pub fn update(
        &self,
        db: &mut Database,
        actor_id: u64,
        id: u64,
        input: InquiryInput,
        now: DateTime<Utc>,
    ) -> Result<Inquiry, CoreError> {
        self.check_can_modify(db, actor_id, id)?;
        let input = input.clean()?;
        let inquiry = db
            .inquiries
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| CoreError::not_found("Inquiry", id))?;
        inquiry.title = input.title;
        inquiry.content = input.content;
        inquiry.written_at = now;
        Ok(inquiry.clone())
    }

    pub fn delete(&self, db: &mut Database, actor_id: u64, id: u64) -> Result<(), CoreError> {
        self.check_can_modify(db, actor_id, id)?;
        db.inquiries.retain(|i| i.id != id);
        Ok(())
    }

    fn check_can_modify(&self, db: &Database, actor_id: u64, id: u64) -> Result<(), CoreError> {
        let inquiry = self.get(db, id)?;
        let is_staff = db.user(actor_id).is_some_and(|u| u.is_staff);
        if inquiry.author_id != actor_id && !is_staff {
            return Err(CoreError::PermissionDenied(format!(
                "Inquiry {id} can only be changed by its author"
            )));
        }
        Ok(())
    }
}

impl Default for InquiryService {
    fn default() -> Self {
        Self::new()
    }
}

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::{CustomerId, Role};
use crate::errors::{ConflictKind, DomainError, NotFoundKind};
use crate::repos::subjects::{NewSubject, Subject, SubjectRepo};

/// Subjects keyed by external id, with unique customer-id and email indexes.
#[derive(Default)]
pub struct MemorySubjectRepo {
    by_external_id: DashMap<String, Subject>,
    customer_index: DashMap<CustomerId, String>,
    email_index: DashMap<String, String>,
    daily_sequences: DashMap<String, AtomicU64>,
}

impl MemorySubjectRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn external_id_for(&self, id: &CustomerId) -> Result<String, DomainError> {
        self.customer_index
            .get(id)
            .map(|ext| ext.value().clone())
            .ok_or_else(|| DomainError::not_found(NotFoundKind::Subject, id.to_string()))
    }

    fn modify<F>(&self, id: &CustomerId, f: F) -> Result<Subject, DomainError>
    where
        F: FnOnce(&mut Subject),
    {
        let ext = self.external_id_for(id)?;
        let mut subject = self
            .by_external_id
            .get_mut(&ext)
            .ok_or_else(|| DomainError::not_found(NotFoundKind::Subject, id.to_string()))?;
        f(subject.value_mut());
        Ok(subject.value().clone())
    }
}

#[async_trait]
impl SubjectRepo for MemorySubjectRepo {
    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Subject>, DomainError> {
        Ok(self
            .by_external_id
            .get(external_id)
            .map(|s| s.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Subject>, DomainError> {
        let Some(ext) = self.email_index.get(email).map(|e| e.value().clone()) else {
            return Ok(None);
        };
        self.find_by_external_id(&ext).await
    }

    async fn find_by_customer_id(&self, id: &CustomerId) -> Result<Option<Subject>, DomainError> {
        let Some(ext) = self.customer_index.get(id).map(|e| e.value().clone()) else {
            return Ok(None);
        };
        self.find_by_external_id(&ext).await
    }

    async fn insert(&self, new: NewSubject) -> Result<Subject, DomainError> {
        // Reserve the customer id first, then claim the external id; roll the
        // reservation back if the second step loses.
        match self.customer_index.entry(new.customer_id.clone()) {
            Entry::Occupied(_) => {
                return Err(DomainError::conflict(
                    ConflictKind::CustomerId,
                    new.customer_id.to_string(),
                ))
            }
            Entry::Vacant(slot) => {
                slot.insert(new.external_id.clone());
            }
        }

        let subject = Subject::from(new);
        match self.by_external_id.entry(subject.external_id.clone()) {
            Entry::Occupied(_) => {
                self.customer_index.remove(&subject.customer_id);
                return Err(DomainError::conflict(
                    ConflictKind::ExternalId,
                    subject.external_id,
                ));
            }
            Entry::Vacant(slot) => {
                slot.insert(subject.clone());
            }
        }

        if let Some(email) = &subject.email {
            self.email_index
                .insert(email.clone(), subject.external_id.clone());
        }
        Ok(subject)
    }

    async fn update_display_name(
        &self,
        id: &CustomerId,
        display_name: Option<String>,
    ) -> Result<Subject, DomainError> {
        self.modify(id, |s| s.display_name = display_name)
    }

    async fn set_role(&self, id: &CustomerId, role: Role) -> Result<Subject, DomainError> {
        self.modify(id, |s| s.role = role)
    }

    async fn set_password_hash(&self, id: &CustomerId, hash: String) -> Result<(), DomainError> {
        self.modify(id, |s| s.password_hash = Some(hash)).map(|_| ())
    }

    async fn delete(&self, id: &CustomerId) -> Result<(), DomainError> {
        let (_, ext) = self
            .customer_index
            .remove(id)
            .ok_or_else(|| DomainError::not_found(NotFoundKind::Subject, id.to_string()))?;
        if let Some((_, subject)) = self.by_external_id.remove(&ext) {
            if let Some(email) = subject.email {
                self.email_index.remove_if(&email, |_, owner| *owner == ext);
            }
        }
        Ok(())
    }

    async fn next_daily_sequence(&self, day: &str) -> Result<u64, DomainError> {
        let counter = self
            .daily_sequences
            .entry(day.to_string())
            .or_insert_with(|| AtomicU64::new(0));
        Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

//! Customer id allocation: atomic per-day sequence plus a collision-checked
//! insert.

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::domain::customer_id::day_key;
use crate::domain::CustomerId;
use crate::errors::{ConflictKind, DomainError};
use crate::repos::{NewSubject, Subject, SubjectRepo};

const MAX_ALLOCATION_ATTEMPTS: usize = 5;

/// Identity fields for a subject that does not exist yet.
#[derive(Debug, Clone)]
pub struct SubjectSeed {
    pub external_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

/// Create the subject with a fresh customer id. The flag is false when
/// another request created a subject for the same external id first; that
/// subject is returned instead, so an external id never maps to two subjects.
pub async fn create_subject(
    repo: &dyn SubjectRepo,
    seed: SubjectSeed,
    now: OffsetDateTime,
) -> Result<(Subject, bool), DomainError> {
    let day = day_key(now);
    for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
        let seq = repo.next_daily_sequence(&day).await?;
        let customer_id = CustomerId::allocate(now, seq)?;
        let new = NewSubject {
            external_id: seed.external_id.clone(),
            display_name: seed.display_name.clone(),
            email: seed.email.clone(),
            customer_id: customer_id.clone(),
            role: Default::default(),
            created_at: now,
        };
        match repo.insert(new).await {
            Ok(subject) => {
                info!(customer_id = %subject.customer_id, "subject created");
                return Ok((subject, true));
            }
            Err(DomainError::Conflict(ConflictKind::CustomerId, _)) => {
                warn!(%customer_id, attempt, "customer id collision; retrying");
            }
            Err(DomainError::Conflict(ConflictKind::ExternalId, _)) => {
                let existing = repo
                    .find_by_external_id(&seed.external_id)
                    .await?
                    .ok_or_else(|| {
                        DomainError::conflict(
                            ConflictKind::ExternalId,
                            "subject vanished during concurrent creation",
                        )
                    })?;
                return Ok((existing, false));
            }
            Err(other) => return Err(other),
        }
    }
    Err(DomainError::conflict(
        ConflictKind::CustomerId,
        "could not allocate a unique customer id",
    ))
}

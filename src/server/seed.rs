//! Startup seeding of the fixed user set.
//!
//! Runs once in `main` before the listener binds. Idempotency comes from the
//! store's unique name constraint, so seeding stays correct across process
//! restarts: an existing record, modified or not, is never overwritten.

use chrono::Utc;
use serde_json::json;

use crate::db::{StoreError, UserRepository};
use crate::models::UserRecord;

/// Creates the predefined users unless records with their names already
/// exist. Duplicate names are treated as already-seeded and skipped.
pub async fn seed_known_users(repo: &UserRepository) -> Result<(), StoreError> {
    for record in known_users() {
        match repo.create(&record).await {
            Ok(_) => tracing::info!("Created user: {}", record.name),
            Err(StoreError::DuplicateKey(_)) => {
                tracing::debug!("User {} already exists, skipping seed", record.name);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn known_users() -> Vec<UserRecord> {
    let created_at = Utc::now().to_rfc3339();
    vec![
        UserRecord::new("Deepak").with_subjects(vec![json!({
            "id": "deepak-subject-1",
            "name": "Data Structures",
            "description": "Learning DSA fundamentals",
            "entries": [],
            "createdAt": created_at,
        })]),
        UserRecord::new("Anjali").with_subjects(vec![json!({
            "id": "anjali-subject-1",
            "name": "Web Development",
            "description": "Full stack development",
            "entries": [],
            "createdAt": created_at,
        })]),
    ]
}

use confab_domain::Job;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Resolves `username` to a user id, creating the `User` row on first
/// reference (spec.md §3: "Created on first reference; never deleted by the
/// core").
pub async fn resolve_user(state: &AppState, username: &str) -> ApiResult<Uuid> {
    Ok(state.store.get_or_create_user(username, None).await?)
}

/// spec.md §4.1 "Only the owner's id matching the Job's owner_id may read or
/// mutate a Job through the Controller." Routes that carry a `username`
/// caller identity call this after loading the Job.
pub fn ensure_owner(job: &Job, caller: Uuid) -> ApiResult<()> {
    if job.owner_id != caller {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

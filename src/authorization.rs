use crate::errors::RequestError;

/// Only the owner of a resource may change or delete it.
pub fn can_modify(acting_user_id: i64, owner_id: i64) -> bool {
    acting_user_id == owner_id
}

pub fn ensure_owner(acting_user_id: i64, owner_id: i64) -> Result<(), RequestError> {
    if can_modify(acting_user_id, owner_id) {
        Ok(())
    } else {
        tracing::info!(acting_user_id, owner_id, "Rejected mutation by non-owner");
        Err(RequestError::Forbidden)
    }
}

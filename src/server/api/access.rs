use crate::server::response::ApiError;
use crate::store::Store;
use crate::types::{EntityType, Operation, Role, User, allowed};

/// Returns true if the user may perform `op` on records of `entity`.
/// Grants are read fresh on every call.
pub fn check_permission(
    store: &dyn Store,
    user: &User,
    entity: EntityType,
    op: Operation,
) -> Result<bool, ApiError> {
    if user.role == Role::Admin {
        return Ok(true);
    }
    let grant = store.get_permission_grant(user.id, entity)?;
    Ok(allowed(user, grant.as_ref(), op))
}

/// Check the permission, returning forbidden error if not.
pub fn require_permission(
    store: &dyn Store,
    user: &User,
    entity: EntityType,
    op: Operation,
) -> Result<(), ApiError> {
    if !check_permission(store, user, entity, op)? {
        return Err(ApiError::forbidden(format!(
            "You do not have permission to {} {} records",
            op.as_str(),
            entity.as_str()
        )));
    }
    Ok(())
}

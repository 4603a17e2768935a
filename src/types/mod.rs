mod models;
mod permission;

pub use models::*;
pub use permission::{EntityType, Operation, PermissionGrant, allowed};

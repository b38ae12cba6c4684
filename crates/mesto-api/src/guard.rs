//! Single-owner authorization: only the identity that owns a resource may
//! mutate it. There are no roles.

use uuid::Uuid;

use mesto_types::api::{CardResponse, UserResponse};

use crate::error::ApiError;
use crate::middleware::Identity;

pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

impl Owned for CardResponse {
    fn owner_id(&self) -> Uuid {
        self.owner
    }
}

/// A user record is owned by the user it describes.
impl Owned for UserResponse {
    fn owner_id(&self) -> Uuid {
        self.id
    }
}

pub fn can_mutate(actor: Identity, resource: &impl Owned) -> bool {
    actor.user_id() == resource.owner_id()
}

/// Like [`can_mutate`] but yields the 403 error for the caller to return.
pub fn ensure_can_mutate(
    actor: Identity,
    resource: &impl Owned,
    denied: &'static str,
) -> Result<(), ApiError> {
    if can_mutate(actor, resource) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(denied))
    }
}

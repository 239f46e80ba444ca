//! Ownership view over domain records.

use crate::model::identity::UserId;

/// Any record an object-level access check can be evaluated against.
pub trait OwnedResource {
    /// Owning identity. `None` for catalog records nobody owns.
    fn owner_id(&self) -> Option<UserId>;
    fn created_at(&self) -> i64;
}

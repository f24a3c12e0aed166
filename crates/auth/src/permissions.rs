//! Well-known rights and the super-group.
//!
//! Rights are opaque strings at this layer; the names below are the ones the
//! HTTP surface checks before mutating state.

use gatehouse_core::{GroupName, RightName};

/// Members of this group bypass per-right checks.
pub const ADMIN_GROUP: &str = "admin";

/// Required to delete principals.
pub const DELETE_USER: &str = "delete_user";

/// Required to change group membership or group rights.
pub const EDIT_GROUP: &str = "edit_group";

/// The default super-group name as a typed value.
pub fn admin_group() -> GroupName {
    GroupName::new(ADMIN_GROUP).expect("ADMIN_GROUP is a valid group name")
}

pub fn delete_user() -> RightName {
    RightName::new(DELETE_USER).expect("DELETE_USER is a valid right name")
}

pub fn edit_group() -> RightName {
    RightName::new(EDIT_GROUP).expect("EDIT_GROUP is a valid right name")
}

use serde::Serialize;

use gatehouse_auth::User;
use gatehouse_core::{GroupName, PrincipalName};

/// Authenticated principal for a request, as loaded from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrincipalContext {
    username: PrincipalName,
    groups: Vec<GroupName>,
}

impl From<User> for PrincipalContext {
    fn from(user: User) -> Self {
        Self {
            username: user.name,
            groups: user.groups.into_iter().collect(),
        }
    }
}

//! Form bodies and JSON responses.
//!
//! Form fields default to empty so a missing field is reported by name
//! validation (400) rather than by the extractor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatehouse_auth::OneSidedEdge;
use gatehouse_core::{CredentialHash, DomainError, GroupName, PrincipalName, RightName};

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub pswdhash: String,
}

impl CredentialsForm {
    pub fn parse(&self) -> Result<(PrincipalName, CredentialHash), DomainError> {
        Ok((
            PrincipalName::new(self.username.as_str())?,
            CredentialHash::new(self.pswdhash.as_str())?,
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct AddUserForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub pswdhash: String,
    /// Comma-separated group names.
    #[serde(default)]
    pub usergroup: String,
}

impl AddUserForm {
    pub fn credentials(&self) -> Result<(PrincipalName, CredentialHash), DomainError> {
        Ok((
            PrincipalName::new(self.username.as_str())?,
            CredentialHash::new(self.pswdhash.as_str())?,
        ))
    }

    pub fn groups(&self) -> Result<Vec<GroupName>, DomainError> {
        self.usergroup
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(GroupName::new)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct UsernameForm {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct MembershipForm {
    #[serde(default)]
    pub groupname: String,
    #[serde(default)]
    pub username: String,
}

impl MembershipForm {
    pub fn parse(&self) -> Result<(PrincipalName, GroupName), DomainError> {
        Ok((
            PrincipalName::new(self.username.as_str())?,
            GroupName::new(self.groupname.as_str())?,
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct GroupRightForm {
    #[serde(default)]
    pub groupname: String,
    #[serde(default)]
    pub right: String,
}

impl GroupRightForm {
    pub fn parse(&self) -> Result<(GroupName, RightName), DomainError> {
        Ok((
            GroupName::new(self.groupname.as_str())?,
            RightName::new(self.right.as_str())?,
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    #[serde(default)]
    pub right: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: PrincipalName,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// One-sided edges found by a scan, or removed by a repair.
#[derive(Debug, Serialize)]
pub struct EdgeReport {
    pub count: usize,
    pub repaired: bool,
    pub edges: Vec<OneSidedEdge>,
}

impl EdgeReport {
    pub fn new(edges: Vec<OneSidedEdge>, repaired: bool) -> Self {
        Self {
            count: edges.len(),
            repaired,
            edges,
        }
    }
}

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use gatehouse_core::{GroupName, PrincipalName, RightName};

use crate::error::{AuthError, AuthResult};
use crate::permissions::admin_group;
use crate::resolver::PermissionResolver;
use crate::store::{MembershipStore, UserFilter};
use crate::token::{TokenCodec, TokenError};
use crate::User;

/// Why a request was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    InvalidSignature(String),
    Expired,
    MissingRight(RightName),
}

impl core::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DenyReason::InvalidSignature(msg) => write!(f, "invalid token signature: {msg}"),
            DenyReason::Expired => f.write_str("token has expired"),
            DenyReason::MissingRight(right) => write!(f, "missing right '{right}'"),
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow { subject: PrincipalName },
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

/// Result of authenticating a bearer header without checking a right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Known(User),
    Rejected(DenyReason),
}

/// Strip the 7-character `"Bearer "` (or `"Bearer:"`) prefix from a header value.
pub fn extract_bearer(header: &str) -> AuthResult<&str> {
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("Bearer:"))
        .ok_or(AuthError::MalformedHeader)?;

    if token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }

    Ok(token)
}

/// Decides whether a bearer token grants a named right.
///
/// - No side effects
/// - No caching: the principal and its groups are re-read on every call
/// - Members of the super-group are allowed unconditionally
#[derive(Debug, Clone)]
pub struct AuthorizationGate<S> {
    codec: TokenCodec,
    resolver: PermissionResolver<S>,
    super_group: GroupName,
}

impl<S> AuthorizationGate<S>
where
    S: MembershipStore,
{
    pub fn new(codec: TokenCodec, store: S) -> Self {
        Self {
            codec,
            resolver: PermissionResolver::new(store),
            super_group: admin_group(),
        }
    }

    pub fn with_super_group(mut self, super_group: GroupName) -> Self {
        self.super_group = super_group;
        self
    }

    pub fn super_group(&self) -> &GroupName {
        &self.super_group
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn authorize(&self, header: &str, required: &RightName) -> AuthResult<Decision> {
        self.authorize_at(header, required, Utc::now())
    }

    pub fn authorize_at(
        &self,
        header: &str,
        required: &RightName,
        now: DateTime<Utc>,
    ) -> AuthResult<Decision> {
        let user = match self.authenticate_at(header, now)? {
            Identity::Known(user) => user,
            Identity::Rejected(reason) => return Ok(Decision::Deny(reason)),
        };

        if user.is_member_of(&self.super_group) {
            return Ok(Decision::Allow { subject: user.name });
        }

        let rights = self.resolver.resolve_rights(&user)?;
        if rights.contains(required) {
            Ok(Decision::Allow { subject: user.name })
        } else {
            tracing::debug!(subject = %user.name, right = %required, "right not granted");
            Ok(Decision::Deny(DenyReason::MissingRight(required.clone())))
        }
    }

    pub fn authenticate(&self, header: &str) -> AuthResult<Identity> {
        self.authenticate_at(header, Utc::now())
    }

    /// Verify the token and load its subject.
    ///
    /// A subject deleted since issuance is [`AuthError::UnknownPrincipal`],
    /// even though the token itself is still cryptographically valid.
    pub fn authenticate_at(&self, header: &str, now: DateTime<Utc>) -> AuthResult<Identity> {
        let token = extract_bearer(header)?;

        let subject = match self.codec.verify_at(token, now) {
            Ok(subject) => subject,
            Err(TokenError::Expired) => return Ok(Identity::Rejected(DenyReason::Expired)),
            Err(TokenError::InvalidSignature(msg)) => {
                return Ok(Identity::Rejected(DenyReason::InvalidSignature(msg)));
            }
            Err(other) => return Err(other.into()),
        };

        let user = self
            .resolver
            .store()
            .find_user(&UserFilter::by_name(&subject))?
            .ok_or(AuthError::UnknownPrincipal(subject))?;

        Ok(Identity::Known(user))
    }

    pub fn explain(&self, header: &str, required: &RightName) -> AuthResult<AuthorizationExplanation> {
        self.explain_at(header, required, Utc::now())
    }

    /// Explain why an authorization decision was made (or would be made).
    ///
    /// Answers "why was this request denied?" with the principal's groups and
    /// effective rights. Super-group members are granted before any group is
    /// read, as in [`Self::authorize_at`]; their listed rights come from the
    /// groups that could be read.
    pub fn explain_at(
        &self,
        header: &str,
        required: &RightName,
        now: DateTime<Utc>,
    ) -> AuthResult<AuthorizationExplanation> {
        let user = match self.authenticate_at(header, now)? {
            Identity::Known(user) => user,
            Identity::Rejected(reason) => {
                let denial = match &reason {
                    DenyReason::Expired => DenialKind::Expired,
                    _ => DenialKind::InvalidSignature,
                };
                return Ok(AuthorizationExplanation {
                    required_right: required.clone(),
                    granted: false,
                    reason: reason.to_string(),
                    principal: None,
                    denial: Some(denial),
                });
            }
        };

        let super_group_member = user.is_member_of(&self.super_group);
        let groups = if super_group_member {
            self.resolver.load_readable_groups(&user)
        } else {
            self.resolver.load_groups(&user)?
        };
        let rights: BTreeSet<RightName> = groups.iter().flat_map(|g| g.rights.iter().cloned()).collect();

        let (granted, reason, denial) = if super_group_member {
            (
                true,
                format!("principal is a member of super-group '{}'", self.super_group),
                None,
            )
        } else if rights.contains(required) {
            let granting: Vec<&str> = groups
                .iter()
                .filter(|g| g.grants(required))
                .map(|g| g.name.as_str())
                .collect();
            (
                true,
                format!("right '{required}' granted by groups {granting:?}"),
                None,
            )
        } else {
            (
                false,
                format!("principal has no group granting right '{required}'"),
                Some(DenialKind::MissingRight),
            )
        };

        Ok(AuthorizationExplanation {
            required_right: required.clone(),
            granted,
            reason,
            principal: Some(PrincipalState {
                name: user.name.clone(),
                groups: user.groups.iter().cloned().collect(),
                effective_rights: rights.into_iter().collect(),
                super_group_member,
            }),
            denial,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required_right: RightName,
    pub granted: bool,
    /// Human-readable reason for the decision.
    pub reason: String,
    /// Absent when the token itself was rejected.
    pub principal: Option<PrincipalState>,
    pub denial: Option<DenialKind>,
}

/// State of the principal at decision time.
#[derive(Debug, Clone, Serialize)]
pub struct PrincipalState {
    pub name: PrincipalName,
    pub groups: Vec<GroupName>,
    pub effective_rights: Vec<RightName>,
    pub super_group_member: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    InvalidSignature,
    Expired,
    MissingRight,
}

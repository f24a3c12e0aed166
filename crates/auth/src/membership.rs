//! Two-sided user↔group membership maintenance.
//!
//! A membership edge is recorded twice: the group name in `User::groups` and
//! the principal name in `Group::members`. The store has no cross-document
//! transaction, so every mutation writes the group side first and the user
//! side second. If the second write fails the error is surfaced as
//! [`AuthError::PartialMembershipUpdate`] and the first write is kept; a later
//! [`MembershipMutator::reconcile`] pass removes the stray side.
//!
//! Mutations hold a shared guard across both writes and reconciliation holds
//! it exclusively, so a scan never sees an edge that is still being written.
//! The guard is shared by clones of one mutator; writers in other processes
//! must be stopped before reconciling.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use gatehouse_core::{GroupName, PrincipalName, RightName};

use crate::audit::AuditSink;
use crate::error::{AuthError, AuthResult};
use crate::store::{GroupFilter, MembershipStore, SetField, SetUpdate, StoreError, UserFilter};

/// Which document holds a one-sided edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeSide {
    /// The group is in `User::groups` but the user is not in `Group::members`
    /// (or the group does not exist).
    UserOnly,
    /// The user is in `Group::members` but the group is not in `User::groups`
    /// (or the user does not exist).
    GroupOnly,
}

/// A membership edge recorded on only one side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OneSidedEdge {
    pub principal: PrincipalName,
    pub group: GroupName,
    pub present_on: EdgeSide,
}

impl core::fmt::Display for OneSidedEdge {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let side = match self.present_on {
            EdgeSide::UserOnly => "user",
            EdgeSide::GroupOnly => "group",
        };
        write!(f, "{} -> {} recorded on {side} side only", self.principal, self.group)
    }
}

/// Enforces the two-sided membership invariant across mutations.
#[derive(Clone)]
pub struct MembershipMutator<S> {
    store: S,
    audit: Arc<dyn AuditSink>,
    writes: Arc<RwLock<()>>,
}

impl<S> MembershipMutator<S>
where
    S: MembershipStore,
{
    pub fn new(store: S, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            store,
            audit,
            writes: Arc::new(RwLock::new(())),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    /// Idempotently record `user` as a member of `group`, creating the group
    /// (with no rights) on first reference.
    pub fn add_user_to_group(&self, user: &PrincipalName, group: &GroupName) -> AuthResult<()> {
        if self.store.find_user(&UserFilter::by_name(user))?.is_none() {
            return Err(AuthError::UnknownPrincipal(user.clone()));
        }

        let _writing = self.shared()?;
        self.ensure_group(group)?;
        self.store.add_to_set(&SetUpdate::group_members(group, user))?;

        let reason = match self.store.add_to_set(&SetUpdate::user_groups(user, group)) {
            Ok(outcome) if outcome.matched => None,
            Ok(_) => Some("principal record disappeared before its side was written".to_string()),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = reason {
            tracing::error!(principal = %user, group = %group, %reason, "partial membership add");
            return Err(AuthError::PartialMembershipUpdate {
                edges: vec![OneSidedEdge {
                    principal: user.clone(),
                    group: group.clone(),
                    present_on: EdgeSide::GroupOnly,
                }],
                reason,
            });
        }

        self.audit.record(&format!("User {user} added to group {group}"));
        Ok(())
    }

    /// Remove the edge from both sides. A missing membership is a no-op.
    pub fn remove_user_from_group(
        &self,
        user: &PrincipalName,
        group: &GroupName,
    ) -> AuthResult<()> {
        let _writing = self.shared()?;
        let group_side = self.store.pull(&SetUpdate::group_members(group, user))?;

        if let Err(e) = self.store.pull(&SetUpdate::user_groups(user, group)) {
            if !group_side.modified {
                return Err(e.into());
            }
            tracing::error!(principal = %user, group = %group, error = %e, "partial membership removal");
            return Err(AuthError::PartialMembershipUpdate {
                edges: vec![OneSidedEdge {
                    principal: user.clone(),
                    group: group.clone(),
                    present_on: EdgeSide::UserOnly,
                }],
                reason: e.to_string(),
            });
        }

        self.audit.record(&format!("User {user} removed from group {group}"));
        Ok(())
    }

    /// Idempotently add `right` to the group, creating the group if needed.
    pub fn grant_right(&self, group: &GroupName, right: &RightName) -> AuthResult<()> {
        self.ensure_group(group)?;
        self.store.add_to_set(&SetUpdate::group_rights(group, right))?;
        self.audit.record(&format!("Right {right} added to group {group}"));
        Ok(())
    }

    /// Idempotently remove `right` from the group. A missing group is a no-op.
    pub fn revoke_right(&self, group: &GroupName, right: &RightName) -> AuthResult<()> {
        let outcome = self.store.pull(&SetUpdate::group_rights(group, right))?;
        if outcome.modified {
            self.audit.record(&format!("Right {right} removed from group {group}"));
        }
        Ok(())
    }

    /// Delete the principal record, then pull its name from every group.
    ///
    /// Returns whether a principal record existed. Outstanding tokens for the
    /// name stay cryptographically valid and are rejected by the gate.
    pub fn delete_user(&self, name: &PrincipalName) -> AuthResult<bool> {
        let _writing = self.shared()?;
        let existing = self.store.find_user(&UserFilter::by_name(name))?;
        let removed = self.store.delete_user(name)?;

        let pulled = self
            .store
            .update_many_pull(&GroupFilter::by_member(name), SetField::GroupMembers, name.as_str())
            .map_err(|e| {
                let edges = existing
                    .iter()
                    .flat_map(|user| user.groups.iter())
                    .map(|group| OneSidedEdge {
                        principal: name.clone(),
                        group: group.clone(),
                        present_on: EdgeSide::GroupOnly,
                    })
                    .collect::<Vec<_>>();
                if removed {
                    tracing::error!(principal = %name, error = %e, "group fan-out failed after user deletion");
                    AuthError::PartialMembershipUpdate {
                        edges,
                        reason: e.to_string(),
                    }
                } else {
                    AuthError::Store(e)
                }
            })?;

        if removed {
            self.audit
                .record(&format!("User {name} deleted (removed from {pulled} groups)"));
        }
        Ok(removed)
    }

    /// Scan every user and group for edges recorded on one side only.
    pub fn find_one_sided_edges(&self) -> AuthResult<Vec<OneSidedEdge>> {
        let _quiet = self.exclusive()?;
        self.scan()
    }

    fn scan(&self) -> AuthResult<Vec<OneSidedEdge>> {
        let users = self.store.list_users()?;
        let groups = self.store.list_groups()?;

        let users_by_name: HashMap<&PrincipalName, _> = users.iter().map(|u| (&u.name, u)).collect();
        let groups_by_name: HashMap<&GroupName, _> = groups.iter().map(|g| (&g.name, g)).collect();

        let mut edges = Vec::new();

        for user in &users {
            for group in &user.groups {
                let mirrored = groups_by_name
                    .get(group)
                    .is_some_and(|g| g.has_member(&user.name));
                if !mirrored {
                    edges.push(OneSidedEdge {
                        principal: user.name.clone(),
                        group: group.clone(),
                        present_on: EdgeSide::UserOnly,
                    });
                }
            }
        }

        for group in &groups {
            for member in &group.members {
                let mirrored = users_by_name
                    .get(member)
                    .is_some_and(|u| u.is_member_of(&group.name));
                if !mirrored {
                    edges.push(OneSidedEdge {
                        principal: member.clone(),
                        group: group.name.clone(),
                        present_on: EdgeSide::GroupOnly,
                    });
                }
            }
        }

        Ok(edges)
    }

    /// Remove the recorded side of a one-sided edge.
    ///
    /// Repairs never complete an edge: a half-written add is rolled back
    /// rather than granted, so reconciliation cannot widen anyone's rights.
    /// The caller re-issues the add if it is still wanted.
    pub fn repair(&self, edge: &OneSidedEdge) -> AuthResult<()> {
        let _quiet = self.exclusive()?;
        self.pull_recorded_side(edge)
    }

    fn pull_recorded_side(&self, edge: &OneSidedEdge) -> AuthResult<()> {
        let update = match edge.present_on {
            EdgeSide::UserOnly => SetUpdate::user_groups(&edge.principal, &edge.group),
            EdgeSide::GroupOnly => SetUpdate::group_members(&edge.group, &edge.principal),
        };
        self.store.pull(&update)?;
        self.audit.record(&format!("Repaired one-sided edge: {edge}"));
        Ok(())
    }

    /// Find and repair every one-sided edge; returns the edges repaired.
    pub fn reconcile(&self) -> AuthResult<Vec<OneSidedEdge>> {
        let _quiet = self.exclusive()?;
        let edges = self.scan()?;
        for edge in &edges {
            self.pull_recorded_side(edge)?;
        }
        if !edges.is_empty() {
            tracing::warn!(count = edges.len(), "reconciled one-sided membership edges");
        }
        Ok(edges)
    }

    fn shared(&self) -> AuthResult<RwLockReadGuard<'_, ()>> {
        self.writes.read().map_err(|_| lock_poisoned())
    }

    fn exclusive(&self) -> AuthResult<RwLockWriteGuard<'_, ()>> {
        self.writes.write().map_err(|_| lock_poisoned())
    }

    fn ensure_group(&self, group: &GroupName) -> AuthResult<()> {
        if self.store.ensure_group(group)? {
            self.audit.record(&format!("Group {group} created"));
        }
        Ok(())
    }
}

fn lock_poisoned() -> AuthError {
    AuthError::Store(StoreError::Unavailable("membership lock poisoned".to_string()))
}

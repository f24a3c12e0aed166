//! `gatehouse-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! validated names for principals, groups and rights, plus the domain error.

pub mod error;
pub mod name;

pub use error::{DomainError, DomainResult};
pub use name::{CredentialHash, GroupName, PrincipalName, RightName};

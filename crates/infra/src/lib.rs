//! Infrastructure layer: storage adapters for the authorization core.

pub mod membership_store;


pub use membership_store::{FaultInjectingStore, InMemoryMembershipStore};

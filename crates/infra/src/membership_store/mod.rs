//! Membership store adapters.
//!
//! `InMemoryMembershipStore` is the reference implementation of the
//! `MembershipStore` contract; `FaultInjectingStore` wraps any store to fail
//! chosen updates so partial-write handling can be exercised.

pub mod fault_injection;
pub mod in_memory;

pub use fault_injection::FaultInjectingStore;
pub use in_memory::InMemoryMembershipStore;

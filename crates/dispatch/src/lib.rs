//! Request orchestration for the Aide gateway.
//!
//! This crate sequences calls between the domain rules in [`shard`] and the
//! port traits it defines: it bounds how many requests run at once, lends
//! execution contexts out of a fixed pool, forwards writes to the authority
//! node, routes chat messages, and opens sessions.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Everything here talks to the outside world only
//! through `shard` port traits, so each component is tested against in-memory
//! fakes. HTTP lives in the adapter crates and the `listener` crate.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`admission`] | Bounded in-flight requests with a bounded wait |
//! | [`pool`] | Fixed pool of exclusive execution contexts |
//! | [`commit`] | Phase state machine and authority forwarding |
//! | [`tasks`] | Graph task dispatch over the pool and the forwarder |
//! | [`router`] | Chat message routing through the trigger cache or decoder |
//! | [`issuer`] | User registration and session token issuance |

pub mod admission;
pub mod commit;
pub mod issuer;
pub mod pool;
pub mod router;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use admission::{AdmissionConfig, AdmissionController, AdmissionPermit, AdmissionRejected};
pub use commit::{CommitError, CommitForwarder, Resolution};
pub use issuer::{IssuedSession, SessionError, SessionIssuer, SessionPolicy};
pub use pool::{ExecutorHandle, PoolError, PooledExecutor, WorkerPool};
pub use router::{MessageError, MessageRouter};
pub use tasks::{DispatchError, TaskDispatcher};

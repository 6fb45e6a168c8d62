//! ShardSim Environment Abstraction Layer
//!
//! This crate separates the protocol engine from the substrate it runs on.
//! The engine only ever talks to a [`Transport`] (non-blocking send, probe
//! and receive between node ids) and the harness synchronizes execution
//! groups through a [`Rendezvous`] (barrier and gather).
//!
//! # Example
//!
//! ```ignore
//! use shardsim_env::{MemoryTransport, NodeId, Transport};
//!
//! let transport = MemoryTransport::with_nodes(64, [NodeId(0), NodeId(1)]);
//! let handle = transport.send(NodeId(0), NodeId(1), "ping")?;
//! if let Some(source) = transport.probe(NodeId(1)) {
//!     let message = transport.receive(NodeId(1), source)?;
//! }
//! assert!(handle.is_complete());
//! ```

mod error;
mod memory;
mod transport;
mod types;

pub use error::EnvError;
pub use memory::{MemoryRendezvous, MemoryTransport, DEFAULT_INBOX_CAPACITY};
pub use transport::{Rendezvous, Transport};
pub use types::{NodeId, SendHandle};

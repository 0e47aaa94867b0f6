//! Storage port: the document collection contract and its in-memory adapter.
//!
//! The gateway only ever talks to a [`Collection`]. Every call carries its own
//! [`Deadline`](crate::Deadline), and "no documents matched" is a normal
//! result rather than an error.

mod filter;
mod memory;
mod port;

pub use filter::{Filter, FilterValue, Projection, ID_FIELD};
pub use memory::MemoryCollection;
pub(crate) use filter::{parse_identity, top_level};
pub use port::{
    Collection, DeleteResult, Document, FindOptions, Stage, StorageResult, UpdateResult,
};

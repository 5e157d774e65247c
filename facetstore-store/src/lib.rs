//! Store adapter: the boundary between a facet orchestrator and a
//! transactional composite-key KV backend.
//!
//! [`StoreBackend`] is the port; [`MemoryBackend`] is the in-process
//! implementation used by tests, `facetstore-testkit`, and the demo
//! binary; the `dynamodb` feature adds [`DynamoDbBackend`] against a
//! real table. Every implementation is required to give
//! `put_transaction` all-or-nothing semantics, see the trait docs.

mod backend;
mod error;
mod memory;
mod validate;

#[cfg(feature = "dynamodb")]
mod dynamodb;

pub use backend::StoreBackend;
pub use error::{Result, StoreError, MAX_TRANSACTION_ITEMS};
pub use memory::MemoryBackend;
pub use validate::validate_transaction;

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoDbBackend;

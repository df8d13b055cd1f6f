/// Account records, pins and the pin check.
/// Every mutable field sits behind the record's own lock.
pub mod account;

/// Append-only account table with a structural lock for growth.
pub mod store;

/// Typed requests and responses exchanged with the dispatcher.
pub mod request;

pub mod error;

pub mod config;

/// Ledger operations interface, plus "in memory" implementation.
///
/// NOTE: the trait is the seam the dispatcher depends on, so another
/// implementation can be dropped in without touching the worker pool.
pub mod processor;

/// Worker pool that executes requests concurrently and routes each
/// response back by correlation id.
pub mod dispatcher;

/// Text transport used by the binary: legacy request lines in, CSV out.
/// Lives in the library so integration tests can drive a whole run.
pub mod bin_utils;

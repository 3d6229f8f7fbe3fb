/// Device-local persistence of stats, outbox and answered cards.
pub mod local_store;
/// Conflict resolution between local and remote deck statistics.
pub mod merge;
/// Shared data definitions for both stores.
pub mod models;
/// Remote store capability and its backends.
pub mod remote_store;
/// Error types shared by remote store backends.
pub mod storage;

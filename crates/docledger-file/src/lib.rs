//! docledger-file - Filesystem-backed document store.

mod store;

pub use store::FileStore;

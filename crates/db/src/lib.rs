//! Storage for the encrypted master HD key records of a wallet.
//!
//! The key maker only ever needs one namespace from the wallet database: the pair of encrypted
//! master extended keys written at wallet creation. [`MasterKeyStore`] is that namespace; this
//! crate ships an in-memory implementation for tests and ephemeral wallets and a sled-backed one
//! for wallets that live on disk.

pub mod errors;
pub mod inmemory;
pub mod master_keys;
pub mod persistent;

pub use errors::{DbError, DbResult};
pub use inmemory::MasterKeyStoreInMemory;
pub use master_keys::{MasterHdKeys, MasterKeyStore};
pub use persistent::SledMasterKeyStore;

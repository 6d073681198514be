//! Template sharing for the parameters playground
//!
//! - `ShareStore`: content-addressed template storage (put/get by short id)
//! - `MemoryShareStore` / `FsShareStore`: in-process and on-disk backends
//! - `ShareService`: applies the payload ceiling in front of a store
//! - `ShareClient`: HTTP client for a remote share server

pub mod client;
pub mod error;
pub mod fs;
pub mod memory;
pub mod service;
pub mod storage_traits;

pub use client::{ShareClient, SHARE_ROUTE};
pub use error::{ShareError, ShareResult};
pub use fs::FsShareStore;
pub use memory::MemoryShareStore;
pub use service::ShareService;
pub use storage_traits::{
    ErrorBody, ShareId, ShareRecord, ShareResponse, ShareStore, StoredShare, MAX_ID_ATTEMPTS,
    SHARE_ID_LEN,
};

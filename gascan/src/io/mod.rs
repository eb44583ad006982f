//! Side-effecting adapters: filesystem, archive, processes, and host state.

pub mod archive;
pub mod cache;
pub mod files;
pub mod host;
pub mod identity;
pub mod inventory;
pub mod process;
pub mod workspace;

//! # aegis-persist
//!
//! On-disk state for the Aegis security core.
//!
//! - [`EncryptedJsonFile`] - a whole-value snapshot, serialized to JSON,
//!   encrypted as a single blob and replaced atomically on every save
//! - [`fs`] - private-file helpers: atomic writes, `0700` directories,
//!   `0600` append-only logs and permission inspection
//!
//! A snapshot file is never observed half-written: saves go to a sibling
//! temporary file which is then renamed over the target.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod fs;
pub mod snapshot;

pub use error::{PersistError, PersistResult};
pub use fs::{PRIVATE_DIR_MODE, PRIVATE_FILE_MODE};
pub use snapshot::EncryptedJsonFile;

//! Utility functions and helpers.
//!
//! Common functionality used across multiple parcel crates.

pub mod hash;
pub mod path;

pub use hash::{is_sha1_hex, sha1_file, sha1_hex, sha1_reader, verify_sha1, HASH_CHUNK_SIZE};
pub use path::{
    archive_entry_name, check_path_segment, extraction_target, safe_join, sanitize_entry,
};

//! Image endpoints for the PhotoFlow server
//!
//! Upload, listing, retrieval and deletion of a user's images. Bytes live at
//! the storage provider; the database keeps one row per image scoped to its
//! owner.

pub mod handlers;

pub use handlers::{MAX_IMAGE_BYTES, MIN_IMAGE_BYTES};

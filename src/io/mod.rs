//! Synchronous byte-level helpers shared by all codecs.

pub mod buffer_utils;

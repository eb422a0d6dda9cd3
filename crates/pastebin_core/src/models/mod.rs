//! Data models shared by storage, search, and transport layers.

/// Paste records and request payloads.
pub mod paste;

//! Helper functions shared by store backends.

use crate::error::AppError;
use crate::models::paste::Paste;
use chrono::{DateTime, Utc};

/// Index key that sorts newer `created_at` values first, at nanosecond
/// resolution so bursts of creates keep their order.
pub fn reverse_timestamp_key(created_at: DateTime<Utc>) -> u64 {
    // Pre-epoch timestamps clamp to the oldest key; instants past the i64
    // nanosecond range (year 2262) clamp to the newest.
    let nanos = match created_at.timestamp_nanos_opt() {
        Some(nanos) => nanos.max(0) as u64,
        None if created_at.timestamp() < 0 => 0,
        None => u64::MAX,
    };
    u64::MAX - nanos
}

pub(super) fn encode_paste(paste: &Paste) -> Result<Vec<u8>, AppError> {
    Ok(bincode::serialize(paste)?)
}

pub(super) fn decode_paste(bytes: &[u8]) -> Result<Paste, AppError> {
    Ok(bincode::deserialize(bytes)?)
}

//! Behavior tests run against every store backend.

use super::*;
use crate::test_support::{expiring_paste, for_each_backend, sample_paste, setup_temp_store};
use chrono::Duration;
use std::sync::Barrier;
use std::thread;

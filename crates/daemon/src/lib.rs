// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tw-daemon: process lifecycle around a running world
//!
//! Loads the daemon configuration, owns the data directory lock, starts the
//! world from the event store and bootstraps fresh data directories.

pub mod config;
pub mod lifecycle;

pub use config::{Config, ConfigError};
pub use lifecycle::{init, startup, Daemon, LifecycleError};

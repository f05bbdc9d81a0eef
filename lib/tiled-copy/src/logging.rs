// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Process-wide log output.
//!
//! Every line carries the seconds elapsed since [`init`] and the emitting
//! thread's id. Lines are written to stderr under a single lock so output
//! from concurrent threads never interleaves.

use std::io::IsTerminal;
use std::sync::{Mutex, Once};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::Uptime;

static INIT: Once = Once::new();

/// Install the global subscriber. Later calls are no-ops.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
pub fn init() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let result = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(Uptime::default())
            .with_target(false)
            .with_thread_ids(true)
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(Mutex::new(std::io::stderr()))
            .try_init();
        if let Err(e) = result {
            eprintln!("failed to install log subscriber: {e}");
        }
    });
}

/// Log at error level, then abort the process.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)+) => {{
        $crate::__tracing::error!($($arg)+);
        ::std::process::abort()
    }};
}

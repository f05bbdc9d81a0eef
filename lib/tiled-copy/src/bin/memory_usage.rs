// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Periodically log the utilization of every device memory module.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tilecopy::{BenchConfig, logging, open_runtime};

/// Report device memory utilization at a fixed interval.
#[derive(Debug, Parser)]
#[command(name = "memory-usage", version, about)]
struct Args {
    /// Number of reports before exiting; runs until killed when omitted
    #[arg(long)]
    iterations: Option<u64>,

    /// Milliseconds between reports
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init();

    let config = BenchConfig::from_env();
    let runtime = open_runtime(&config)?;
    tracing::info!(backend = runtime.name(), "reporting device memory");

    let interval = Duration::from_millis(args.interval_ms);
    let mut iteration = 0u64;
    loop {
        for module in runtime.memory_modules()? {
            tracing::info!(
                free = module.free(),
                "Memory `{}` : {}/{}",
                module.module,
                module.used,
                module.capacity
            );
        }

        iteration += 1;
        if args.iterations.is_some_and(|n| iteration >= n) {
            return Ok(());
        }
        std::thread::sleep(interval);
    }
}

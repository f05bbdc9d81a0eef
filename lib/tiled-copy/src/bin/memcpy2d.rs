// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Tiled 2D copy round trip: fill, H2D, zero, D2H, verify.
//!
//! Exits 0 on success and 1 on a usage error. Runtime and integrity faults
//! are logged and abort the process.

use std::process::ExitCode;

use clap::CommandFactory;
use tilecopy::cli::{Cli, USAGE_EXIT_CODE};
use tilecopy::{
    BenchConfig, ErrorKind, PassReport, RoundTrip, TransferError, fatal, logging, open_runtime,
};

fn main() -> ExitCode {
    let cli = match Cli::parse_or_exit(std::env::args_os()) {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    logging::init();

    let config = BenchConfig::from_env().with_tile_count(cli.tiles);
    tracing::info!("Configured with `{}` tiles", config.tile_count);

    if let Err(e) = config.validate() {
        return usage(&e);
    }

    tracing::info!("Init");
    let runtime = match open_runtime(&config) {
        Ok(runtime) => runtime,
        Err(e) => fatal!("Init failed: {e:#}"),
    };

    let mut bench = match RoundTrip::<f32>::new(runtime, &config) {
        Ok(bench) => bench,
        Err(e) => return fail(e),
    };

    match bench.run() {
        Ok(report) => {
            log_pass(&report.h2d);
            log_pass(&report.d2h);
            tracing::info!("SUCCESS");
        }
        Err(e) => return fail(e),
    }

    tracing::info!("Deinit");
    if let Err(e) = bench.finish() {
        fatal!("Deinit failed: {e}");
    }

    ExitCode::SUCCESS
}

fn log_pass(pass: &PassReport) {
    tracing::info!(
        "{}: {} bytes in {:.3} ms ({:.2} GB/s), {} polls over {} passes, {} yields",
        pass.direction,
        pass.bytes,
        pass.elapsed.as_secs_f64() * 1e3,
        pass.gb_per_sec(),
        pass.poll.queries,
        pass.poll.outer_passes,
        pass.poll.yields,
    );
}

fn usage(err: &TransferError) -> ExitCode {
    eprintln!("error: {err}");
    eprintln!("{}", Cli::command().render_usage());
    ExitCode::from(USAGE_EXIT_CODE)
}

fn fail(err: TransferError) -> ExitCode {
    match err.kind() {
        ErrorKind::Usage => usage(&err),
        ErrorKind::Integrity => fatal!("FAILURE: {err}"),
        ErrorKind::Runtime | ErrorKind::Bug => fatal!("{err}"),
    }
}

// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Error type for runtime boundary calls.

use thiserror::Error;

use crate::status::Status;

/// A runtime call returned something other than success.
///
/// `op` names the failing operation the way it appears in logs, so a fatal
/// message reads "`append_copy_region` failed with err=... (...)".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("`{op}` failed with err={} ({})", .status.name(), .status.code())]
pub struct RuntimeError {
    /// Operation that failed.
    pub op: &'static str,

    /// Status the runtime reported.
    pub status: Status,
}

impl RuntimeError {
    pub fn new(op: &'static str, status: Status) -> Self {
        Self { op, status }
    }
}

/// Result type for runtime calls.
pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RuntimeError::new("append_copy_region", Status::OutOfDeviceMemory);
        let msg = err.to_string();
        assert!(msg.contains("`append_copy_region` failed"));
        assert!(msg.contains("RESULT_ERROR_OUT_OF_DEVICE_MEMORY"));
        assert!(msg.contains(&Status::OutOfDeviceMemory.code().to_string()));
    }
}

// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;
use tilecopy_memory::RuntimeError;

use crate::events::HandleState;
use crate::geometry::{Direction, GeometryError};
use crate::verify::IntegrityError;

/// Errors surfaced by the tiled copy engine.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("usage: {0}")]
    Usage(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("requested {requested} tiles, capacity is {capacity}")]
    Capacity { requested: usize, capacity: usize },

    /// A completion handle was used in the wrong state.
    #[error("completion handle of tile {tile} is {state}, expected {expected}")]
    HandleMisuse {
        tile: usize,
        state: HandleState,
        expected: HandleState,
    },

    #[error("{direction} dispatch of tile {tile}: {source}")]
    Dispatch {
        tile: usize,
        direction: Direction,
        source: RuntimeError,
    },

    #[error("completion query of tile {tile}: {source}")]
    Query { tile: usize, source: RuntimeError },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),
}

/// Coarse classification used to pick the exit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input; exit with a usage message.
    Usage,
    /// The runtime returned a non-success status.
    Runtime,
    /// Round-trip data mismatch.
    Integrity,
    /// Violated precondition in the calling code.
    Bug,
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::Usage(_) | TransferError::Config(_) => ErrorKind::Usage,
            TransferError::Dispatch { .. }
            | TransferError::Query { .. }
            | TransferError::Runtime(_) => ErrorKind::Runtime,
            TransferError::Integrity(_) => ErrorKind::Integrity,
            TransferError::Geometry(_)
            | TransferError::Capacity { .. }
            | TransferError::HandleMisuse { .. } => ErrorKind::Bug,
        }
    }

    /// The runtime fault behind this error, if any.
    pub fn runtime_error(&self) -> Option<&RuntimeError> {
        match self {
            TransferError::Dispatch { source, .. } | TransferError::Query { source, .. } => {
                Some(source)
            }
            TransferError::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilecopy_memory::Status;

    #[test]
    fn test_kind() {
        let dispatch = TransferError::Dispatch {
            tile: 2,
            direction: Direction::HostToDevice,
            source: RuntimeError::new("append_copy_region", Status::DeviceLost),
        };
        assert_eq!(dispatch.kind(), ErrorKind::Runtime);
        assert_eq!(
            dispatch.runtime_error().map(|e| e.status),
            Some(Status::DeviceLost)
        );

        let misuse = TransferError::HandleMisuse {
            tile: 0,
            state: HandleState::Pending,
            expected: HandleState::Armed,
        };
        assert_eq!(misuse.kind(), ErrorKind::Bug);
        assert!(misuse.runtime_error().is_none());

        assert_eq!(
            TransferError::Usage("tile count".into()).kind(),
            ErrorKind::Usage
        );
    }

    #[test]
    fn test_dispatch_message() {
        let err = TransferError::Dispatch {
            tile: 2,
            direction: Direction::HostToDevice,
            source: RuntimeError::new("append_copy_region", Status::DeviceLost),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("H2D dispatch of tile 2"));
        assert!(msg.contains("`append_copy_region` failed with err=RESULT_ERROR_DEVICE_LOST"));
    }
}

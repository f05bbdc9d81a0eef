// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Status codes returned across the accelerator runtime boundary.
//!
//! Every runtime call resolves to one [`Status`]. The numeric codes follow the
//! oneAPI Level Zero `ze_result_t` encoding so that logs read the same whether
//! the status came from a real driver or from the reference runtime.

use std::fmt;

use crate::error::RuntimeError;

macro_rules! status_table {
    ($( $(#[$meta:meta])* $variant:ident = $code:literal => $name:literal ),+ $(,)?) => {
        /// Result of a runtime call.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Status {
            $( $(#[$meta])* $variant, )+
            /// A code this table does not know about.
            Unrecognized(u32),
        }

        impl Status {
            /// Every named status, in table order.
            pub const ALL: &'static [Status] = &[ $( Status::$variant, )+ ];

            /// Numeric code of this status.
            pub const fn code(self) -> u32 {
                match self {
                    $( Status::$variant => $code, )+
                    Status::Unrecognized(code) => code,
                }
            }

            /// Canonical name of this status.
            pub const fn name(self) -> &'static str {
                match self {
                    $( Status::$variant => $name, )+
                    Status::Unrecognized(_) => "RESULT_UNRECOGNIZED",
                }
            }

            /// Map a raw code back onto the table.
            pub const fn from_code(code: u32) -> Self {
                match code {
                    $( $code => Status::$variant, )+
                    other => Status::Unrecognized(other),
                }
            }
        }
    };
}

status_table! {
    /// The call completed.
    Success = 0x0000_0000 => "RESULT_SUCCESS",
    /// A completion query found the operation still in flight.
    NotReady = 0x0000_0001 => "RESULT_NOT_READY",
    DeviceLost = 0x7000_0001 => "RESULT_ERROR_DEVICE_LOST",
    OutOfHostMemory = 0x7000_0002 => "RESULT_ERROR_OUT_OF_HOST_MEMORY",
    OutOfDeviceMemory = 0x7000_0003 => "RESULT_ERROR_OUT_OF_DEVICE_MEMORY",
    DeviceRequiresReset = 0x7000_0006 => "RESULT_ERROR_DEVICE_REQUIRES_RESET",
    DeviceInLowPowerState = 0x7000_0007 => "RESULT_ERROR_DEVICE_IN_LOW_POWER_STATE",
    InsufficientPermissions = 0x7001_0000 => "RESULT_ERROR_INSUFFICIENT_PERMISSIONS",
    NotAvailable = 0x7001_0001 => "RESULT_ERROR_NOT_AVAILABLE",
    DependencyUnavailable = 0x7002_0000 => "RESULT_ERROR_DEPENDENCY_UNAVAILABLE",
    WarningDroppedData = 0x7002_0001 => "RESULT_WARNING_DROPPED_DATA",
    Uninitialized = 0x7800_0001 => "RESULT_ERROR_UNINITIALIZED",
    UnsupportedVersion = 0x7800_0002 => "RESULT_ERROR_UNSUPPORTED_VERSION",
    UnsupportedFeature = 0x7800_0003 => "RESULT_ERROR_UNSUPPORTED_FEATURE",
    InvalidArgument = 0x7800_0004 => "RESULT_ERROR_INVALID_ARGUMENT",
    InvalidNullHandle = 0x7800_0005 => "RESULT_ERROR_INVALID_NULL_HANDLE",
    HandleObjectInUse = 0x7800_0006 => "RESULT_ERROR_HANDLE_OBJECT_IN_USE",
    InvalidNullPointer = 0x7800_0007 => "RESULT_ERROR_INVALID_NULL_POINTER",
    InvalidSize = 0x7800_0008 => "RESULT_ERROR_INVALID_SIZE",
    UnsupportedSize = 0x7800_0009 => "RESULT_ERROR_UNSUPPORTED_SIZE",
    UnsupportedAlignment = 0x7800_000a => "RESULT_ERROR_UNSUPPORTED_ALIGNMENT",
    InvalidSynchronizationObject = 0x7800_000b => "RESULT_ERROR_INVALID_SYNCHRONIZATION_OBJECT",
    InvalidEnumeration = 0x7800_000c => "RESULT_ERROR_INVALID_ENUMERATION",
    UnsupportedEnumeration = 0x7800_000d => "RESULT_ERROR_UNSUPPORTED_ENUMERATION",
    OverlappingRegions = 0x7800_001a => "RESULT_ERROR_OVERLAPPING_REGIONS",
    WarningActionRequired = 0x7800_001b => "RESULT_WARNING_ACTION_REQUIRED",
    Unknown = 0x7fff_fffe => "RESULT_ERROR_UNKNOWN",
}

impl Status {
    /// Returns true for [`Status::Success`].
    pub const fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }

    /// Turn a status into a `Result`, naming the operation that produced it.
    pub fn check(self, op: &'static str) -> Result<(), RuntimeError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(RuntimeError::new(op, self))
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

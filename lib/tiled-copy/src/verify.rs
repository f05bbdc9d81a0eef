// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Round-trip integrity checks.

use std::fmt;

use thiserror::Error;

/// Element type that can carry its own flat index.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Type name for logs.
    const NAME: &'static str;

    /// Largest element count whose indices all convert exactly.
    const MAX_EXACT_INDEX: usize;

    fn from_index(index: usize) -> Self;
}

impl Element for f32 {
    const NAME: &'static str = "f32";
    const MAX_EXACT_INDEX: usize = 1 << f32::MANTISSA_DIGITS;

    fn from_index(index: usize) -> Self {
        index as f32
    }
}

impl Element for f64 {
    const NAME: &'static str = "f64";
    const MAX_EXACT_INDEX: usize = 1 << f64::MANTISSA_DIGITS;

    fn from_index(index: usize) -> Self {
        index as f64
    }
}

impl Element for u32 {
    const NAME: &'static str = "u32";
    const MAX_EXACT_INDEX: usize = u32::MAX as usize;

    fn from_index(index: usize) -> Self {
        index as u32
    }
}

impl Element for u64 {
    const NAME: &'static str = "u64";
    const MAX_EXACT_INDEX: usize = usize::MAX;

    fn from_index(index: usize) -> Self {
        index as u64
    }
}

/// First element that did not survive the round trip.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("element {index}: expected {expected}, found {found}")]
pub struct IntegrityError {
    pub index: usize,
    pub expected: String,
    pub found: String,
}

/// Write `i` into element `i`.
pub fn fill_index_pattern<T: Element>(data: &mut [T]) {
    for (i, v) in data.iter_mut().enumerate() {
        *v = T::from_index(i);
    }
}

/// Check every element against `expected`, stopping at the first mismatch.
pub fn verify_with<T, F>(data: &[T], expected: F) -> Result<(), IntegrityError>
where
    T: Element,
    F: Fn(usize) -> T,
{
    match data
        .iter()
        .enumerate()
        .find(|(i, v)| **v != expected(*i))
    {
        Some((index, found)) => Err(IntegrityError {
            index,
            expected: format!("{:?}", expected(index)),
            found: format!("{found:?}"),
        }),
        None => Ok(()),
    }
}

/// Check that element `i` equals `i`.
pub fn verify_index_pattern<T: Element>(data: &[T]) -> Result<(), IntegrityError> {
    verify_with(data, T::from_index)
}

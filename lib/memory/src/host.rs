// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Contiguous host memory used as the source and sink of tiled copies.

use crate::error::{Result, RuntimeError};
use crate::runtime::{CopyEndpoint, Region};
use crate::status::Status;

/// A contiguous, typed host buffer.
///
/// The buffer hands out raw copy endpoints. While a copy addressing it is in
/// flight the contents must not be read or written through the slice
/// accessors; see [`crate::AcceleratorRuntime::append_copy_region`].
#[derive(Debug)]
pub struct HostBuffer<T> {
    data: Vec<T>,
}

impl<T: Copy + Default> HostBuffer<T> {
    /// Allocate `len` default-initialized elements.
    ///
    /// # Errors
    /// Returns an error if `len` is 0.
    pub fn new(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(RuntimeError::new("alloc_host", Status::InvalidSize));
        }
        Ok(Self {
            data: vec![T::default(); len],
        })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of the buffer in bytes.
    pub fn byte_len(&self) -> usize {
        std::mem::size_of_val(self.data.as_slice())
    }

    /// Base address of the buffer.
    pub fn addr(&self) -> u64 {
        self.data.as_ptr() as u64
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    fn check_region(&self, offset: usize, pitch: usize, region: Region) -> Result<()> {
        let end = offset
            .checked_add(region.end(pitch, 0))
            .ok_or_else(|| RuntimeError::new("host_endpoint", Status::InvalidSize))?;
        if end > self.byte_len() {
            return Err(RuntimeError::new("host_endpoint", Status::InvalidSize));
        }
        Ok(())
    }

    /// Source endpoint addressing `region` starting `offset` bytes into the
    /// buffer with the given row pitch.
    ///
    /// # Errors
    /// Returns an error if the region would run past the end of the buffer.
    pub fn endpoint(&self, offset: usize, pitch: usize, region: Region) -> Result<CopyEndpoint> {
        self.check_region(offset, pitch, region)?;
        Ok(CopyEndpoint::host(self.addr() + offset as u64, pitch, region))
    }

    /// Destination endpoint; same addressing as [`HostBuffer::endpoint`].
    pub fn endpoint_mut(
        &mut self,
        offset: usize,
        pitch: usize,
        region: Region,
    ) -> Result<CopyEndpoint> {
        self.check_region(offset, pitch, region)?;
        let base = self.data.as_mut_ptr() as u64;
        Ok(CopyEndpoint::host(base + offset as u64, pitch, region))
    }

    /// Set `size` bytes starting at byte `offset` to `value`.
    pub fn memset(&mut self, value: u8, offset: usize, size: usize) -> Result<()> {
        let end = offset
            .checked_add(size)
            .ok_or_else(|| RuntimeError::new("memset", Status::InvalidSize))?;
        if end > self.byte_len() {
            return Err(RuntimeError::new("memset", Status::InvalidSize));
        }
        // SAFETY: the range was checked against the allocation above and the
        // exclusive borrow rules out concurrent slice access.
        unsafe {
            let ptr = (self.data.as_mut_ptr() as *mut u8).add(offset);
            std::ptr::write_bytes(ptr, value, size);
        }
        Ok(())
    }

    /// Zero the whole buffer.
    pub fn zero(&mut self) {
        let len = self.byte_len();
        // SAFETY: writes exactly the bytes owned by `data`.
        unsafe { std::ptr::write_bytes(self.data.as_mut_ptr() as *mut u8, 0, len) };
    }
}

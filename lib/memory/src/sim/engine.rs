// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Copy engines of the reference runtime.
//!
//! Appended copies land on one shared queue. Each engine thread pops the next
//! copy, performs it row by row and signals the copy's event, so copies
//! issued in order may complete in any order.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::runtime::CopyEndpoint;

/// Host-visible event state shared between the runtime and its engines.
#[derive(Debug)]
pub(crate) struct SimEvent {
    pub(crate) pool: u64,
    pub(crate) index: u32,
    signaled: AtomicBool,
    in_flight: AtomicU32,
}

impl SimEvent {
    pub(crate) fn new(pool: u64, index: u32) -> Self {
        Self {
            pool,
            index,
            signaled: AtomicBool::new(false),
            in_flight: AtomicU32::new(0),
        }
    }

    pub(crate) fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }

    pub(crate) fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) != 0
    }

    pub(crate) fn reset(&self) {
        self.signaled.store(false, Ordering::Release);
    }

    pub(crate) fn begin(&self) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
    }

    /// Publish completion. The in-flight count drops before the signal so a
    /// host that observes the signal can immediately reset the event.
    fn complete(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.signaled.store(true, Ordering::Release);
    }
}

/// One appended copy.
pub(crate) struct CopyJob {
    pub(crate) dst: CopyEndpoint,
    pub(crate) src: CopyEndpoint,
    pub(crate) event: Arc<SimEvent>,
    pub(crate) latency: Duration,
    /// Flip the first destination byte after copying.
    pub(crate) corrupt: bool,
}

#[derive(Default)]
struct Queue {
    jobs: VecDeque<CopyJob>,
    in_flight: usize,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    queue: Mutex<Queue>,
    work: Condvar,
    idle: Condvar,
}

/// Pool of copy engine threads fed by a single command queue.
pub(crate) struct CopyEngine {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for CopyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyEngine")
            .field("engines", &self.workers.len())
            .finish()
    }
}

impl CopyEngine {
    pub(crate) fn new(engines: usize) -> std::io::Result<Self> {
        let shared = Arc::new(Shared::default());
        let mut workers = Vec::with_capacity(engines);

        for id in 0..engines {
            let worker_shared = shared.clone();
            let handle = std::thread::Builder::new()
                .name(format!("sim-copy-{id}"))
                .spawn(move || run_engine(id, &worker_shared));

            match handle {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    let mut engine = Self { shared, workers };
                    engine.shutdown();
                    return Err(e);
                }
            }
        }

        Ok(Self { shared, workers })
    }

    pub(crate) fn submit(&self, job: CopyJob) {
        self.shared.queue.lock().jobs.push_back(job);
        self.shared.work.notify_one();
    }

    /// Block until the queue is drained and no engine is busy.
    pub(crate) fn wait_idle(&self) {
        let mut queue = self.shared.queue.lock();
        while !queue.jobs.is_empty() || queue.in_flight != 0 {
            self.shared.idle.wait(&mut queue);
        }
    }

    /// Finish queued work and join every engine thread.
    pub(crate) fn shutdown(&mut self) {
        self.shared.queue.lock().shutdown = true;
        self.shared.work.notify_all();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("copy engine thread panicked");
            }
        }
    }
}

impl Drop for CopyEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_engine(id: usize, shared: &Shared) {
    tracing::trace!(engine = id, "copy engine started");
    loop {
        let job = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(job) = queue.jobs.pop_front() {
                    queue.in_flight += 1;
                    break job;
                }
                if queue.shutdown {
                    tracing::trace!(engine = id, "copy engine stopped");
                    return;
                }
                shared.work.wait(&mut queue);
            }
        };

        if !job.latency.is_zero() {
            std::thread::sleep(job.latency);
        }

        // SAFETY: the endpoints were validated on append and the caller of
        // `append_copy_region` keeps both sides alive until the event signals.
        unsafe { copy_region(&job.dst, &job.src) };
        if job.corrupt {
            // SAFETY: the region is non-empty, so its first byte is addressed.
            unsafe { corrupt_first_byte(&job.dst) };
        }
        job.event.complete();

        let mut queue = shared.queue.lock();
        queue.in_flight -= 1;
        if queue.jobs.is_empty() && queue.in_flight == 0 {
            shared.idle.notify_all();
        }
    }
}

/// Strided copy of `src.region` into `dst.region`, one row at a time.
///
/// # Safety
/// Every byte addressed by either endpoint must be valid, and the two sides
/// must not overlap.
pub(crate) unsafe fn copy_region(dst: &CopyEndpoint, src: &CopyEndpoint) {
    let width = src.region.width as usize;
    for z in 0..src.region.depth as usize {
        for y in 0..src.region.height as usize {
            let src_off = (src.region.origin_z as usize + z) * src.slice_pitch
                + (src.region.origin_y as usize + y) * src.pitch
                + src.region.origin_x as usize;
            let dst_off = (dst.region.origin_z as usize + z) * dst.slice_pitch
                + (dst.region.origin_y as usize + y) * dst.pitch
                + dst.region.origin_x as usize;

            let src_ptr = (src.addr as usize + src_off) as *const u8;
            let dst_ptr = (dst.addr as usize + dst_off) as *mut u8;
            unsafe { std::ptr::copy_nonoverlapping(src_ptr, dst_ptr, width) };
        }
    }
}

/// Invert the first byte addressed by `dst`.
///
/// # Safety
/// `dst` must address at least one valid, writable byte.
unsafe fn corrupt_first_byte(dst: &CopyEndpoint) {
    let ptr = (dst.addr as usize + dst.region.start(dst.pitch, dst.slice_pitch)) as *mut u8;
    unsafe { *ptr = !*ptr };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Region;

    #[test]
    fn test_copy_region_strided_to_packed() {
        // 2 tiles of 4x3 bytes side by side (pitch 8), copy tile 1 out.
        let src: Vec<u8> = (0..24).collect();
        let mut dst = vec![0u8; 12];

        let region = Region::rect(4, 3);
        let src_ep = CopyEndpoint::host(src.as_ptr() as u64 + 4, 8, region);
        let dst_ep = CopyEndpoint::host(dst.as_mut_ptr() as u64, 4, region);

        unsafe { copy_region(&dst_ep, &src_ep) };
        assert_eq!(dst, vec![4, 5, 6, 7, 12, 13, 14, 15, 20, 21, 22, 23]);
    }

    #[test]
    fn test_engine_signals_every_job() {
        let engine = CopyEngine::new(3).unwrap();
        let src: Vec<u8> = (0..64).collect();
        let mut dst = vec![0u8; 64];
        let events: Vec<_> = (0..8).map(|i| Arc::new(SimEvent::new(1, i))).collect();

        for (i, event) in events.iter().enumerate() {
            let region = Region::rect(8, 1);
            event.begin();
            engine.submit(CopyJob {
                dst: CopyEndpoint::host(dst.as_mut_ptr() as u64 + 8 * i as u64, 8, region),
                src: CopyEndpoint::host(src.as_ptr() as u64 + 8 * i as u64, 8, region),
                event: event.clone(),
                latency: Duration::ZERO,
                corrupt: false,
            });
        }

        engine.wait_idle();
        assert!(events.iter().all(|e| e.is_signaled() && !e.is_in_flight()));
        assert_eq!(src, dst);
    }

    #[test]
    fn test_engine_corrupts_marked_job() {
        let engine = CopyEngine::new(1).unwrap();
        let src = vec![0x0fu8; 16];
        let mut dst = vec![0u8; 16];
        let event = Arc::new(SimEvent::new(1, 0));
        let region = Region::rect(4, 4);

        event.begin();
        engine.submit(CopyJob {
            dst: CopyEndpoint::host(dst.as_mut_ptr() as u64, 4, region),
            src: CopyEndpoint::host(src.as_ptr() as u64, 4, region),
            event: event.clone(),
            latency: Duration::ZERO,
            corrupt: true,
        });

        engine.wait_idle();
        assert!(event.is_signaled());
        assert_eq!(dst[0], 0xf0);
        assert_eq!(&dst[1..], &src[1..]);
    }
}

//! Scoped device-memory management for inference calls.
//!
//! The engine allocates one input and one output buffer per inference
//! call and frees both before returning, success or failure. The
//! allocator exposes its live-allocation count so tests can verify that
//! no exit path leaks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::{MediaError, MediaResult};

/// Opaque handle to one device allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(u64);

/// Device-memory allocator used by the inference engine.
///
/// Buffers are sized in `f32` elements and scoped strictly to one
/// inference call; the engine never holds them across calls.
pub trait DeviceAllocator: Send + Sync {
    /// Allocate a buffer of `len` elements.
    fn allocate(&self, len: usize) -> MediaResult<BufferId>;

    /// Copy host data into a device buffer (host -> device).
    fn upload(&self, id: BufferId, host: &[f32]) -> MediaResult<()>;

    /// Copy a device buffer back into host memory (device -> host).
    fn download(&self, id: BufferId, host: &mut [f32]) -> MediaResult<()>;

    /// Release a buffer. Releasing an unknown id is a no-op.
    fn free(&self, id: BufferId);

    /// Number of currently live allocations.
    fn outstanding(&self) -> usize;
}

/// RAII guard that frees its buffer when dropped.
///
/// Guarantees release on every exit path of `EmotionEngine::infer`,
/// including execution failure.
pub struct DeviceBuffer<'a> {
    id: BufferId,
    allocator: &'a dyn DeviceAllocator,
}

impl<'a> DeviceBuffer<'a> {
    /// Allocate a buffer of `len` elements, freed on drop.
    pub fn new(allocator: &'a dyn DeviceAllocator, len: usize) -> MediaResult<Self> {
        let id = allocator.allocate(len)?;
        Ok(Self { id, allocator })
    }

    /// Handle for binding this buffer into an execution.
    pub fn id(&self) -> BufferId {
        self.id
    }
}

impl Drop for DeviceBuffer<'_> {
    fn drop(&mut self) {
        self.allocator.free(self.id);
    }
}

/// Host-staging allocator.
///
/// With the CPU and CUDA execution providers the runtime manages device
/// memory internally, so tensors are staged in host buffers with the
/// same allocate/upload/download/free discipline. The call-scoped
/// lifecycle stays observable either way.
#[derive(Default)]
pub struct StagingAllocator {
    next_id: AtomicU64,
    buffers: Mutex<HashMap<u64, Vec<f32>>>,
}

impl StagingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_buffer<T>(
        &self,
        id: BufferId,
        f: impl FnOnce(&mut Vec<f32>) -> MediaResult<T>,
    ) -> MediaResult<T> {
        let mut buffers = self
            .buffers
            .lock()
            .map_err(|_| MediaError::inference_execution("device buffer table poisoned"))?;
        let buffer = buffers
            .get_mut(&id.0)
            .ok_or_else(|| MediaError::inference_execution(format!("unknown buffer {:?}", id)))?;
        f(buffer)
    }
}

impl DeviceAllocator for StagingAllocator {
    fn allocate(&self, len: usize) -> MediaResult<BufferId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut buffers = self
            .buffers
            .lock()
            .map_err(|_| MediaError::inference_execution("device buffer table poisoned"))?;
        buffers.insert(id, vec![0.0; len]);
        Ok(BufferId(id))
    }

    fn upload(&self, id: BufferId, host: &[f32]) -> MediaResult<()> {
        self.with_buffer(id, |buffer| {
            if host.len() != buffer.len() {
                return Err(MediaError::inference_execution(format!(
                    "upload size mismatch: buffer {} elements, host {}",
                    buffer.len(),
                    host.len()
                )));
            }
            buffer.copy_from_slice(host);
            Ok(())
        })
    }

    fn download(&self, id: BufferId, host: &mut [f32]) -> MediaResult<()> {
        self.with_buffer(id, |buffer| {
            if host.len() != buffer.len() {
                return Err(MediaError::inference_execution(format!(
                    "download size mismatch: buffer {} elements, host {}",
                    buffer.len(),
                    host.len()
                )));
            }
            host.copy_from_slice(buffer);
            Ok(())
        })
    }

    fn free(&self, id: BufferId) {
        if let Ok(mut buffers) = self.buffers.lock() {
            buffers.remove(&id.0);
        }
    }

    fn outstanding(&self) -> usize {
        self.buffers.lock().map(|b| b.len()).unwrap_or(0)
    }
}

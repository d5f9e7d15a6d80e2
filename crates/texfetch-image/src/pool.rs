//! Staging Buffer Pool
//!
//! Reuses the byte buffers handed to transcoders. A checked-out buffer goes
//! back to its pool when dropped, so it is released on every exit path of a
//! transcode: completion, rejection, a dropped callback, or a panic.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

/// Smallest bucket, in bytes
const MIN_BUCKET: usize = 4 * 1024;

fn bucket_for(len: usize) -> usize {
    len.max(MIN_BUCKET).next_power_of_two()
}

#[derive(Default)]
struct PoolInner {
    /// Idle buffers keyed by capacity bucket
    buckets: HashMap<usize, Vec<Vec<u8>>>,
    pooled_bytes: usize,
    outstanding: usize,
    hits: u64,
    misses: u64,
}

/// Pool of staging buffers
#[derive(Clone)]
pub struct StagingPool {
    inner: Arc<Mutex<PoolInner>>,
    max_per_bucket: usize,
    max_bytes: usize,
}

impl Default for StagingPool {
    fn default() -> Self {
        Self::new(4, 64 * 1024 * 1024) // 64 MB default limit
    }
}

impl StagingPool {
    pub fn new(max_per_bucket: usize, max_bytes: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PoolInner::default())),
            max_per_bucket,
            max_bytes,
        }
    }

    /// Check out an empty buffer with room for at least `len` bytes
    pub fn checkout(&self, len: usize) -> StagingBuffer {
        let bucket = bucket_for(len);
        let mut data = None;

        if let Ok(mut inner) = self.inner.lock() {
            inner.outstanding += 1;
            if let Some(buf) = inner.buckets.get_mut(&bucket).and_then(Vec::pop) {
                inner.pooled_bytes -= buf.capacity();
                inner.hits += 1;
                data = Some(buf);
            } else {
                inner.misses += 1;
            }
        }

        StagingBuffer {
            data: data.unwrap_or_else(|| Vec::with_capacity(bucket)),
            pool: Some(self.clone()),
        }
    }

    /// Copy `bytes` into a freshly checked-out buffer
    pub fn stage(&self, bytes: &[u8]) -> StagingBuffer {
        let mut buf = self.checkout(bytes.len());
        buf.extend_from_slice(bytes);
        buf
    }

    fn checkin(&self, mut data: Vec<u8>) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        inner.outstanding = inner.outstanding.saturating_sub(1);

        data.clear();
        let bytes = data.capacity();
        if inner.pooled_bytes + bytes > self.max_bytes {
            return; // Drop the buffer
        }
        let max_per_bucket = self.max_per_bucket;
        let bucket = inner.buckets.entry(bucket_for(bytes)).or_default();
        if bucket.len() >= max_per_bucket {
            return; // Drop the buffer
        }
        bucket.push(data);
        inner.pooled_bytes += bytes;
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        match self.inner.lock() {
            Ok(inner) => PoolStats {
                outstanding: inner.outstanding,
                pooled_bytes: inner.pooled_bytes,
                max_bytes: self.max_bytes,
                hits: inner.hits,
                misses: inner.misses,
                num_buffers: inner.buckets.values().map(Vec::len).sum(),
            },
            Err(_) => PoolStats::default(),
        }
    }

    /// Drop all idle buffers
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.buckets.clear();
            inner.pooled_bytes = 0;
        }
    }
}

/// Pool statistics
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Buffers checked out and not yet returned
    pub outstanding: usize,
    pub pooled_bytes: usize,
    pub max_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub num_buffers: usize,
}

/// A byte buffer on loan from a [`StagingPool`]
pub struct StagingBuffer {
    data: Vec<u8>,
    pool: Option<StagingPool>,
}

impl StagingBuffer {
    /// A buffer that belongs to no pool
    pub fn detached(data: Vec<u8>) -> Self {
        Self { data, pool: None }
    }
}

impl Deref for StagingBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.data
    }
}

impl DerefMut for StagingBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }
}

impl Drop for StagingBuffer {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.checkin(std::mem::take(&mut self.data));
        }
    }
}

impl std::fmt::Debug for StagingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingBuffer")
            .field("len", &self.data.len())
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_checkin() {
        let pool = StagingPool::new(4, 1024 * 1024);

        let buf = pool.stage(&[1, 2, 3]);
        assert_eq!(&buf[..], &[1, 2, 3]);
        assert_eq!(pool.stats().outstanding, 1);
        assert_eq!(pool.stats().misses, 1);

        drop(buf);
        assert_eq!(pool.stats().outstanding, 0);
        assert_eq!(pool.stats().num_buffers, 1);

        let buf = pool.checkout(10);
        assert!(buf.is_empty());
        assert_eq!(pool.stats().hits, 1);
    }

    #[test]
    fn test_byte_limit() {
        let pool = StagingPool::new(4, 1024);
        drop(pool.checkout(100));
        // The 4 KB minimum bucket exceeds the limit, so nothing is kept
        assert_eq!(pool.stats().num_buffers, 0);
        assert_eq!(pool.stats().outstanding, 0);
    }

    #[test]
    fn test_released_during_unwind() {
        let pool = StagingPool::default();
        let buf = pool.stage(b"payload");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _held = buf;
            panic!("transcoder blew up");
        }));
        assert!(result.is_err());
        assert_eq!(pool.stats().outstanding, 0);
    }

    #[test]
    fn test_detached_buffer() {
        let pool = StagingPool::default();
        drop(StagingBuffer::detached(vec![0; 16]));
        assert_eq!(pool.stats().num_buffers, 0);
    }

    #[test]
    fn test_bucket_sizes() {
        assert_eq!(bucket_for(0), MIN_BUCKET);
        assert_eq!(bucket_for(5000), 8192);
        assert_eq!(bucket_for(8192), 8192);
    }
}

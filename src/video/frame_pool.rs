//! Fixed pool of decoded-frame buffers with explicit ownership transfer.
//!
//! Buffers move through the pipeline (extractor, play cache, barrier,
//! compositor) and only re-enter the pool when their last owner recycles
//! them, so a buffer can never be overwritten while someone downstream is
//! still reading it.

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::PlayerError;

/// One decoded RGBA8 frame, exclusively owned by whoever holds it.
#[derive(Debug)]
pub struct FrameBuffer {
    data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Position within the extraction that produced this frame (0..range)
    pub sequence: usize,
    /// Presentation timestamp in microseconds
    pub timestamp_us: i64,
    recycle_tx: Sender<Vec<u8>>,
}

impl FrameBuffer {
    /// Pixel data, `width * height * 4` bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Return the underlying buffer to its pool.
    pub fn recycle(self) {
        // The pool keeps its own sender alive for the session lifetime, so
        // this only fails during teardown, when the storage is dropped anyway.
        let _ = self.recycle_tx.send(self.data);
    }
}

/// Pool of `history_size` preallocated frame buffers for one stream.
pub struct FramePool {
    free_rx: Receiver<Vec<u8>>,
    recycle_tx: Sender<Vec<u8>>,
    width: u32,
    height: u32,
    capacity: usize,
}

impl FramePool {
    /// Allocate a pool of `history_size` zeroed RGBA8 buffers.
    pub fn new(width: u32, height: u32, history_size: usize) -> Self {
        let frame_bytes = width as usize * height as usize * 4;
        let (recycle_tx, free_rx) = bounded(history_size);
        for _ in 0..history_size {
            // Cannot fail: the channel holds exactly history_size slots.
            let _ = recycle_tx.send(vec![0u8; frame_bytes]);
        }
        Self {
            free_rx,
            recycle_tx,
            width,
            height,
            capacity: history_size,
        }
    }

    /// Take ownership of a free buffer, blocking until a downstream owner
    /// recycles one.
    pub fn acquire(&self, sequence: usize, timestamp_us: i64) -> Result<FrameBuffer, PlayerError> {
        let data = self.free_rx.recv().map_err(|_| PlayerError::PoolClosed)?;
        Ok(FrameBuffer {
            data,
            width: self.width,
            height: self.height,
            sequence,
            timestamp_us,
            recycle_tx: self.recycle_tx.clone(),
        })
    }

    /// Total buffers owned by this pool.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Buffers currently free for acquisition.
    pub fn available(&self) -> usize {
        self.free_rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_recycle() {
        let pool = FramePool::new(4, 4, 2);
        assert_eq!(pool.available(), 2);

        let mut frame = pool.acquire(0, 100).unwrap();
        assert_eq!(frame.data().len(), 4 * 4 * 4);
        assert_eq!(frame.sequence, 0);
        assert_eq!(frame.timestamp_us, 100);
        frame.data_mut()[0] = 0xAB;
        assert_eq!(pool.available(), 1);

        frame.recycle();
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_buffer_not_reused_until_recycled() {
        let pool = FramePool::new(2, 2, 1);
        let frame = pool.acquire(0, 0).unwrap();
        assert_eq!(pool.available(), 0);

        // The only buffer is in flight; an acquire now would block.
        assert!(pool.free_rx.is_empty());
        frame.recycle();
        let again = pool.acquire(1, 50).unwrap();
        assert_eq!(again.sequence, 1);
    }
}

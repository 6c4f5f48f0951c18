//! Per-thread scratch buffers for the read paths
//!
//! Read calls arrive concurrently on arbitrary kernel threads; each thread
//! lazily gets its own buffers on first touch and reuses them across calls.
//! Nothing here is ever shared between threads.

use std::cell::RefCell;

#[derive(Default)]
pub(crate) struct EncoderScratch {
    /// Raw source bytes of the current batch
    pub read: Vec<u8>,
    /// Batch transposed into contiguous FEC input blocks
    pub work: Vec<u8>,
}

#[derive(Default)]
pub(crate) struct DecoderScratch {
    /// One payload window per opened share
    pub reads: Vec<Vec<u8>>,
    /// Reconstructed principal blocks
    pub work: Vec<u8>,
}

thread_local! {
    static ENCODER: RefCell<EncoderScratch> = RefCell::default();
    static DECODER: RefCell<DecoderScratch> = RefCell::default();
}

pub(crate) fn with_encoder<R>(f: impl FnOnce(&mut EncoderScratch) -> R) -> R {
    ENCODER.with(|cell| f(&mut cell.borrow_mut()))
}

pub(crate) fn with_decoder<R>(f: impl FnOnce(&mut DecoderScratch) -> R) -> R {
    DECODER.with(|cell| f(&mut cell.borrow_mut()))
}

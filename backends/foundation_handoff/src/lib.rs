//! Thread hand-off primitives: a blocking FIFO queue, a thread handle
//! that joins when dropped, a one-way shutdown flag, and the
//! producer/consumer protocol built from them.

pub mod config;
pub mod errors;
pub mod handoff;
pub mod synca;

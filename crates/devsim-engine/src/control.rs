//! # devsim-engine::control
//!
//! Defines control messages an embedder can send to a running coordinator
//! from another thread. Messages are honoured between bags: the kernel never
//! interrupts a transition.

/// Control messages for the coordinator's main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMsg {
    /// Suspend after the current bag; the loop idles until `Resume` or `Stop`.
    Pause,
    /// Resume a paused loop.
    Resume,
    /// Stop the run. The coordinator flushes observers and returns normally.
    Stop,
}

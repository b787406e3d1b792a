//! Controller subsystem for gamepad input handling
//!
//! Implements a three-stage pipeline:
//!
//! 1. [`event_source`] - Raw event batches from the hardware
//! 2. [`reducer`] - Folding batches into a fixed-domain state table
//! 3. [`semantic`] - Labelled projection of snapshots through a layout profile
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► EventSource ──► StateReducer ──► Snapshot ──► SemanticView
//!             (Raw Events)    (owned state)    (copy)       (named groups)
//! ```

pub mod event_source;
pub mod reducer;
pub mod semantic;

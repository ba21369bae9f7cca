//! Anchor resolution scheduling: pose sampling and priority computation.
//!
//! Converts the high-frequency pose stream into a rate-limited set of
//! resolution requests. The mailbox keeps only the newest pose; the
//! priority pass runs at a fixed low cadence and emits admissions through a
//! channel the session owner drains once per tick.

pub mod mailbox;
pub mod priority;

pub use mailbox::PoseMailbox;
pub use priority::{compute_admissions, SchedulerView};

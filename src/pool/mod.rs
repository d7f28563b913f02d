//! Worker pool and pipeline plumbing.
//!
//! # Components
//!
//! - [`StreamPool`]: fixed OS-thread pool; each worker owns a context built at
//!   startup and passed by `&mut` to every job it runs
//! - [`Bound`]: a per-item function bound to a pool, fed through a bounded
//!   work queue with results delivered on the calling thread
//! - [`ResourcePool`]: bounded set of reusable resources (connections)
//! - [`run_staged`]: issue on the calling thread, complete on the workers,
//!   with the resource pool capping how many requests are in flight
//!
//! ```text
//!   caller ──(index, item)──▶ [bounded queue] ──▶ worker 0 (ctx 0) ─┐
//!     ▲                                      └──▶ worker 1 (ctx 1) ─┤
//!     └──────────────(index, result)────────────────────────────────┘
//! ```

mod resources;
mod staged;
mod workers;

pub use resources::{Checkout, ResourcePool};
pub use staged::run_staged;
pub use workers::{Bound, StreamPool};

// ── Status store ──
//
// Snapshot storage with TTL refresh and change detection.

mod cache;
mod history;

pub use cache::{Mutation, StatusCache};

//! Session lifecycle and tier rules.

pub mod lifecycle;
pub mod tier;

pub use lifecycle::{SessionManager, current_user};
pub use tier::{Tier, tier_satisfies};

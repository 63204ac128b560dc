pub mod audit;
pub mod guard;

pub use audit::audit_requests;
pub use guard::{require_authenticated, require_tier};

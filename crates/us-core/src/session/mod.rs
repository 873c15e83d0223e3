mod cache;
mod stats;

pub use cache::{QueryResults, SessionCache};
pub use stats::SessionStats;

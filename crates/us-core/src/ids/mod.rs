mod session_id;
mod source_id;

pub use session_id::SessionId;
pub use source_id::SourceId;

mod backend;
mod clock;
mod receiver;
mod shortcut_repository;
mod source;

pub use backend::SuggestionBackendPort;
pub use clock::ClockPort;
pub use receiver::SuggestionReceiver;
pub use shortcut_repository::ShortcutRepositoryPort;
pub use source::{SourceLookupPort, SuggestionSourcePort};

mod cursor;
mod engine;
mod manager;
mod multiplexer;
mod notifier;
mod refresher;
mod relay;
mod task;

pub use cursor::{
    Column, CursorListener, CursorRequest, CursorRequestError, CursorResponse, SessionCursor,
};
pub use engine::{SearchSession, SessionCallback};
pub use manager::{order_sources, SessionManager};
pub use multiplexer::QueryMultiplexer;
pub use notifier::ChangeNotifier;
pub use refresher::ShortcutRefresher;
pub use relay::ResultRelay;
pub use task::CancellableTask;

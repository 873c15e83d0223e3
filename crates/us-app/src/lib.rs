//! # us-app
//!
//! The session layer of the unisearch engine: per-keystroke orchestration
//! of shortcut lookup, cached reuse, source fan-out and snapshot cursors,
//! plus the session manager that owns source ordering and stats reporting.

pub mod session;

pub use session::{
    CursorListener, CursorRequest, CursorRequestError, CursorResponse, QueryMultiplexer,
    SearchSession, SessionCallback, SessionCursor, SessionManager, ShortcutRefresher,
};

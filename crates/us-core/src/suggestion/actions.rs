//! Intent action names and special marker values understood by the engine.

/// Launch a web search for the suggestion's query.
pub const ACTION_WEB_SEARCH: &str = "unisearch.action.WEB_SEARCH";

/// Open the suggestion's intent data (a URI).
pub const ACTION_VIEW: &str = "unisearch.action.VIEW";

/// Fallback action for rows that carry none and whose source declares none.
pub const ACTION_DEFAULT: &str = "unisearch.action.DEFAULT";

/// The suggestion launches nothing (the "more results" expander row).
pub const ACTION_NONE: &str = "unisearch.action.NONE";

/// Switch the active search source to the one named by the intent data.
pub const ACTION_CHANGE_SOURCE: &str = "unisearch.action.CHANGE_SOURCE";

/// Shortcut id marking a suggestion that must never be persisted as a
/// shortcut, regardless of clicks.
pub const NEVER_MAKE_SHORTCUT: &str = "_-1";

/// Icon shown in the second icon slot while a shortcut is being revalidated.
pub const SPINNER_ICON: &str = "resource://unisearch/spinner";

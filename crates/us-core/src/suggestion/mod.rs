pub mod actions;
mod data;
mod factory;
mod response;
pub mod row;

pub use data::{Suggestion, SuggestionBuilder};
pub use factory::{SuggestionViewFactory, BUILTIN_SOURCE};
pub use response::{ResultCode, SourceResponse};

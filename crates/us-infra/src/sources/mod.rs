mod tabular;

pub use tabular::{TabularSourceDescriptor, TabularSuggestionSource};

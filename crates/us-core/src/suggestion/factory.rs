//! Built-in suggestions: "go to website", "search the web", the
//! "more results" expander and the per-source corpus entries.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::mixer::{CorpusEntryFactory, MoreEntryFactory, SourceStat};
use crate::suggestion::{actions, Suggestion};

/// Component id the built-in rows are attributed to.
pub const BUILTIN_SOURCE: &str = "unisearch/builtin";

static WEB_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)?([-a-zA-Z0-9]+\.)+[a-zA-Z]{2,}(:\d{1,5})?(/[-a-zA-Z0-9@:%_\+.~#?&/=]*)?$")
        .expect("web url pattern")
});

const MORE_ICON: &str = "resource://unisearch/more_results";
const MORE_ICON_EXPANDED: &str = "resource://unisearch/more_results_expanded";
const MAGNIFYING_GLASS_ICON: &str = "resource://unisearch/magnifying_glass";
const GLOBE_ICON: &str = "resource://unisearch/globe";

/// Builds the built-in rows for one query.
#[derive(Debug, Clone)]
pub struct SuggestionViewFactory {
    query: String,
    corpus_background_color: Option<u32>,
}

impl SuggestionViewFactory {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            corpus_background_color: None,
        }
    }

    pub fn with_corpus_background_color(mut self, color: u32) -> Self {
        self.corpus_background_color = Some(color);
        self
    }

    /// The "search the web for ..." row, absent for empty queries.
    pub fn search_the_web(&self) -> Option<Suggestion> {
        if self.query.is_empty() {
            return None;
        }
        Some(
            Suggestion::builder(BUILTIN_SOURCE)
                .title("Search the web")
                .description(format!("Search the web for '{}'", self.query))
                .icon1(MAGNIFYING_GLASS_ICON)
                .intent_action(actions::ACTION_WEB_SEARCH)
                .intent_query(self.query.clone())
                .shortcut_id(actions::NEVER_MAKE_SHORTCUT)
                .build(),
        )
    }

    /// The "go to website" row, present only when the query reads as a web
    /// URL. Bare host names get an `http://` scheme.
    pub fn go_to_website(&self) -> Option<Suggestion> {
        let trimmed = self.query.trim();
        if trimmed.is_empty() || !WEB_URL_REGEX.is_match(trimmed) {
            return None;
        }
        let url = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };
        Some(
            Suggestion::builder(BUILTIN_SOURCE)
                .title("Go to website")
                .description(trimmed)
                .icon1(GLOBE_ICON)
                .intent_action(actions::ACTION_VIEW)
                .intent_data(url)
                .build(),
        )
    }

    fn apply_background(&self, builder: crate::suggestion::SuggestionBuilder) -> crate::suggestion::SuggestionBuilder {
        match self.corpus_background_color {
            Some(color) => builder.background_color(color),
            None => builder,
        }
    }
}

impl MoreEntryFactory for SuggestionViewFactory {
    fn more_entry(&self, expanded: bool, source_stats: &[SourceStat]) -> Suggestion {
        let mut description = String::new();
        let mut any_pending = false;
        for stat in source_stats {
            if !stat.responded {
                any_pending = true;
            }
            if stat.num_results > 0 {
                if !description.is_empty() {
                    description.push_str(", ");
                }
                description.push_str(&stat.label);
                description.push_str(": ");
                description.push_str(&count_string(stat.num_results, stat.query_limit));
            }
        }

        let mut builder = Suggestion::builder(BUILTIN_SOURCE)
            .title("More results")
            .description(description)
            .icon1(if expanded { MORE_ICON_EXPANDED } else { MORE_ICON })
            .intent_action(actions::ACTION_NONE)
            .shortcut_id(actions::NEVER_MAKE_SHORTCUT);
        if any_pending {
            builder = builder.icon2(actions::SPINNER_ICON);
        }
        self.apply_background(builder).build()
    }
}

impl CorpusEntryFactory for SuggestionViewFactory {
    fn corpus_entry(&self, stat: &SourceStat) -> Suggestion {
        let mut builder = Suggestion::builder(BUILTIN_SOURCE)
            .title(stat.label.clone())
            .intent_action(actions::ACTION_CHANGE_SOURCE)
            .intent_data(stat.source.as_str())
            .intent_query(self.query.clone())
            .shortcut_id(actions::NEVER_MAKE_SHORTCUT);

        if let Some(icon) = &stat.icon {
            builder = builder.icon1(icon.clone());
        }

        if stat.responded {
            let noun = if stat.num_results == 1 { "result" } else { "results" };
            let description = if stat.promoted {
                format!("{} more {noun}", stat.num_results)
            } else {
                format!("{} {noun}", stat.num_results)
            };
            builder = builder.description(description);
        } else {
            builder = builder.icon2(actions::SPINNER_ICON);
        }

        self.apply_background(builder).build()
    }
}

/// Rounded rendering of a result count: exact while under the limit,
/// otherwise a lower multiple of ten with a `+` suffix.
fn count_string(count: usize, limit: usize) -> String {
    if limit == 0 || count < limit {
        count.to_string()
    } else if limit > 10 {
        format!("{}+", 10 * ((limit - 1) / 10))
    } else {
        format!("{count}+")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SourceId;

    fn stat(label: &str, responded: bool, num: usize, limit: usize) -> SourceStat {
        SourceStat {
            source: SourceId::from("pkg/App"),
            promoted: false,
            label: label.to_string(),
            icon: None,
            responded,
            num_results: num,
            query_limit: limit,
        }
    }

    #[test]
    fn search_the_web_absent_for_empty_query() {
        assert!(SuggestionViewFactory::new("").search_the_web().is_none());
        let s = SuggestionViewFactory::new("kittens")
            .search_the_web()
            .unwrap();
        assert_eq!(s.intent_query.as_deref(), Some("kittens"));
        assert_eq!(s.intent_action.as_deref(), Some(actions::ACTION_WEB_SEARCH));
    }

    #[test]
    fn go_to_website_requires_url_shape() {
        assert!(SuggestionViewFactory::new("kittens").go_to_website().is_none());
        let s = SuggestionViewFactory::new("example.com").go_to_website().unwrap();
        assert_eq!(s.intent_data.as_deref(), Some("http://example.com"));
        // A visited website may become a shortcut like any other result.
        assert!(s.is_shortcuttable());
        let s = SuggestionViewFactory::new("https://example.com/a")
            .go_to_website()
            .unwrap();
        assert_eq!(s.intent_data.as_deref(), Some("https://example.com/a"));
    }

    #[test]
    fn more_entry_aggregates_counts_and_pending() {
        let factory = SuggestionViewFactory::new("q");
        let entry = factory.more_entry(
            false,
            &[
                stat("Apps", true, 3, 50),
                stat("Music", false, 0, 0),
                stat("Contacts", true, 0, 50),
            ],
        );
        assert_eq!(entry.description.as_deref(), Some("Apps: 3"));
        assert_eq!(entry.icon2.as_deref(), Some(actions::SPINNER_ICON));
        assert!(!entry.is_shortcuttable());
    }

    #[test]
    fn corpus_entry_descriptions() {
        let factory = SuggestionViewFactory::new("q");
        let mut responded = stat("Apps", true, 2, 50);
        responded.promoted = true;
        let entry = factory.corpus_entry(&responded);
        assert_eq!(entry.description.as_deref(), Some("2 more results"));
        assert_eq!(entry.intent_action.as_deref(), Some(actions::ACTION_CHANGE_SOURCE));
        assert_eq!(entry.intent_data.as_deref(), Some("pkg/App"));

        let pending = factory.corpus_entry(&stat("Music", false, 0, 0));
        assert_eq!(pending.description, None);
        assert_eq!(pending.icon2.as_deref(), Some(actions::SPINNER_ICON));
    }

    #[test]
    fn count_string_rounding() {
        assert_eq!(count_string(3, 50), "3");
        assert_eq!(count_string(50, 50), "40+");
        assert_eq!(count_string(7, 7), "7+");
        assert_eq!(count_string(12, 0), "12");
    }
}

use serde::{Deserialize, Serialize};

use crate::ids::SourceId;

/// One displayable suggestion row. Immutable once built.
///
/// Two identities matter to the engine:
/// - the mixed-region dedup key, `(intent_action, intent_data)`, used to
///   suppress live results that duplicate a shortcut;
/// - the durable intent key, `source#intentData#intentAction#intentQuery`,
///   used as the primary key of the shortcut store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub source: SourceId,
    pub format: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub icon1: Option<String>,
    pub icon2: Option<String>,
    pub intent_action: Option<String>,
    pub intent_data: Option<String>,
    pub intent_query: Option<String>,
    pub intent_extra_data: Option<String>,
    pub intent_component_name: Option<String>,
    pub action_msg_call: Option<String>,
    pub shortcut_id: Option<String>,
    pub pin_to_bottom: bool,
    pub spinner_while_refreshing: bool,
    pub background_color: Option<u32>,
}

impl Suggestion {
    pub fn builder(source: impl Into<SourceId>) -> SuggestionBuilder {
        SuggestionBuilder::new(source)
    }

    /// Key used to suppress duplicates of a shortcut in the mixed region.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}#{}",
            self.intent_action.as_deref().unwrap_or(""),
            self.intent_data.as_deref().unwrap_or("")
        )
    }

    /// Canonical durable identity, with absent fields encoded as empty
    /// strings.
    pub fn intent_key(&self) -> String {
        format!(
            "{}#{}#{}#{}",
            self.source,
            self.intent_data.as_deref().unwrap_or(""),
            self.intent_action.as_deref().unwrap_or(""),
            self.intent_query.as_deref().unwrap_or("")
        )
    }

    /// Whether the engine may persist this suggestion as a shortcut when
    /// clicked.
    pub fn is_shortcuttable(&self) -> bool {
        self.shortcut_id.as_deref() != Some(super::actions::NEVER_MAKE_SHORTCUT)
    }
}

#[derive(Debug, Clone)]
pub struct SuggestionBuilder {
    suggestion: Suggestion,
}

impl SuggestionBuilder {
    pub fn new(source: impl Into<SourceId>) -> Self {
        Self {
            suggestion: Suggestion {
                source: source.into(),
                format: None,
                title: String::new(),
                description: None,
                icon1: None,
                icon2: None,
                intent_action: None,
                intent_data: None,
                intent_query: None,
                intent_extra_data: None,
                intent_component_name: None,
                action_msg_call: None,
                shortcut_id: None,
                pin_to_bottom: false,
                spinner_while_refreshing: false,
                background_color: None,
            },
        }
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.suggestion.format = Some(format.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.suggestion.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.suggestion.description = Some(description.into());
        self
    }

    pub fn icon1(mut self, icon: impl Into<String>) -> Self {
        self.suggestion.icon1 = Some(icon.into());
        self
    }

    pub fn icon2(mut self, icon: impl Into<String>) -> Self {
        self.suggestion.icon2 = Some(icon.into());
        self
    }

    pub fn intent_action(mut self, action: impl Into<String>) -> Self {
        self.suggestion.intent_action = Some(action.into());
        self
    }

    pub fn intent_data(mut self, data: impl Into<String>) -> Self {
        self.suggestion.intent_data = Some(data.into());
        self
    }

    pub fn intent_query(mut self, query: impl Into<String>) -> Self {
        self.suggestion.intent_query = Some(query.into());
        self
    }

    pub fn intent_extra_data(mut self, extra: impl Into<String>) -> Self {
        self.suggestion.intent_extra_data = Some(extra.into());
        self
    }

    pub fn intent_component_name(mut self, name: impl Into<String>) -> Self {
        self.suggestion.intent_component_name = Some(name.into());
        self
    }

    pub fn action_msg_call(mut self, msg: impl Into<String>) -> Self {
        self.suggestion.action_msg_call = Some(msg.into());
        self
    }

    pub fn shortcut_id(mut self, id: impl Into<String>) -> Self {
        self.suggestion.shortcut_id = Some(id.into());
        self
    }

    pub fn pin_to_bottom(mut self, pin: bool) -> Self {
        self.suggestion.pin_to_bottom = pin;
        self
    }

    pub fn spinner_while_refreshing(mut self, spinner: bool) -> Self {
        self.suggestion.spinner_while_refreshing = spinner;
        self
    }

    pub fn background_color(mut self, color: u32) -> Self {
        self.suggestion.background_color = Some(color);
        self
    }

    pub fn build(self) -> Suggestion {
        self.suggestion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_key_encodes_absent_fields_as_empty() {
        let s = Suggestion::builder("pkg/App")
            .title("title")
            .intent_action("view")
            .build();
        assert_eq!(s.intent_key(), "pkg/App##view#");
    }

    #[test]
    fn intent_key_includes_all_parts() {
        let s = Suggestion::builder("pkg/App")
            .title("title")
            .intent_action("view")
            .intent_data("content://item/1")
            .intent_query("it")
            .build();
        assert_eq!(s.intent_key(), "pkg/App#content://item/1#view#it");
    }

    #[test]
    fn dedup_key_ignores_title() {
        let a = Suggestion::builder("pkg/App")
            .title("one")
            .intent_action("view")
            .intent_data("d")
            .build();
        let b = Suggestion::builder("pkg/App")
            .title("two")
            .intent_action("view")
            .intent_data("d")
            .build();
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn never_make_shortcut_is_not_shortcuttable() {
        let s = Suggestion::builder("pkg/App")
            .title("more")
            .shortcut_id(super::super::actions::NEVER_MAKE_SHORTCUT)
            .build();
        assert!(!s.is_shortcuttable());
        let t = Suggestion::builder("pkg/App").title("plain").build();
        assert!(t.is_shortcuttable());
    }
}

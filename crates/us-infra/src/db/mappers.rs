use us_core::suggestion::{actions, Suggestion};
use us_core::SourceId;

use crate::db::models::ShortcutRow;

/// Maps between stored shortcut rows and domain suggestions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortcutRowMapper;

impl ShortcutRowMapper {
    /// Row for persisting `suggestion` as a shortcut. When the suggestion
    /// wants a spinner while refreshing, the stored second icon is the
    /// spinner, so the shortcut shows progress until its next refresh
    /// replaces the in-memory copy.
    pub fn to_row(&self, suggestion: &Suggestion) -> ShortcutRow {
        let icon2 = if suggestion.spinner_while_refreshing {
            Some(actions::SPINNER_ICON.to_string())
        } else {
            suggestion.icon2.clone()
        };
        ShortcutRow {
            intent_key: suggestion.intent_key(),
            source: suggestion.source.to_string(),
            format: suggestion.format.clone(),
            title: suggestion.title.clone(),
            description: suggestion.description.clone(),
            icon1: suggestion.icon1.clone(),
            icon2,
            intent_action: suggestion.intent_action.clone(),
            intent_data: suggestion.intent_data.clone(),
            intent_query: suggestion.intent_query.clone(),
            intent_extra_data: suggestion.intent_extra_data.clone(),
            intent_component_name: suggestion.intent_component_name.clone(),
            shortcut_id: suggestion.shortcut_id.clone(),
            spinner_while_refreshing: suggestion.spinner_while_refreshing,
        }
    }

    pub fn to_suggestion(&self, row: ShortcutRow) -> Suggestion {
        let mut builder = Suggestion::builder(SourceId::from(row.source))
            .title(row.title)
            .spinner_while_refreshing(row.spinner_while_refreshing);
        if let Some(format) = row.format {
            builder = builder.format(format);
        }
        if let Some(description) = row.description {
            builder = builder.description(description);
        }
        if let Some(icon1) = row.icon1 {
            builder = builder.icon1(icon1);
        }
        if let Some(icon2) = row.icon2 {
            builder = builder.icon2(icon2);
        }
        if let Some(action) = row.intent_action {
            builder = builder.intent_action(action);
        }
        if let Some(data) = row.intent_data {
            builder = builder.intent_data(data);
        }
        if let Some(query) = row.intent_query {
            builder = builder.intent_query(query);
        }
        if let Some(extra) = row.intent_extra_data {
            builder = builder.intent_extra_data(extra);
        }
        if let Some(component) = row.intent_component_name {
            builder = builder.intent_component_name(component);
        }
        if let Some(id) = row.shortcut_id {
            builder = builder.shortcut_id(id);
        }
        builder.build()
    }
}

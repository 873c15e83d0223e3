//! Tabular wire shape produced by suggestion sources.
//!
//! Sources answer queries as rows of UTF-8 columns; this module converts one
//! row into a [`Suggestion`] given the owning source's identity and
//! declared defaults. Only `text1` is required.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::ids::SourceId;
use crate::suggestion::{actions, Suggestion};

/// Everything percent-encoded except unreserved characters.
const DATA_ID_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// One row as reported by a source, prior to normalization.
#[derive(Debug, Clone, Default)]
pub struct SuggestionRow {
    pub format: Option<String>,
    pub text1: String,
    pub text2: Option<String>,
    pub icon1: Option<String>,
    pub icon2: Option<String>,
    pub intent_action: Option<String>,
    pub intent_data: Option<String>,
    pub intent_data_id: Option<String>,
    pub intent_extra_data: Option<String>,
    pub query: Option<String>,
    pub action_msg_call: Option<String>,
    pub shortcut_id: Option<String>,
    pub spinner_while_refreshing: bool,
    pub pin_to_bottom: bool,
    pub intent_component_name: Option<String>,
    pub background_color: Option<u32>,
}

/// The source-side context a row is interpreted against.
#[derive(Debug, Clone)]
pub struct RowContext {
    pub source: SourceId,
    /// Package half of the source id, used to absolutize resource icons.
    pub source_package: String,
    /// Icon shown when the row carries none.
    pub default_icon: Option<String>,
    pub default_intent_action: Option<String>,
    pub default_intent_data: Option<String>,
}

impl SuggestionRow {
    pub fn into_suggestion(self, ctx: &RowContext) -> Suggestion {
        let mut builder = Suggestion::builder(ctx.source.clone())
            .title(self.text1)
            .description(self.text2.unwrap_or_default())
            // Intents are always routed back to the owning source.
            .intent_component_name(ctx.source.as_str())
            .pin_to_bottom(self.pin_to_bottom)
            .spinner_while_refreshing(self.spinner_while_refreshing);

        if let Some(format) = self.format {
            builder = builder.format(format);
        }

        let icon1 = icon_uri(self.icon1.as_deref(), &ctx.source_package)
            .or_else(|| ctx.default_icon.clone());
        if let Some(icon1) = icon1 {
            builder = builder.icon1(icon1);
        }
        if let Some(icon2) = icon_uri(self.icon2.as_deref(), &ctx.source_package) {
            builder = builder.icon2(icon2);
        }

        let action = self
            .intent_action
            .or_else(|| ctx.default_intent_action.clone())
            .unwrap_or_else(|| actions::ACTION_DEFAULT.to_string());
        builder = builder.intent_action(action);

        let data = self.intent_data.or_else(|| ctx.default_intent_data.clone());
        if let Some(data) = data {
            let data = match self.intent_data_id.as_deref() {
                Some(id) => format!("{}/{}", data, utf8_percent_encode(id, DATA_ID_ENCODE_SET)),
                None => data,
            };
            builder = builder.intent_data(data);
        }

        if let Some(query) = self.query {
            builder = builder.intent_query(query);
        }
        if let Some(extra) = self.intent_extra_data {
            builder = builder.intent_extra_data(extra);
        }
        if let Some(msg) = self.action_msg_call {
            builder = builder.action_msg_call(msg);
        }
        if let Some(id) = self.shortcut_id {
            builder = builder.shortcut_id(id);
        }
        if let Some(color) = self.background_color {
            builder = builder.background_color(color);
        }

        builder.build()
    }
}

/// Normalizes an icon column: null, empty and `"0"` mean no icon; a value
/// with a non-digit first character is an opaque URI; anything else is a
/// resource id within the source's package.
fn icon_uri(raw: Option<&str>, source_package: &str) -> Option<String> {
    let raw = raw?;
    if raw.is_empty() || raw == "0" {
        return None;
    }
    match raw.chars().next() {
        Some(c) if !c.is_ascii_digit() => Some(raw.to_string()),
        _ => Some(format!("resource://{source_package}/{raw}")),
    }
}

use diesel::prelude::*;
use diesel::sql_types::Text;

use crate::db::schema::{click_log, shortcuts, source_event_log};

/// One stored shortcut. Background color and pin-to-bottom are deliberately
/// absent: the rows carrying them are never eligible for shortcutting.
#[derive(Debug, Clone, Queryable, QueryableByName, Insertable)]
#[diesel(table_name = shortcuts)]
pub struct ShortcutRow {
    pub intent_key: String,
    pub source: String,
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
    pub shortcut_id: Option<String>,
    pub spinner_while_refreshing: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = click_log)]
pub struct NewClickRow {
    pub intent_key: String,
    pub query: String,
    pub hit_time: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = source_event_log)]
pub struct NewSourceEventRow {
    pub component: String,
    pub time: i64,
    pub click_count: i32,
    pub impression_count: i32,
}

/// Row shape of the CTR ranking query.
#[derive(Debug, QueryableByName)]
pub struct RankedComponentRow {
    #[diesel(sql_type = Text)]
    pub component: String,
}

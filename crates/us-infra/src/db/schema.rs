diesel::table! {
    shortcuts (intent_key) {
        intent_key -> Text,
        source -> Text,
        format -> Nullable<Text>,
        title -> Text,
        description -> Nullable<Text>,
        icon1 -> Nullable<Text>,
        icon2 -> Nullable<Text>,
        intent_action -> Nullable<Text>,
        intent_data -> Nullable<Text>,
        intent_query -> Nullable<Text>,
        intent_extra_data -> Nullable<Text>,
        intent_component_name -> Nullable<Text>,
        shortcut_id -> Nullable<Text>,
        spinner_while_refreshing -> Bool,
    }
}

diesel::table! {
    click_log (id) {
        id -> Integer,
        intent_key -> Text,
        query -> Text,
        hit_time -> BigInt,
    }
}

diesel::table! {
    source_event_log (id) {
        id -> Integer,
        component -> Text,
        time -> BigInt,
        click_count -> Integer,
        impression_count -> Integer,
    }
}

diesel::table! {
    source_totals (component) {
        component -> Text,
        total_clicks -> BigInt,
        total_impressions -> BigInt,
    }
}

diesel::joinable!(click_log -> shortcuts (intent_key));

diesel::allow_tables_to_appear_in_same_query!(
    shortcuts,
    click_log,
    source_event_log,
    source_totals,
);

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use diesel::prelude::*;

use us_core::ports::{ClockPort, ShortcutRepositoryPort};
use us_core::suggestion::actions;
use us_core::{EngineConfig, SessionStats, SourceId, Suggestion};
use us_infra::db::executor::DieselSqliteExecutor;
use us_infra::db::pool::init_db_pool;
use us_infra::db::repositories::DieselShortcutRepository;

const DAY_MS: i64 = 86_400_000;
const NOW: i64 = 100 * DAY_MS;

struct ManualClock {
    now: Mutex<i64>,
}

impl ManualClock {
    fn new(now: i64) -> Arc<Self> {
        Arc::new(Self { now: Mutex::new(now) })
    }

    fn advance(&self, delta: i64) {
        *self.now.lock().unwrap() += delta;
    }
}

impl ClockPort for ManualClock {
    fn now_ms(&self) -> i64 {
        *self.now.lock().unwrap()
    }
}

struct Fixture {
    // Holds the database directory for the lifetime of the test.
    _dir: tempfile::TempDir,
    db_path: String,
    clock: Arc<ManualClock>,
    repo: DieselShortcutRepository<DieselSqliteExecutor>,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir
            .path()
            .join("shortcuts.db")
            .to_string_lossy()
            .into_owned();
        let pool = init_db_pool(&db_path).expect("db pool");
        let clock = ManualClock::new(NOW);
        let repo = DieselShortcutRepository::new(
            DieselSqliteExecutor::new(pool),
            clock.clone(),
            EngineConfig::default(),
        );
        Self {
            _dir: dir,
            db_path,
            clock,
            repo,
        }
    }

    async fn click(&self, query: &str, clicked: Suggestion) {
        let impressions = HashSet::from([clicked.source.clone()]);
        self.repo
            .report_stats(&SessionStats::new(query, Some(clicked), impressions))
            .await
            .expect("report stats");
    }
}

fn suggestion(source: &str, title: &str) -> Suggestion {
    Suggestion::builder(source)
        .title(title)
        .intent_action("view")
        .intent_data(format!("content://{title}"))
        .shortcut_id(format!("id-{title}"))
        .build()
}

fn titles(suggestions: &[Suggestion]) -> Vec<&str> {
    suggestions.iter().map(|s| s.title.as_str()).collect()
}

#[tokio::test]
async fn clicked_suggestion_surfaces_for_query_prefixes() {
    let f = Fixture::new();
    let clicked = suggestion("com.example/App", "kittens");
    f.click("kitt", clicked.clone()).await;

    assert!(f.repo.has_history().await.unwrap());
    for prefix in ["kitt", "kit", "k", ""] {
        let shortcuts = f.repo.shortcuts_for_query(prefix).await.unwrap();
        assert_eq!(titles(&shortcuts), vec!["kittens"], "prefix {prefix:?}");
    }
    for miss in ["kittz", "cat"] {
        assert!(f.repo.shortcuts_for_query(miss).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn prefix_match_handles_multibyte_queries() {
    let f = Fixture::new();
    f.click("caf\u{00E9}", suggestion("com.example/App", "caf\u{00E9}s near me"))
        .await;

    let shortcuts = f.repo.shortcuts_for_query("caf").await.unwrap();
    assert_eq!(titles(&shortcuts), vec!["caf\u{00E9}s near me"]);
    let shortcuts = f.repo.shortcuts_for_query("caf\u{00E9}").await.unwrap();
    assert_eq!(titles(&shortcuts), vec!["caf\u{00E9}s near me"]);
}

#[tokio::test]
async fn more_recent_and_more_clicked_shortcuts_rank_higher() {
    let f = Fixture::new();
    let stale = suggestion("com.example/App", "stale");
    let fresh = suggestion("com.example/App", "fresh");

    // Three old clicks lose to one fresh click once decay kicks in.
    f.click("s", stale.clone()).await;
    f.click("s", stale.clone()).await;
    f.click("s", stale.clone()).await;
    f.clock.advance(6 * DAY_MS + DAY_MS / 2);
    f.click("s", fresh.clone()).await;

    let shortcuts = f.repo.shortcuts_for_query("s").await.unwrap();
    assert_eq!(titles(&shortcuts), vec!["fresh", "stale"]);
}

#[tokio::test]
async fn expired_clicks_do_not_surface_shortcuts() {
    let f = Fixture::new();
    f.click("old", suggestion("com.example/App", "old news")).await;

    f.clock.advance(8 * DAY_MS);
    assert!(f.repo.shortcuts_for_query("old").await.unwrap().is_empty());
    assert!(f.repo.shortcuts_for_query("").await.unwrap().is_empty());
}

#[tokio::test]
async fn click_log_rows_older_than_stat_age_are_purged() {
    let f = Fixture::new();
    f.click("a", suggestion("com.example/App", "first")).await;
    f.clock.advance(8 * DAY_MS);
    f.click("b", suggestion("com.example/App", "second")).await;

    let mut conn = diesel::SqliteConnection::establish(&f.db_path).expect("connect");
    let rows: i64 = {
        use diesel::dsl::count_star;
        us_infra::db::schema::click_log::table
            .select(count_star())
            .first(&mut conn)
            .expect("count")
    };
    assert_eq!(rows, 1, "the purge keeps only clicks within the stat age");
}

#[tokio::test]
async fn never_make_shortcut_clicks_are_not_persisted() {
    let f = Fixture::new();
    let clicked = Suggestion::builder("com.example/App")
        .title("more results")
        .shortcut_id(actions::NEVER_MAKE_SHORTCUT)
        .build();
    f.click("mo", clicked).await;

    assert!(!f.repo.has_history().await.unwrap());
    assert!(f.repo.shortcuts_for_query("mo").await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_stats_report_leaves_no_trace() {
    let f = Fixture::new();
    f.click("q", suggestion("com.example/App", "existing")).await;
    let before = f.repo.shortcuts_for_query("q").await.unwrap();
    let ranking_before = f.repo.source_ranking().await.unwrap();

    f.repo
        .report_stats(&SessionStats::new("q2", None, HashSet::new()))
        .await
        .unwrap();

    assert_eq!(f.repo.shortcuts_for_query("q").await.unwrap(), before);
    assert_eq!(f.repo.source_ranking().await.unwrap(), ranking_before);
}

#[tokio::test]
async fn spinner_suggestion_round_trips_with_spinner_icon() {
    let f = Fixture::new();
    let clicked = Suggestion::builder("com.example/App")
        .title("refreshing")
        .intent_action("view")
        .intent_data("content://refreshing")
        .shortcut_id("id-refreshing")
        .icon2("real icon")
        .spinner_while_refreshing(true)
        .build();
    f.click("re", clicked).await;

    let shortcuts = f.repo.shortcuts_for_query("re").await.unwrap();
    assert_eq!(shortcuts.len(), 1);
    assert_eq!(shortcuts[0].icon2.as_deref(), Some(actions::SPINNER_ICON));
}

#[tokio::test]
async fn impressions_without_clicks_drag_ranking_down() {
    let f = Fixture::new();
    let x = SourceId::from("com.example/X");
    let y = SourceId::from("com.example/Y");

    // X: 10 clicks over 100 impressions; Y: 1 click over 5 impressions.
    for i in 0..100 {
        let clicked = (i < 10).then(|| suggestion("com.example/X", "from x"));
        f.repo
            .report_stats(&SessionStats::new("q", clicked, HashSet::from([x.clone()])))
            .await
            .unwrap();
    }
    for i in 0..5 {
        let clicked = (i < 1).then(|| suggestion("com.example/Y", "from y"));
        f.repo
            .report_stats(&SessionStats::new("q", clicked, HashSet::from([y.clone()])))
            .await
            .unwrap();
    }

    // With priors (3, 30): X scores 1000*13/130 = 100, Y scores
    // 1000*4/35 = 114, so the small sample still cannot jump ahead of a
    // consistently clicked source by much.
    assert_eq!(f.repo.source_ranking().await.unwrap(), vec![y, x]);
}

#[tokio::test]
async fn refresh_updates_mutable_display_fields() {
    let f = Fixture::new();
    let clicked = suggestion("com.example/App", "original");
    f.click("or", clicked.clone()).await;

    let refreshed = Suggestion::builder("com.example/App")
        .format("html")
        .title("updated title")
        .description("updated description")
        .icon1("new icon")
        .intent_action("view")
        .intent_data("content://original")
        .shortcut_id("id-original")
        .build();
    f.repo
        .refresh_shortcut(&clicked.source, "id-original", Some(&refreshed))
        .await
        .unwrap();

    let shortcuts = f.repo.shortcuts_for_query("or").await.unwrap();
    assert_eq!(shortcuts.len(), 1);
    assert_eq!(shortcuts[0].title, "updated title");
    assert_eq!(shortcuts[0].description.as_deref(), Some("updated description"));
    assert_eq!(shortcuts[0].icon1.as_deref(), Some("new icon"));
    // Identity is untouched.
    assert_eq!(shortcuts[0].intent_key(), clicked.intent_key());
}

#[tokio::test]
async fn refresh_with_none_deletes_shortcut_and_click_log() {
    let f = Fixture::new();
    let clicked = suggestion("com.example/App", "stale");
    f.click("st", clicked.clone()).await;

    f.repo
        .refresh_shortcut(&clicked.source, "id-stale", None)
        .await
        .unwrap();

    assert!(!f.repo.has_history().await.unwrap());
    assert!(f.repo.shortcuts_for_query("st").await.unwrap().is_empty());

    let mut conn = diesel::SqliteConnection::establish(&f.db_path).expect("connect");
    let rows: i64 = {
        use diesel::dsl::count_star;
        us_infra::db::schema::click_log::table
            .select(count_star())
            .first(&mut conn)
            .expect("count")
    };
    assert_eq!(rows, 0, "click log rows cascade with the shortcut");
}

#[tokio::test]
async fn clear_history_empties_everything() {
    let f = Fixture::new();
    f.click("q", suggestion("com.example/App", "something")).await;
    assert!(f.repo.has_history().await.unwrap());

    f.repo.clear_history().await.unwrap();

    assert!(!f.repo.has_history().await.unwrap());
    assert!(f.repo.shortcuts_for_query("").await.unwrap().is_empty());
    assert!(f.repo.source_ranking().await.unwrap().is_empty());
}

#[tokio::test]
async fn schema_version_mismatch_drops_history() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir
        .path()
        .join("shortcuts.db")
        .to_string_lossy()
        .into_owned();

    {
        let pool = init_db_pool(&db_path).expect("db pool");
        let clock = ManualClock::new(NOW);
        let repo = DieselShortcutRepository::new(
            DieselSqliteExecutor::new(pool),
            clock,
            EngineConfig::default(),
        );
        repo.report_stats(&SessionStats::new(
            "q",
            Some(suggestion("com.example/App", "kept?")),
            HashSet::new(),
        ))
        .await
        .unwrap();
        assert!(repo.has_history().await.unwrap());
    }

    {
        use diesel::connection::SimpleConnection;
        let mut conn = diesel::SqliteConnection::establish(&db_path).expect("connect");
        conn.batch_execute("PRAGMA user_version = 9999").expect("pragma");
    }

    let pool = init_db_pool(&db_path).expect("db pool after mismatch");
    let clock = ManualClock::new(NOW);
    let repo = DieselShortcutRepository::new(
        DieselSqliteExecutor::new(pool),
        clock,
        EngineConfig::default(),
    );
    assert!(
        !repo.has_history().await.unwrap(),
        "a version mismatch recreates the tables empty"
    );
}

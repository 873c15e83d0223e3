use std::sync::Arc;

use anyhow::Result;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use tracing::debug;

use us_core::ports::{ClockPort, ShortcutRepositoryPort};
use us_core::text::next_string;
use us_core::{EngineConfig, SessionStats, SourceId, Suggestion};

use crate::db::executor::DbExecutor;
use crate::db::mappers::ShortcutRowMapper;
use crate::db::models::{NewClickRow, NewSourceEventRow, RankedComponentRow, ShortcutRow};
use crate::db::schema::{click_log, shortcuts, source_event_log, source_totals};

/// Recency-weighted shortcut lookup. The prefix restriction is expressed
/// as a half-open range so the click-log query index stays usable, and the
/// score is `hits * ((last_hit - cutoff) / (max_stat_age / 1000))` in
/// integer arithmetic.
const SHORTCUT_QUERY_SQL: &str = "\
SELECT shortcuts.* FROM click_log INNER JOIN shortcuts \
ON click_log.intent_key = shortcuts.intent_key \
WHERE click_log.query >= ? AND click_log.query < ? AND click_log.hit_time >= ? \
GROUP BY click_log.intent_key \
ORDER BY (COUNT(click_log.id) * ((MAX(click_log.hit_time) - ?) / ?)) DESC";

const EMPTY_QUERY_SHORTCUT_SQL: &str = "\
SELECT shortcuts.* FROM click_log INNER JOIN shortcuts \
ON click_log.intent_key = shortcuts.intent_key \
WHERE click_log.hit_time >= ? \
GROUP BY click_log.intent_key \
ORDER BY (COUNT(click_log.id) * ((MAX(click_log.hit_time) - ?) / ?)) DESC";

/// Click-through rate with priors, best first. Integer arithmetic keeps
/// the score comparable across sources without float drift.
const SOURCE_RANKING_SQL: &str = "\
SELECT component FROM source_totals \
ORDER BY (1000 * (total_clicks + ?)) / (total_impressions + ?) DESC";

const RECOMPUTE_TOTALS_SQL: &str = "\
INSERT INTO source_totals (component, total_clicks, total_impressions) \
SELECT component, SUM(click_count), SUM(impression_count) \
FROM source_event_log GROUP BY component";

/// Shortcut repository over SQLite: a log of every click plus per-source
/// aggregate stats kept up to date at session close.
pub struct DieselShortcutRepository<E> {
    executor: E,
    mapper: ShortcutRowMapper,
    clock: Arc<dyn ClockPort>,
    config: EngineConfig,
}

impl<E> DieselShortcutRepository<E> {
    pub fn new(executor: E, clock: Arc<dyn ClockPort>, config: EngineConfig) -> Self {
        Self {
            executor,
            mapper: ShortcutRowMapper,
            clock,
            config,
        }
    }
}

#[async_trait::async_trait]
impl<E> ShortcutRepositoryPort for DieselShortcutRepository<E>
where
    E: DbExecutor,
{
    async fn has_history(&self) -> Result<bool> {
        self.executor
            .run(|conn| {
                let first: Option<String> = shortcuts::table
                    .select(shortcuts::intent_key)
                    .first(conn)
                    .optional()?;
                Ok(first.is_some())
            })
            .await
    }

    async fn clear_history(&self) -> Result<()> {
        self.executor
            .run(|conn| {
                conn.transaction::<_, anyhow::Error, _>(|conn| {
                    diesel::delete(click_log::table).execute(conn)?;
                    diesel::delete(shortcuts::table).execute(conn)?;
                    diesel::delete(source_event_log::table).execute(conn)?;
                    diesel::delete(source_totals::table).execute(conn)?;
                    Ok(())
                })
            })
            .await
    }

    async fn report_stats(&self, stats: &SessionStats) -> Result<()> {
        let stats = stats.clone();
        let mapper = self.mapper;
        let now = self.clock.now_ms();
        let max_stat_age_ms = self.config.max_stat_age_ms;
        let max_source_event_age_ms = self.config.max_source_event_age_ms;

        debug!(
            query = %stats.query,
            clicked = stats.clicked.is_some(),
            impressions = stats.source_impressions.len(),
            "reporting session stats"
        );

        self.executor
            .run(move |conn| {
                conn.transaction::<_, anyhow::Error, _>(|conn| {
                    if let Some(clicked) = stats.clicked.as_ref().filter(|c| c.is_shortcuttable()) {
                        let row = mapper.to_row(clicked);
                        let intent_key = row.intent_key.clone();
                        // The intent key is the primary key, so a repeat
                        // click on the same target replaces the old row.
                        diesel::replace_into(shortcuts::table)
                            .values(&row)
                            .execute(conn)?;
                        diesel::insert_into(click_log::table)
                            .values(&NewClickRow {
                                intent_key,
                                query: stats.query.clone(),
                                hit_time: now,
                            })
                            .execute(conn)?;
                        // Clicks too old to ever score again are dead weight.
                        diesel::delete(
                            click_log::table.filter(click_log::hit_time.lt(now - max_stat_age_ms)),
                        )
                        .execute(conn)?;
                    }

                    for component in &stats.source_impressions {
                        let clicks = match &stats.clicked {
                            Some(clicked) if clicked.source == *component => 1,
                            _ => 0,
                        };
                        diesel::insert_into(source_event_log::table)
                            .values(&NewSourceEventRow {
                                component: component.to_string(),
                                time: now,
                                click_count: clicks,
                                impression_count: 1,
                            })
                            .execute(conn)?;
                    }

                    diesel::delete(
                        source_event_log::table
                            .filter(source_event_log::time.lt(now - max_source_event_age_ms)),
                    )
                    .execute(conn)?;

                    diesel::delete(source_totals::table).execute(conn)?;
                    diesel::sql_query(RECOMPUTE_TOTALS_SQL).execute(conn)?;

                    Ok(())
                })
            })
            .await
    }

    async fn shortcuts_for_query(&self, query: &str) -> Result<Vec<Suggestion>> {
        let now = self.clock.now_ms();
        let cutoff = now - self.config.max_stat_age_ms;
        let scale = self.config.max_stat_age_ms / 1000;
        let query = query.to_string();
        let mapper = self.mapper;

        self.executor
            .run(move |conn| {
                let rows: Vec<ShortcutRow> = if query.is_empty() {
                    diesel::sql_query(EMPTY_QUERY_SHORTCUT_SQL)
                        .bind::<BigInt, _>(cutoff)
                        .bind::<BigInt, _>(cutoff)
                        .bind::<BigInt, _>(scale)
                        .load(conn)?
                } else {
                    diesel::sql_query(SHORTCUT_QUERY_SQL)
                        .bind::<Text, _>(&query)
                        .bind::<Text, _>(next_string(&query))
                        .bind::<BigInt, _>(cutoff)
                        .bind::<BigInt, _>(cutoff)
                        .bind::<BigInt, _>(scale)
                        .load(conn)?
                };
                Ok(rows.into_iter().map(|row| mapper.to_suggestion(row)).collect())
            })
            .await
    }

    async fn source_ranking(&self) -> Result<Vec<SourceId>> {
        let prior_clicks = self.config.prior_clicks;
        let prior_impressions = self.config.prior_impressions;

        self.executor
            .run(move |conn| {
                let rows: Vec<RankedComponentRow> = diesel::sql_query(SOURCE_RANKING_SQL)
                    .bind::<BigInt, _>(prior_clicks)
                    .bind::<BigInt, _>(prior_impressions)
                    .load(conn)?;
                Ok(rows
                    .into_iter()
                    .map(|row| SourceId::from(row.component))
                    .collect())
            })
            .await
    }

    async fn refresh_shortcut(
        &self,
        source: &SourceId,
        shortcut_id: &str,
        refreshed: Option<&Suggestion>,
    ) -> Result<()> {
        let source = source.to_string();
        let shortcut_id = shortcut_id.to_string();
        let refreshed = refreshed.cloned();
        let mapper = self.mapper;

        self.executor
            .run(move |conn| match refreshed {
                None => conn.transaction::<_, anyhow::Error, _>(|conn| {
                    // The click log references the shortcut by intent key,
                    // so the delete has to cascade by hand.
                    let keys: Vec<String> = shortcuts::table
                        .filter(
                            shortcuts::shortcut_id
                                .eq(&shortcut_id)
                                .and(shortcuts::source.eq(&source)),
                        )
                        .select(shortcuts::intent_key)
                        .load(conn)?;
                    diesel::delete(click_log::table.filter(click_log::intent_key.eq_any(&keys)))
                        .execute(conn)?;
                    diesel::delete(
                        shortcuts::table.filter(
                            shortcuts::shortcut_id
                                .eq(&shortcut_id)
                                .and(shortcuts::source.eq(&source)),
                        ),
                    )
                    .execute(conn)?;
                    Ok(())
                }),
                Some(suggestion) => {
                    let row = mapper.to_row(&suggestion);
                    diesel::update(
                        shortcuts::table.filter(
                            shortcuts::shortcut_id
                                .eq(&shortcut_id)
                                .and(shortcuts::source.eq(&source)),
                        ),
                    )
                    .set((
                        shortcuts::format.eq(row.format),
                        shortcuts::title.eq(row.title),
                        shortcuts::description.eq(row.description),
                        shortcuts::icon1.eq(row.icon1),
                        shortcuts::icon2.eq(row.icon2),
                    ))
                    .execute(conn)?;
                    Ok(())
                }
            })
            .await
    }
}

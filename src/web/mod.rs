use std::sync::Arc;

use anyhow::Result;

use crate::ban::BanEntry;
use crate::cache::ResultCache;
use crate::config::{Config, Leaderboard, Web};
use crate::leaderboard::{Entry, Strategy};
use crate::postgres::PgSource;
use crate::source::LeaderboardSource;

pub mod access;
pub mod handlers;
pub mod routes;

pub async fn start(config: Arc<Config>) -> Result<()> {
    let source = PgSource::new(&config.database)?;
    let state = State::new(Arc::new(source), &config.web, &config.leaderboard);

    tracing::info!(
        "listening at {} (strategy: {:?}, cache ttl: {}s)",
        config.web.host,
        config.leaderboard.strategy,
        config.leaderboard.cache_ttl_secs,
    );
    warp::serve(routes::router(state)).run(config.web.host).await;
    Ok(())
}

pub struct State {
    pub source: Arc<dyn LeaderboardSource>,
    pub strategy: Strategy,
    pub allowed_origin: String,
    pub list: ResultCache<Entry>,
    pub bans: ResultCache<BanEntry>,
}

impl State {
    pub fn new(source: Arc<dyn LeaderboardSource>, web: &Web, leaderboard: &Leaderboard) -> Arc<Self> {
        Arc::new(Self {
            source,
            strategy: leaderboard.strategy,
            allowed_origin: web.allowed_origin.clone(),
            list: ResultCache::new(leaderboard.cache_ttl_secs),
            bans: ResultCache::new(leaderboard.cache_ttl_secs),
        })
    }
}

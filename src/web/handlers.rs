use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use chrono::{Local, Utc};
use serde::Serialize;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Reply;

use crate::leaderboard::fetch_bans;
use crate::source::SourceError;
use super::access::is_allowed;
use super::State;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_reply(status: StatusCode, error: String) -> Response {
    warp::reply::with_status(warp::reply::json(&ErrorBody { error }), status).into_response()
}

fn access_denied(remote: Option<SocketAddr>) -> Response {
    tracing::warn!("denied request from {:?}", remote);
    error_reply(StatusCode::FORBIDDEN, "Access denied".to_string())
}

/// Only the kind of failure reaches the client; the cause chain goes to the log.
fn fetch_failed(e: SourceError) -> Response {
    tracing::error!("failed to refresh leaderboard: {:?}", e);
    error_reply(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Failed to fetch data: {}", e),
    )
}

pub async fn get_list_handler(
    state: Arc<State>,
    remote: Option<SocketAddr>,
) -> std::result::Result<Response, Infallible> {
    if !is_allowed(remote, &state.allowed_origin) {
        return Ok(access_denied(remote));
    }

    let source = Arc::clone(&state.source);
    let strategy = state.strategy;
    let res = state
        .list
        .read_or_refresh(Utc::now(), move || async move {
            let entries = strategy.fetch(source.as_ref()).await?;
            tracing::info!("refreshed {:?} leaderboard: {} entries", strategy, entries.len());
            Ok::<_, SourceError>(entries)
        })
        .await;

    Ok(match res {
        Ok(entries) => warp::reply::json(&entries).into_response(),
        Err(e) => fetch_failed(e),
    })
}

pub async fn bans_handler(
    state: Arc<State>,
    remote: Option<SocketAddr>,
) -> std::result::Result<Response, Infallible> {
    if !is_allowed(remote, &state.allowed_origin) {
        return Ok(access_denied(remote));
    }

    let source = Arc::clone(&state.source);
    let res = state
        .bans
        .read_or_refresh(Utc::now(), move || async move {
            let bans = fetch_bans(source.as_ref(), Local::now().naive_local()).await?;
            tracing::info!("refreshed ban list: {} entries", bans.len());
            Ok::<_, SourceError>(bans)
        })
        .await;

    Ok(match res {
        Ok(bans) => warp::reply::json(&bans).into_response(),
        Err(e) => fetch_failed(e),
    })
}

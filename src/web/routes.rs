use std::net::SocketAddr;
use std::sync::Arc;
use warp::{filters::BoxedFilter, Filter, Reply};

use super::handlers;
use super::State;

pub fn router(state: Arc<State>) -> BoxedFilter<(impl Reply,)> {
    warp::path("api")
        .and(get_list(Arc::clone(&state)).or(bans(Arc::clone(&state))))
        .with(warp::trace::request())
        .boxed()
}

fn get_list(state: Arc<State>) -> BoxedFilter<(impl Reply,)> {
    let route = warp::path("getList")
        .and(warp::path::end())
        .and(warp::addr::remote())
        .and_then(move |remote: Option<SocketAddr>| handlers::get_list_handler(Arc::clone(&state), remote));

    warp::get().and(route).boxed()
}

fn bans(state: Arc<State>) -> BoxedFilter<(impl Reply,)> {
    let route = warp::path("bans")
        .and(warp::path::end())
        .and(warp::addr::remote())
        .and_then(move |remote: Option<SocketAddr>| handlers::bans_handler(Arc::clone(&state), remote));

    warp::get().and(route).boxed()
}

use super::handler::{self, RequestPolicy};
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

/// Request bodies above this size are rejected before decoding.
const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let policy = RequestPolicy {
        timeout: server.command_timeout,
        expose_internal_errors: server.expose_internal_errors,
    };

    let connect = post_json::<handler::FriendsPairRequest>(&["friendship", "connect"])
        .and(with(server.connect_friendship_service.clone()))
        .and(with_policy(policy))
        .and_then(handler::connect_friendship);

    let friends = post_json::<handler::FriendsRequest>(&["friendship", "friends"])
        .and(with(server.relationship_service.clone()))
        .and(with_policy(policy))
        .and_then(handler::list_friends);

    let mutuals = post_json::<handler::FriendsPairRequest>(&["friendship", "mutuals"])
        .and(with(server.relationship_service.clone()))
        .and(with_policy(policy))
        .and_then(handler::list_common_friends);

    let subscribe = post_json::<handler::RequestorTargetRequest>(&["subscription", "subscribe"])
        .and(with(server.subscribe_user_service.clone()))
        .and(with_policy(policy))
        .and_then(handler::subscribe_user);

    let block = post_json::<handler::RequestorTargetRequest>(&["subscription", "block"])
        .and(with(server.block_updates_service.clone()))
        .and(with_policy(policy))
        .and_then(handler::block_updates);

    let updates = post_json::<handler::UpdatesRequest>(&["subscription", "updates"])
        .and(with(server.relationship_service.clone()))
        .and(with_policy(policy))
        .and_then(handler::list_updates);

    connect
        .or(friends)
        .or(mutuals)
        .or(subscribe)
        .or(block)
        .or(updates)
}

fn post_json<T>(
    segments: &'static [&'static str; 2],
) -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::post()
        .and(warp::path(segments[0]))
        .and(warp::path(segments[1]))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_policy(
    policy: RequestPolicy,
) -> impl Filter<Extract = (RequestPolicy,), Error = Infallible> + Clone {
    warp::any().map(move || policy)
}

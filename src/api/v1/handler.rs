use super::error::*;
use crate::application_impl::with_deadline;
use crate::application_port::*;
use crate::domain_model::*;
use crate::logger::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Per-request limits shared by every route.
#[derive(Debug, Clone, Copy)]
pub struct RequestPolicy {
    pub timeout: Duration,
    pub expose_internal_errors: bool,
}

impl RequestPolicy {
    fn reject(&self, err: RelationError) -> warp::Rejection {
        rejection(err, self.expose_internal_errors)
    }
}

fn require_email(field: &str, value: &str) -> Result<(), warp::Rejection> {
    if value.is_empty() {
        return Err(warp::reject::custom(ApiFailure::invalid(format!(
            "{field} is required"
        ))));
    }
    if !is_valid_email(value) {
        return Err(warp::reject::custom(ApiFailure::invalid(format!(
            "{field} is not a valid email: {value}"
        ))));
    }
    Ok(())
}

fn require_two_emails(field: &str, values: &[String]) -> Result<(), warp::Rejection> {
    if values.len() != 2 {
        return Err(warp::reject::custom(ApiFailure::invalid(format!(
            "{field} needs exactly two emails"
        ))));
    }
    values.iter().try_for_each(|v| require_email(field, v))
}

fn normalize_all(values: &[String]) -> Vec<String> {
    values.iter().map(|v| normalize_email(v)).collect()
}

#[derive(Debug, Serialize)]
pub struct Empty {}

#[derive(Debug, Deserialize)]
pub struct FriendsPairRequest {
    #[serde(default)]
    pub friends: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub id: FriendshipId,
    pub status: FriendshipStatus,
}

pub async fn connect_friendship(
    body: FriendsPairRequest,
    service: Arc<dyn ConnectFriendshipService>,
    policy: RequestPolicy,
) -> Result<impl warp::Reply, warp::Rejection> {
    require_two_emails("friends", &body.friends)?;
    let friends = normalize_all(&body.friends);

    let friendship = with_deadline(
        policy.timeout,
        service.connect_friendship(&friends[0], &friends[1]),
    )
    .await
    .map_err(|e| policy.reject(e))?;

    let response = ConnectResponse {
        id: friendship.id,
        status: friendship.status,
    };
    Ok(warp::reply::json(&ApiResponse::ok(response)))
}

#[derive(Debug, Deserialize)]
pub struct FriendsRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct FriendsResponse {
    pub friends: Vec<String>,
    pub count: usize,
}

impl From<Vec<String>> for FriendsResponse {
    fn from(friends: Vec<String>) -> Self {
        FriendsResponse {
            count: friends.len(),
            friends,
        }
    }
}

pub async fn list_friends(
    body: FriendsRequest,
    service: Arc<dyn RelationshipService>,
    policy: RequestPolicy,
) -> Result<impl warp::Reply, warp::Rejection> {
    require_email("email", &body.email)?;
    let email = normalize_email(&body.email);

    let friends = with_deadline(policy.timeout, service.list_friends(&email))
        .await
        .map_err(|e| policy.reject(e))?;

    Ok(warp::reply::json(&ApiResponse::ok(FriendsResponse::from(
        friends,
    ))))
}

pub async fn list_common_friends(
    body: FriendsPairRequest,
    service: Arc<dyn RelationshipService>,
    policy: RequestPolicy,
) -> Result<impl warp::Reply, warp::Rejection> {
    require_two_emails("friends", &body.friends)?;
    let emails = normalize_all(&body.friends);

    let friends = with_deadline(policy.timeout, service.list_common_friends(&emails))
        .await
        .map_err(|e| policy.reject(e))?;

    Ok(warp::reply::json(&ApiResponse::ok(FriendsResponse::from(
        friends,
    ))))
}

#[derive(Debug, Deserialize)]
pub struct RequestorTargetRequest {
    #[serde(default)]
    pub requestor: String,
    #[serde(default)]
    pub target: String,
}

impl RequestorTargetRequest {
    /// Validated and normalized `(requestor, target)`.
    fn into_pair(self) -> Result<(String, String), warp::Rejection> {
        require_email("requestor", &self.requestor)?;
        require_email("target", &self.target)?;
        Ok((normalize_email(&self.requestor), normalize_email(&self.target)))
    }
}

pub async fn subscribe_user(
    body: RequestorTargetRequest,
    service: Arc<dyn SubscribeUserService>,
    policy: RequestPolicy,
) -> Result<impl warp::Reply, warp::Rejection> {
    let (requestor, target) = body.into_pair()?;

    let payload = [SubscribeUserPayload::new(requestor, target)];
    with_deadline(policy.timeout, service.subscribe_user(&payload))
        .await
        .map_err(|e| policy.reject(e))?;

    debug!(requestor = %payload[0].requestor, target = %payload[0].target, "subscribed");
    Ok(warp::reply::json(&ApiResponse::ok(Empty {})))
}

pub async fn block_updates(
    body: RequestorTargetRequest,
    service: Arc<dyn BlockUpdatesService>,
    policy: RequestPolicy,
) -> Result<impl warp::Reply, warp::Rejection> {
    let (requestor, target) = body.into_pair()?;

    let payload = BlockUpdatesPayload::new(requestor, target);
    with_deadline(policy.timeout, service.block_updates(&payload))
        .await
        .map_err(|e| policy.reject(e))?;

    Ok(warp::reply::json(&ApiResponse::ok(Empty {})))
}

#[derive(Debug, Deserialize)]
pub struct UpdatesRequest {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct UpdatesResponse {
    pub recipients: Vec<String>,
}

pub async fn list_updates(
    body: UpdatesRequest,
    service: Arc<dyn RelationshipService>,
    policy: RequestPolicy,
) -> Result<impl warp::Reply, warp::Rejection> {
    require_email("sender", &body.sender)?;
    let sender = normalize_email(&body.sender);

    let recipients = with_deadline(policy.timeout, service.list_updates(&sender, &body.text))
        .await
        .map_err(|e| policy.reject(e))?;

    Ok(warp::reply::json(&ApiResponse::ok(UpdatesResponse {
        recipients,
    })))
}

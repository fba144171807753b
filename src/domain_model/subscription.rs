use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct SubscriptionId(pub uuid::Uuid);

impl SubscriptionId {
    pub fn new_v4() -> Self {
        SubscriptionId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `Invalid` stands for "no row" and is never written to storage.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Invalid,
    Subscribed,
    Unsubscribed,
}

impl SubscriptionStatus {
    pub fn of(subscription: Option<&Subscription>) -> Self {
        subscription.map_or(SubscriptionStatus::Invalid, |s| s.status)
    }

    pub fn allow_subscribe(self) -> bool {
        match self {
            SubscriptionStatus::Invalid | SubscriptionStatus::Unsubscribed => true,
            SubscriptionStatus::Subscribed => false,
        }
    }

    pub fn allow_unsubscribe(self) -> bool {
        match self {
            SubscriptionStatus::Invalid | SubscriptionStatus::Subscribed => true,
            SubscriptionStatus::Unsubscribed => false,
        }
    }

    pub fn is_none_existed(self) -> bool {
        match self {
            SubscriptionStatus::Invalid => true,
            SubscriptionStatus::Subscribed | SubscriptionStatus::Unsubscribed => false,
        }
    }

    pub fn code(self) -> i8 {
        match self {
            SubscriptionStatus::Invalid => 0,
            SubscriptionStatus::Subscribed => 1,
            SubscriptionStatus::Unsubscribed => 2,
        }
    }
}

impl TryFrom<i8> for SubscriptionStatus {
    type Error = String;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(SubscriptionStatus::Subscribed),
            2 => Ok(SubscriptionStatus::Unsubscribed),
            other => Err(format!("invalid stored subscription status: {other}")),
        }
    }
}

/// Directed pair: `subscriber_id` follows the updates of `user_id`.
///
/// Used both as the in-memory correlation key of a batch and as the
/// propagation payload item.
#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
pub struct SubscriptionKey {
    pub user_id: UserId,
    pub subscriber_id: UserId,
}

impl SubscriptionKey {
    pub fn new(user_id: UserId, subscriber_id: UserId) -> Self {
        Self {
            user_id,
            subscriber_id,
        }
    }

    pub fn inverse(self) -> Self {
        Self::new(self.subscriber_id, self.user_id)
    }

    pub fn is_self_reference(&self) -> bool {
        self.user_id == self.subscriber_id
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.user_id, self.subscriber_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub subscriber_id: UserId,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn key(&self) -> SubscriptionKey {
        SubscriptionKey::new(self.user_id, self.subscriber_id)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NewSubscription {
    pub user_id: UserId,
    pub subscriber_id: UserId,
    pub status: SubscriptionStatus,
}

impl NewSubscription {
    pub fn with_status(key: SubscriptionKey, status: SubscriptionStatus) -> Self {
        Self {
            user_id: key.user_id,
            subscriber_id: key.subscriber_id,
            status,
        }
    }

    pub fn key(&self) -> SubscriptionKey {
        SubscriptionKey::new(self.user_id, self.subscriber_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SubscriptionStatus; 3] = [
        SubscriptionStatus::Invalid,
        SubscriptionStatus::Subscribed,
        SubscriptionStatus::Unsubscribed,
    ];

    #[test]
    fn subscribe_allowed_unless_already_subscribed() {
        for status in ALL {
            assert_eq!(
                status.allow_subscribe(),
                status != SubscriptionStatus::Subscribed,
                "{status:?}"
            );
        }
    }

    #[test]
    fn none_existed_only_for_missing_row() {
        for status in ALL {
            assert_eq!(
                status.is_none_existed(),
                status == SubscriptionStatus::Invalid,
                "{status:?}"
            );
        }
    }

    #[test]
    fn key_is_order_sensitive() {
        let (a, b) = (UserId::new_v4(), UserId::new_v4());
        let key = SubscriptionKey::new(a, b);

        assert_ne!(key, key.inverse());
        assert_eq!(key, key.inverse().inverse());
        assert_eq!(key.to_string(), format!("{a}{b}"));
    }

    #[test]
    fn key_round_trips_through_wire_form() {
        let key = SubscriptionKey::new(UserId::new_v4(), UserId::new_v4());
        let json = serde_json::to_value(key).unwrap();

        assert!(json.get("user_id").is_some());
        assert!(json.get("subscriber_id").is_some());
        assert_eq!(serde_json::from_value::<SubscriptionKey>(json).unwrap(), key);
    }
}

use crate::domain_model::{UserId, UserPair};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct FriendshipId(pub uuid::Uuid);

impl FriendshipId {
    pub fn new_v4() -> Self {
        FriendshipId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for FriendshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `Invalid` stands for "no row" and is never written to storage.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipStatus {
    Invalid,
    Friended,
    Pending,
    Unfriended,
    Blocked,
}

impl FriendshipStatus {
    pub fn of(friendship: Option<&Friendship>) -> Self {
        friendship.map_or(FriendshipStatus::Invalid, |f| f.status)
    }

    pub fn can_connect(self) -> bool {
        match self {
            FriendshipStatus::Unfriended => true,
            FriendshipStatus::Invalid
            | FriendshipStatus::Friended
            | FriendshipStatus::Pending
            | FriendshipStatus::Blocked => false,
        }
    }

    /// A missing row is handled by the caller as "create blocked",
    /// so only an existing `Unfriended` row may transition to `Blocked`.
    pub fn can_block_user(self) -> bool {
        match self {
            FriendshipStatus::Unfriended => true,
            FriendshipStatus::Invalid
            | FriendshipStatus::Friended
            | FriendshipStatus::Pending
            | FriendshipStatus::Blocked => false,
        }
    }

    pub fn can_not_subscribe(self) -> bool {
        match self {
            FriendshipStatus::Blocked => true,
            FriendshipStatus::Invalid
            | FriendshipStatus::Friended
            | FriendshipStatus::Pending
            | FriendshipStatus::Unfriended => false,
        }
    }

    pub fn code(self) -> i8 {
        match self {
            FriendshipStatus::Invalid => 0,
            FriendshipStatus::Friended => 1,
            FriendshipStatus::Pending => 2,
            FriendshipStatus::Unfriended => 3,
            FriendshipStatus::Blocked => 4,
        }
    }
}

impl TryFrom<i8> for FriendshipStatus {
    type Error = String;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(FriendshipStatus::Friended),
            2 => Ok(FriendshipStatus::Pending),
            3 => Ok(FriendshipStatus::Unfriended),
            4 => Ok(FriendshipStatus::Blocked),
            other => Err(format!("invalid stored friendship status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Friendship {
    pub id: FriendshipId,
    pub user_a: UserId,
    pub user_b: UserId,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Friendship {
    pub fn pair(&self) -> UserPair {
        UserPair::new(self.user_a, self.user_b)
    }

    /// The other side of the friendship, if `user` takes part in it.
    pub fn counterpart(&self, user: UserId) -> Option<UserId> {
        if self.user_a == user {
            Some(self.user_b)
        } else if self.user_b == user {
            Some(self.user_a)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NewFriendship {
    pub user_a: UserId,
    pub user_b: UserId,
    pub status: FriendshipStatus,
}

impl NewFriendship {
    pub fn friended(requestor: UserId, target: UserId) -> Self {
        Self {
            user_a: requestor,
            user_b: target,
            status: FriendshipStatus::Friended,
        }
    }

    pub fn blocked(requestor: UserId, target: UserId) -> Self {
        Self {
            user_a: requestor,
            user_b: target,
            status: FriendshipStatus::Blocked,
        }
    }
}

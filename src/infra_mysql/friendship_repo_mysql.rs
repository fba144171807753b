use super::util::{downcast, is_dup_key, placeholders, store_err};
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlFriendshipRepo {
    pool: MySqlPool,
}

impl MySqlFriendshipRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlFriendshipRepo { pool }
    }

    fn row_to_friendship(row: &MySqlRow) -> Result<Friendship, RepoError> {
        let map = |e: sqlx::Error| RepoError::Store(e.to_string());

        let status: i8 = row.try_get("status").map_err(map)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(map)?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(map)?;

        Ok(Friendship {
            id: row.try_get("friendship_id").map_err(map)?,
            user_a: row.try_get("user_a").map_err(map)?,
            user_b: row.try_get("user_b").map_err(map)?,
            status: FriendshipStatus::try_from(status).map_err(RepoError::Store)?,
            created_at,
            updated_at,
        })
    }
}

#[async_trait::async_trait]
impl FriendshipRepo for MySqlFriendshipRepo {
    async fn create_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        friendship: &NewFriendship,
    ) -> Result<FriendshipId, RepoError> {
        if friendship.status == FriendshipStatus::Invalid {
            return Err(RepoError::Store("refusing to persist invalid status".to_owned()));
        }
        let tx = downcast(tx)?;
        let id = FriendshipId::new_v4();

        sqlx::query(
            r#"
INSERT INTO friendship (friendship_id, user_a, user_b, status)
VALUES (?, ?, ?, ?)
"#,
        )
        .bind(id)
        .bind(friendship.user_a)
        .bind(friendship.user_b)
        .bind(friendship.status.code())
        .execute(tx.conn())
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                RepoError::Store(format!(
                    "duplicate friendship for ({}, {})",
                    friendship.user_a, friendship.user_b
                ))
            } else {
                store_err("insert friendship")(e)
            }
        })?;

        Ok(id)
    }

    async fn update_status_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        id: FriendshipId,
        status: FriendshipStatus,
    ) -> Result<(), RepoError> {
        if status == FriendshipStatus::Invalid {
            return Err(RepoError::Store("refusing to persist invalid status".to_owned()));
        }
        let tx = downcast(tx)?;

        let result = sqlx::query(
            r#"
UPDATE friendship
SET status = ?, updated_at = CURRENT_TIMESTAMP(6)
WHERE friendship_id = ?
"#,
        )
        .bind(status.code())
        .bind(id)
        .execute(tx.conn())
        .await
        .map_err(store_err("update friendship status"))?;

        // CLIENT_FOUND_ROWS is set by sqlx, so an unchanged status still counts
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn get_by_user_ids_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        a: UserId,
        b: UserId,
    ) -> Result<Option<Friendship>, RepoError> {
        let tx = downcast(tx)?;

        let row = sqlx::query(
            r#"
SELECT friendship_id, user_a, user_b, status, created_at, updated_at
FROM friendship
WHERE (user_a = ? AND user_b = ?) OR (user_a = ? AND user_b = ?)
FOR UPDATE
"#,
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_optional(tx.conn())
        .await
        .map_err(store_err("query friendship"))?;

        row.as_ref().map(Self::row_to_friendship).transpose()
    }

    async fn list_by_user_and_status(
        &self,
        user_id: UserId,
        statuses: &[FriendshipStatus],
    ) -> Result<Vec<Friendship>, RepoError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
SELECT friendship_id, user_a, user_b, status, created_at, updated_at
FROM friendship
WHERE (user_a = ? OR user_b = ?) AND status IN ({})
ORDER BY created_at ASC, friendship_id ASC
"#,
            placeholders(statuses.len())
        );
        let mut query = sqlx::query(&sql).bind(user_id).bind(user_id);
        for status in statuses {
            query = query.bind(status.code());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(store_err("list friendships"))?;
        rows.iter().map(Self::row_to_friendship).collect()
    }
}

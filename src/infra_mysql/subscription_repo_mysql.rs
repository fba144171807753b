use super::util::{downcast, is_dup_key, store_err};
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlSubscriptionRepo {
    pool: MySqlPool,
}

impl MySqlSubscriptionRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlSubscriptionRepo { pool }
    }

    fn row_to_subscription(row: &MySqlRow) -> Result<Subscription, RepoError> {
        let map = |e: sqlx::Error| RepoError::Store(e.to_string());

        let status: i8 = row.try_get("status").map_err(map)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(map)?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(map)?;

        Ok(Subscription {
            id: row.try_get("subscription_id").map_err(map)?,
            user_id: row.try_get("user_id").map_err(map)?,
            subscriber_id: row.try_get("subscriber_id").map_err(map)?,
            status: SubscriptionStatus::try_from(status).map_err(RepoError::Store)?,
            created_at,
            updated_at,
        })
    }

    fn reject_invalid(status: SubscriptionStatus) -> Result<(), RepoError> {
        if status == SubscriptionStatus::Invalid {
            return Err(RepoError::Store("refusing to persist invalid status".to_owned()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SubscriptionRepo for MySqlSubscriptionRepo {
    async fn create_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        subscription: &NewSubscription,
    ) -> Result<SubscriptionId, RepoError> {
        Self::reject_invalid(subscription.status)?;
        let tx = downcast(tx)?;
        let id = SubscriptionId::new_v4();

        sqlx::query(
            r#"
INSERT INTO subscription (subscription_id, user_id, subscriber_id, status)
VALUES (?, ?, ?, ?)
"#,
        )
        .bind(id)
        .bind(subscription.user_id)
        .bind(subscription.subscriber_id)
        .bind(subscription.status.code())
        .execute(tx.conn())
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                RepoError::Store(format!("duplicate subscription {}", subscription.key()))
            } else {
                store_err("insert subscription")(e)
            }
        })?;

        Ok(id)
    }

    async fn update_status_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        id: SubscriptionId,
        status: SubscriptionStatus,
    ) -> Result<(), RepoError> {
        Self::reject_invalid(status)?;
        let tx = downcast(tx)?;

        let result = sqlx::query(
            r#"
UPDATE subscription
SET status = ?, updated_at = CURRENT_TIMESTAMP(6)
WHERE subscription_id = ?
"#,
        )
        .bind(status.code())
        .bind(id)
        .execute(tx.conn())
        .await
        .map_err(store_err("update subscription status"))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn upsert_by_pair_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        subscription: &NewSubscription,
    ) -> Result<SubscriptionId, RepoError> {
        Self::reject_invalid(subscription.status)?;
        let tx = downcast(tx)?;

        sqlx::query(
            r#"
INSERT INTO subscription (subscription_id, user_id, subscriber_id, status)
VALUES (?, ?, ?, ?)
ON DUPLICATE KEY UPDATE status = VALUES(status), updated_at = CURRENT_TIMESTAMP(6)
"#,
        )
        .bind(SubscriptionId::new_v4())
        .bind(subscription.user_id)
        .bind(subscription.subscriber_id)
        .bind(subscription.status.code())
        .execute(tx.conn())
        .await
        .map_err(store_err("upsert subscription"))?;

        let id: SubscriptionId = sqlx::query_scalar(
            r#"
SELECT subscription_id
FROM subscription
WHERE user_id = ? AND subscriber_id = ?
"#,
        )
        .bind(subscription.user_id)
        .bind(subscription.subscriber_id)
        .fetch_one(tx.conn())
        .await
        .map_err(store_err("query upserted subscription"))?;

        Ok(id)
    }

    async fn get_by_pairs_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        keys: &[SubscriptionKey],
    ) -> Result<Vec<Subscription>, RepoError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let tx = downcast(tx)?;

        let predicate = vec!["(user_id = ? AND subscriber_id = ?)"; keys.len()].join(" OR ");
        let sql = format!(
            r#"
SELECT subscription_id, user_id, subscriber_id, status, created_at, updated_at
FROM subscription
WHERE {predicate}
FOR UPDATE
"#
        );
        let mut query = sqlx::query(&sql);
        for key in keys {
            query = query.bind(key.user_id).bind(key.subscriber_id);
        }

        let rows = query
            .fetch_all(tx.conn())
            .await
            .map_err(store_err("query subscriptions"))?;
        rows.iter().map(Self::row_to_subscription).collect()
    }

    async fn list_subscriber_emails_by_status(
        &self,
        user_id: UserId,
        status: SubscriptionStatus,
    ) -> Result<Vec<String>, RepoError> {
        sqlx::query_scalar(
            r#"
SELECT u.email
FROM subscription s
JOIN user u ON u.user_id = s.subscriber_id
WHERE s.user_id = ? AND s.status = ?
ORDER BY s.created_at ASC, s.subscription_id ASC
"#,
        )
        .bind(user_id)
        .bind(status.code())
        .fetch_all(&self.pool)
        .await
        .map_err(store_err("list subscriber emails"))
    }
}

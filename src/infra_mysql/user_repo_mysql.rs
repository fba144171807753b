use super::util::{placeholders, store_err};
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::{MySqlPool, Row};
use std::collections::HashMap;

pub struct MySqlUserRepo {
    pool: MySqlPool,
}
impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn get_user_ids_by_emails(
        &self,
        emails: &[String],
    ) -> Result<HashMap<String, UserId>, RepoError> {
        if emails.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            r#"
SELECT user_id, email
FROM user
WHERE email IN ({})
"#,
            placeholders(emails.len())
        );
        let mut query = sqlx::query(&sql);
        for email in emails {
            query = query.bind(email);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(store_err("query user ids"))?;

        let mut stored = Vec::with_capacity(rows.len());
        for row in rows {
            let email: String = row
                .try_get("email")
                .map_err(|e| RepoError::Store(e.to_string()))?;
            let user_id: UserId = row
                .try_get("user_id")
                .map_err(|e| RepoError::Store(e.to_string()))?;
            stored.push((email, user_id));
        }

        match_requested(emails, stored)
    }

    async fn get_emails_by_user_ids(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, String>, RepoError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            r#"
SELECT user_id, email
FROM user
WHERE user_id IN ({})
"#,
            placeholders(user_ids.len())
        );
        let mut query = sqlx::query(&sql);
        for user_id in user_ids {
            query = query.bind(*user_id);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(store_err("query emails"))?;

        rows.into_iter()
            .map(|row| {
                let user_id: UserId = row
                    .try_get("user_id")
                    .map_err(|e| RepoError::Store(e.to_string()))?;
                let email: String = row
                    .try_get("email")
                    .map_err(|e| RepoError::Store(e.to_string()))?;
                Ok((user_id, email))
            })
            .collect()
    }
}

/// Keys the rows by the addresses as requested. `email IN (...)` compares
/// under the column's case-insensitive collation, so the stored spelling may differ.
fn match_requested(
    emails: &[String],
    stored: Vec<(String, UserId)>,
) -> Result<HashMap<String, UserId>, RepoError> {
    let by_folded: HashMap<String, UserId> = stored
        .into_iter()
        .map(|(email, user_id)| (email.to_lowercase(), user_id))
        .collect();

    let mut found = HashMap::with_capacity(emails.len());
    let mut missing = Vec::new();
    for email in emails {
        match by_folded.get(&email.to_lowercase()) {
            Some(&user_id) => {
                found.insert(email.clone(), user_id);
            }
            None => missing.push(email.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(RepoError::UnresolvedEmails(missing));
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(emails: &[&str]) -> Vec<(String, UserId)> {
        emails
            .iter()
            .map(|e| (e.to_string(), UserId::new_v4()))
            .collect()
    }

    #[test]
    fn stored_spelling_differs_from_request() {
        let stored = rows(&["alice@example.com"]);
        let alice = stored[0].1;

        let found = match_requested(&["Alice@Example.com".to_owned()], stored).unwrap();

        assert_eq!(found.get("Alice@Example.com"), Some(&alice));
    }

    #[test]
    fn unmatched_addresses_are_reported() {
        let err = match_requested(
            &["alice@example.com".to_owned(), "ghost@example.com".to_owned()],
            rows(&["alice@example.com"]),
        )
        .unwrap_err();

        assert!(
            matches!(err, RepoError::UnresolvedEmails(missing) if missing == ["ghost@example.com"])
        );
    }
}

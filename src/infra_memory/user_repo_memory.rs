use super::store::{FailPoint, MemoryStore};
use crate::domain_model::*;
use crate::domain_port::*;
use std::collections::HashMap;
use std::sync::Arc;

pub struct MemoryUserRepo {
    store: Arc<MemoryStore>,
}

impl MemoryUserRepo {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        MemoryUserRepo { store }
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn get_user_ids_by_emails(
        &self,
        emails: &[String],
    ) -> Result<HashMap<String, UserId>, RepoError> {
        self.store.check(FailPoint::UserLookup)?;
        let state = self.store.state.lock().await;

        let mut found = HashMap::with_capacity(emails.len());
        let mut missing = Vec::new();
        for email in emails {
            match state.user_ids.get(email) {
                Some(id) => {
                    found.insert(email.clone(), *id);
                }
                None => missing.push(email.clone()),
            }
        }

        if !missing.is_empty() {
            return Err(RepoError::UnresolvedEmails(missing));
        }
        Ok(found)
    }

    async fn get_emails_by_user_ids(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, String>, RepoError> {
        self.store.check(FailPoint::UserLookup)?;
        let state = self.store.state.lock().await;

        Ok(user_ids
            .iter()
            .filter_map(|id| state.emails.get(id).map(|email| (*id, email.clone())))
            .collect())
    }
}

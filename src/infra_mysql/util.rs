use super::repo_tx_mysql::MySqlTx;
use crate::domain_port::*;
use sqlx::mysql::MySqlDatabaseError;

pub fn downcast<'a, 't>(tx: &'a mut dyn StorageTx<'t>) -> Result<&'a mut MySqlTx<'t>, RepoError> {
    if tx.backend() != TxBackend::MySql {
        return Err(RepoError::Store(format!(
            "foreign transaction handle: {:?}",
            tx.backend()
        )));
    }
    // SAFETY: only `MySqlTx` reports `TxBackend::MySql`.
    unsafe {
        let p = tx as *mut dyn StorageTx<'t>;
        let p = p as *mut MySqlTx<'t>;
        Ok(&mut *p)
    }
}

pub fn is_dup_key(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db) = err {
        if let Some(mysql_err) = db.try_downcast_ref::<MySqlDatabaseError>() {
            return mysql_err.number() == 1062; // ER_DUP_ENTRY
        }
    }

    false
}

/// Serialization failures and deadlocks: the losing transaction may be retried.
pub fn is_serialization_failure(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db) = err {
        if let Some(mysql_err) = db.try_downcast_ref::<MySqlDatabaseError>() {
            // ER_LOCK_DEADLOCK, ER_LOCK_WAIT_TIMEOUT
            return matches!(mysql_err.number(), 1213 | 1205);
        }
    }

    false
}

pub fn store_err(op: &str) -> impl FnOnce(sqlx::Error) -> RepoError + '_ {
    move |e| {
        if is_serialization_failure(&e) {
            tracing::warn!("{op}: serialization failure: {e}");
        }
        RepoError::Store(format!("{op}: {e}"))
    }
}

pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

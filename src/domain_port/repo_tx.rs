/// Identifies which adapter produced a transaction handle, so a repository
/// never reinterprets a handle that belongs to another backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxBackend {
    MySql,
    Memory,
}

#[derive(Debug, thiserror::Error)]
pub enum TxError {
    #[error("begin transaction: {0:#}")]
    Begin(anyhow::Error),
    #[error("commit transaction: {0:#}")]
    Commit(anyhow::Error),
}

#[async_trait::async_trait]
pub trait TxManager: Send + Sync {
    /// Opens a serializable transaction. Dropping the handle without
    /// committing rolls it back.
    async fn begin<'t>(&'t self) -> anyhow::Result<Box<dyn StorageTx<'t> + 't>>;
}

#[async_trait::async_trait]
pub trait StorageTx<'t>: Send {
    fn backend(&self) -> TxBackend;
    async fn commit(self: Box<Self>) -> anyhow::Result<()>;
    async fn rollback(self: Box<Self>) -> anyhow::Result<()>;
}

/// Finishes a unit of work: commit when it succeeded, roll back otherwise.
pub async fn settle<'t, T, E>(
    tx: Box<dyn StorageTx<'t> + 't>,
    result: Result<T, E>,
) -> Result<T, E>
where
    T: Send,
    E: From<TxError> + std::fmt::Display + Send,
{
    match result {
        Ok(value) => {
            tx.commit().await.map_err(|e| E::from(TxError::Commit(e)))?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %e, "rollback transaction: {rollback_err:#}");
            }
            Err(e)
        }
    }
}

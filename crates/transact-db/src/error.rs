use thiserror::Error;
use transact_core::context::ContextError;

/// Database layer errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),

    #[error("Pool error: {0}")]
    PoolError(#[from] diesel_async::pooled_connection::bb8::RunError),

    #[error(transparent)]
    ContextError(#[from] ContextError),
}

pub type DbResult<T> = std::result::Result<T, DbError>;

use voxrelay_common::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
    /// A stored row no longer parses into the domain type.
    #[error("corrupt row in {table}: {message}")]
    CorruptRow { table: &'static str, message: String },
}

impl Error {
    #[must_use]
    pub fn corrupt_row(table: &'static str, message: impl Into<String>) -> Self {
        Self::CorruptRow {
            table,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Sqlx(sqlx::Error::PoolTimedOut) => ErrorKind::Timeout,
            Self::Sqlx(_) | Self::Migration(_) => ErrorKind::Unavailable,
            Self::CorruptRow { .. } => ErrorKind::InvalidInput,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

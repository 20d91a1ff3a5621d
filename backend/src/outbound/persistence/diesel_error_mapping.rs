//! Shared Diesel error mapping for the college repositories.
//!
//! Every repository port error exposes connection, query and duplicate
//! variants; [`RepositoryError`] lets the pool and Diesel mappings target
//! them generically.

use tracing::debug;

use crate::domain::ports::{
    CatalogueRepositoryError, GradeRepositoryError, LedgerRepositoryError,
    PrincipalRepositoryError, RegistrationRepositoryError,
};

use super::pool::PoolError;

/// Constructors shared by repository port errors.
pub(crate) trait RepositoryError: Sized {
    fn connection(message: String) -> Self;
    fn query(message: String) -> Self;
    fn duplicate(message: String) -> Self;

    fn from_pool(error: PoolError) -> Self {
        map_pool_error(error)
    }

    fn from_diesel(error: diesel::result::Error) -> Self {
        map_diesel_error(error)
    }
}

macro_rules! impl_repository_error {
    ($($error:ty),* $(,)?) => {
        $(
            impl RepositoryError for $error {
                fn connection(message: String) -> Self {
                    <$error>::connection(message)
                }

                fn query(message: String) -> Self {
                    <$error>::query(message)
                }

                fn duplicate(message: String) -> Self {
                    <$error>::duplicate(message)
                }
            }
        )*
    };
}

impl_repository_error!(
    PrincipalRepositoryError,
    CatalogueRepositoryError,
    RegistrationRepositoryError,
    GradeRepositoryError,
    LedgerRepositoryError,
);

/// Map pool errors into the repository's connection variant.
pub(crate) fn map_pool_error<E: RepositoryError>(error: PoolError) -> E {
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    E::connection(message)
}

/// Map Diesel errors into repository errors.
///
/// Unique violations become duplicates named after the violated constraint.
pub(crate) fn map_diesel_error<E: RepositoryError>(error: diesel::result::Error) -> E {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => E::query("record not found".to_owned()),
        DieselError::QueryBuilderError(_) => E::query("database query error".to_owned()),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => E::duplicate(
            info.constraint_name()
                .unwrap_or("unique constraint")
                .to_owned(),
        ),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            E::connection("database connection error".to_owned())
        }
        _ => E::query("database error".to_owned()),
    }
}

/// Failure inside a transaction: either Diesel failed or the unit of work
/// refused to proceed. Both roll the transaction back.
#[derive(Debug)]
pub(crate) enum TxError<E> {
    Diesel(diesel::result::Error),
    Refused(E),
}

impl<E> From<diesel::result::Error> for TxError<E> {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

impl<E: RepositoryError> TxError<E> {
    pub(crate) fn into_repository_error(self) -> E {
        match self {
            Self::Diesel(error) => map_diesel_error(error),
            Self::Refused(error) => error,
        }
    }

    /// Refuse with a row conversion failure.
    pub(crate) fn corrupt(message: String) -> Self {
        Self::Refused(E::query(message))
    }
}

use crate::api::ApiError;
use crate::store::StorageError;
use crate::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No token stored, or the server rejected it
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            CoreError::NotAuthenticated | CoreError::Api(ApiError::Unauthorized)
        )
    }
}

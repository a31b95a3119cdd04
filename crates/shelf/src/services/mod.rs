pub mod catalog;
pub mod types;

pub use catalog::{CatalogService, ReconcileReport};
pub use types::{
    validate_format, validate_name, validate_owner, CatalogDescriptor, CatalogFormat,
    CatalogRecord, CatalogType, CATALOG_NAME_MAX_LENGTH,
};

use crate::db::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Duplicate catalog name: {0}")]
    Duplicate(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(name) => ServiceError::Duplicate(name),
            StoreError::Backend(err) => ServiceError::Internal(err),
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::validate_name;
use crate::error::AppError;

/// Request body for creating a category.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCategoryRequest {
    /// Unique category name (1-50 characters).
    #[schema(example = "dynamic programming")]
    pub name: String,
}

pub fn validate_create_category_request(payload: &CreateCategoryRequest) -> Result<(), AppError> {
    validate_name(&payload.name)
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryResponse {
    #[schema(example = 3)]
    pub id: i32,
    #[schema(example = "dynamic programming")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::category::Model> for CategoryResponse {
    fn from(category: crate::entity::category::Model) -> Self {
        Self {
            id: category.id,
            name: category.name,
            created_at: category.created_at,
        }
    }
}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Explanation text shown to users who solved the problem.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "commentary")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub comment: String,

    #[sea_orm(has_one)]
    pub problem: HasOne<super::problem::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "problem")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,
    /// Difficulty from 1 (easiest) to 5, enforced by a CHECK constraint.
    pub level: i32,
    pub description: String,

    /// NULL after the category has been deleted.
    pub category_id: Option<i32>,
    #[sea_orm(belongs_to, from = "category_id", to = "id")]
    pub category: HasOne<super::category::Entity>,

    /// Deleted together with the owner.
    pub owner_id: i32,
    #[sea_orm(belongs_to, from = "owner_id", to = "id")]
    pub owner: HasOne<super::user::Entity>,

    #[sea_orm(unique)]
    pub answer_id: i32,
    #[sea_orm(belongs_to, from = "answer_id", to = "id")]
    pub answer: HasOne<super::answer::Entity>,

    #[sea_orm(unique)]
    pub commentary_id: i32,
    #[sea_orm(belongs_to, from = "commentary_id", to = "id")]
    pub commentary: HasOne<super::commentary::Entity>,

    #[sea_orm(has_many)]
    pub submissions: HasMany<super::submission::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Canonical answer text, submitted by the problem owner.
///
/// Exactly one per problem; the owning problem's `answer_id` is unique and
/// must be deleted before the answer row can go.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "answer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub answer: String,

    #[sea_orm(has_one)]
    pub problem: HasOne<super::problem::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

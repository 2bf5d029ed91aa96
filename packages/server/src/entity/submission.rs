use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per (user, problem) pair — "has this user ever engaged this
/// problem, and is it currently solved".
///
/// The pair is UNIQUE (see `seed::ensure_constraints`); score is 0 or 100
/// and is promoted to 100 once any solution scores 100, never regressed.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub score: i32,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub problem_id: i32,
    #[sea_orm(belongs_to, from = "problem_id", to = "id")]
    pub problem: HasOne<super::problem::Entity>,

    #[sea_orm(has_many)]
    pub solutions: HasMany<super::solution::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

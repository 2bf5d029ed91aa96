use common::CheckState;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One attempt at a problem, owned by exactly one submission.
///
/// Created in `PendingCheck` with score 0; the async check consumer moves it
/// through `Checking` to `CheckDone` and finalizes the score.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "solution")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Answer text submitted by the user.
    pub answer: String,
    pub score: i32,
    pub check_state: CheckState,

    pub submission_id: i32,
    #[sea_orm(belongs_to, from = "submission_id", to = "id")]
    pub submission: HasOne<super::submission::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

/// Request counters and daily quota of one external provider.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "explorer_api_stats")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub provider_name: String,
    pub total_requests: i32,
    pub successful_requests: i32,
    pub daily_limit: i32,
    pub remaining_daily_requests: i32,
    pub last_used_at: Option<DateTimeUtc>,
    pub quota_day: Date,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

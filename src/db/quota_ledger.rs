use chrono::{ NaiveDate, Utc };
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait,
    ActiveValue,
    ColumnTrait,
    DatabaseConnection,
    EntityTrait,
    QueryFilter,
    QueryOrder,
};

use crate::db::entity::provider_stats::{ self, Column };
use crate::db::entity::ProviderStats;
use crate::enums::ProviderId;
use crate::error::{ AppError, ProbeError, Result };

/// Per-provider request counters and daily quota, one row per provider.
///
/// Every mutation is a single `UPDATE` whose new values are computed by the
/// database from the current row, so concurrent probes never lose increments
/// and `remaining_daily_requests` stays within `0..=daily_limit`.
#[derive(Clone)]
pub struct QuotaLedger {
    db: DatabaseConnection,
}

impl QuotaLedger {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert a row for every known provider that does not have one yet.
    /// Existing rows, including operator-adjusted limits, are left alone.
    pub async fn seed_defaults(&self) -> Result<()> {
        for provider in ProviderId::all() {
            self.seed_provider(*provider, provider.default_daily_limit()).await?;
        }
        Ok(())
    }

    pub async fn seed_provider(&self, provider: ProviderId, daily_limit: i32) -> Result<()> {
        if self.find(provider).await?.is_some() {
            return Ok(());
        }

        let now = Utc::now();
        let row = provider_stats::ActiveModel {
            id: ActiveValue::NotSet,
            provider_name: ActiveValue::Set(provider.as_str().to_string()),
            total_requests: ActiveValue::Set(0),
            successful_requests: ActiveValue::Set(0),
            daily_limit: ActiveValue::Set(daily_limit.max(0)),
            remaining_daily_requests: ActiveValue::Set(daily_limit.max(0)),
            last_used_at: ActiveValue::Set(None),
            quota_day: ActiveValue::Set(now.date_naive()),
            updated_at: ActiveValue::Set(now),
        };
        row.insert(&self.db).await?;

        tracing::info!("Seeded quota for {} with daily limit {}", provider, daily_limit);
        Ok(())
    }

    pub async fn find(&self, provider: ProviderId) -> Result<Option<provider_stats::Model>> {
        let row = ProviderStats::find()
            .filter(Column::ProviderName.eq(provider.as_str()))
            .one(&self.db).await?;
        Ok(row)
    }

    pub async fn all_stats(&self) -> Result<Vec<provider_stats::Model>> {
        let rows = ProviderStats::find().order_by_asc(Column::ProviderName).all(&self.db).await?;
        Ok(rows)
    }

    /// Count one request against `provider`. Attempts are recorded even when the
    /// quota is already exhausted; the remaining counter is clamped at zero.
    pub async fn record_attempt(&self, provider: ProviderId, succeeded: bool) -> Result<()> {
        let now = Utc::now();
        let remaining = Expr::case(
            Expr::col(Column::RemainingDailyRequests).gt(0),
            Expr::col(Column::RemainingDailyRequests).sub(1)
        ).finally(0);

        let result = ProviderStats::update_many()
            .col_expr(Column::TotalRequests, Expr::col(Column::TotalRequests).add(1))
            .col_expr(
                Column::SuccessfulRequests,
                Expr::col(Column::SuccessfulRequests).add(i32::from(succeeded))
            )
            .col_expr(Column::RemainingDailyRequests, remaining.into())
            .col_expr(Column::LastUsedAt, Expr::value(Some(now)))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::ProviderName.eq(provider.as_str()))
            .exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("No quota row for provider {}", provider)));
        }
        Ok(())
    }

    /// Like [`record_attempt`](Self::record_attempt) but never fails; used on
    /// probe paths where bookkeeping must not hide the probe result.
    pub async fn record_provider_attempt(&self, provider: ProviderId, succeeded: bool) {
        if let Err(e) = self.record_attempt(provider, succeeded).await {
            tracing::warn!("Failed to record {} attempt (success={}): {}", provider, succeeded, e);
        }
    }

    /// Record a failed call. Failures that never produced a request, such as
    /// a missing API key, are not counted.
    pub async fn record_failure(&self, provider: ProviderId, error: &ProbeError) {
        if error.is_no_data() {
            self.record_provider_attempt(provider, false).await;
        } else {
            tracing::debug!("Not counting {} attempt, no request was sent: {}", provider, error);
        }
    }

    /// Whether `provider` may still be called today. A ledger that cannot be
    /// read does not stop probing.
    pub async fn has_quota(&self, provider: ProviderId) -> bool {
        match self.find(provider).await {
            Ok(Some(row)) => row.remaining_daily_requests > 0,
            Ok(None) => {
                tracing::warn!("No quota row for {}, allowing request", provider);
                true
            }
            Err(e) => {
                tracing::warn!("Quota lookup for {} failed, allowing request: {}", provider, e);
                true
            }
        }
    }

    /// Operator override of the daily cap. Remaining quota is lowered to the new
    /// cap if needed but never raised.
    pub async fn set_daily_limit(
        &self,
        provider: ProviderId,
        daily_limit: i32
    ) -> Result<provider_stats::Model> {
        if daily_limit < 0 {
            return Err(AppError::InvalidInput("daily_limit must not be negative".to_string()));
        }

        let remaining = Expr::case(
            Expr::col(Column::RemainingDailyRequests).gt(daily_limit),
            daily_limit
        ).finally(Expr::col(Column::RemainingDailyRequests));

        let result = ProviderStats::update_many()
            .col_expr(Column::DailyLimit, Expr::value(daily_limit))
            .col_expr(Column::RemainingDailyRequests, remaining.into())
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::ProviderName.eq(provider.as_str()))
            .exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("No quota row for provider {}", provider)));
        }

        tracing::info!("Daily limit of {} set to {}", provider, daily_limit);
        self.find(provider).await?.ok_or_else(||
            AppError::NotFound(format!("No quota row for provider {}", provider))
        )
    }

    /// Start a new quota window for every row whose window is older than `today`.
    /// Calling it again on the same day changes nothing.
    pub async fn roll_over(&self, today: NaiveDate) -> Result<u64> {
        let result = ProviderStats::update_many()
            .col_expr(Column::RemainingDailyRequests, Expr::col(Column::DailyLimit).into())
            .col_expr(Column::QuotaDay, Expr::value(today))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::QuotaDay.lt(today))
            .exec(&self.db).await?;

        if result.rows_affected > 0 {
            tracing::info!("Daily quota reset for {} providers", result.rows_affected);
        }
        Ok(result.rows_affected)
    }

    /// Refill quota immediately, for one provider or all of them.
    pub async fn reset_quota(&self, provider: Option<ProviderId>) -> Result<u64> {
        let mut update = ProviderStats::update_many()
            .col_expr(Column::RemainingDailyRequests, Expr::col(Column::DailyLimit).into())
            .col_expr(Column::QuotaDay, Expr::value(Utc::now().date_naive()))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()));

        if let Some(provider) = provider {
            update = update.filter(Column::ProviderName.eq(provider.as_str()));
        }

        let result = update.exec(&self.db).await?;
        tracing::info!("Manual quota reset ({:?}): {} rows", provider, result.rows_affected);
        Ok(result.rows_affected)
    }

    /// Close the underlying pool, making every later query fail.
    #[cfg(test)]
    pub(crate) async fn close(self) {
        self.db.close().await.unwrap();
    }
}

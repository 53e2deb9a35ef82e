//! One-off notification sweep.
//!
//! Runs the same retry pass the API server schedules, for use from cron or
//! after an SMTP outage.

use exprz_api::config::ApiConfig;
use exprz_api::db;
use exprz_api::services::notifications::retry_failed;
use exprz_api::state::AppState;
use tracing::info;

/// Retry failed order emails and prune expired signup codes.
///
/// # Errors
///
/// Returns an error if configuration is incomplete, the database is
/// unreachable, or the pending batch cannot be loaded.
pub async fn retry() -> Result<(), Box<dyn std::error::Error>> {
    let config = ApiConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    let state = AppState::new(config, pool)?;

    let report = retry_failed(&state).await?;

    info!(
        attempted = report.attempted,
        delivered = report.delivered,
        expired_otps = report.expired_otps,
        "Notification sweep finished"
    );
    Ok(())
}

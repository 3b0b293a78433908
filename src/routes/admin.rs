use axum::{
    Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    auth::policy::{self, LEDGER_AUDIT, LEDGER_REPAIR},
    error::ApiResult,
    response::ApiResponse,
    router::AppState,
    services::reconcile::{self, LedgerReport},
};

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/ledger/audit",
            policy::restrict(get(audit), state, LEDGER_AUDIT),
        )
        .route(
            "/ledger/repair",
            policy::restrict(post(repair), state, LEDGER_REPAIR),
        )
}

async fn audit(State(state): State<AppState>) -> ApiResult<ApiResponse<LedgerReport>> {
    let report = reconcile::audit(&state.db).await?;
    if !report.is_clean() {
        tracing::warn!(
            campaigns = report.campaign_totals.len(),
            orphans = report.sponsored_flags.len(),
            duplicates = report.duplicate_sponsorships.len(),
            "ledger drift detected"
        );
    }
    Ok(ApiResponse::ok(report))
}

async fn repair(State(state): State<AppState>) -> ApiResult<ApiResponse<LedgerReport>> {
    let report = reconcile::repair(&state.db).await?;
    Ok(ApiResponse::ok(report).with_message("Ledger repaired"))
}

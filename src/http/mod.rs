//! http surface of the achievement workflow
//!
//! handlers decode the request, run the matching service call on the blocking
//! pool and map the outcome to json. storage is synchronous, so every call is
//! bounded by the configured storage timeout; a call that overruns is reported
//! as a storage error while the operation itself runs to completion.
pub mod auth;
pub mod error;
pub mod handlers;

pub use error::ApiError;

use crate::error::{StoreError, WorkflowError};
use crate::identity::IdentityDirectory;
use crate::page::PageLimits;
use crate::service::AchievementService;
use crate::stats::StatisticsAggregator;
use crate::store::{ContentStore, ReferenceLedger};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;

/// path prefix for all achievement endpoints
pub const ACHIEVEMENTS_PATH: &str = "/api/v1/achievements";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AchievementService>,
    pub stats: Arc<StatisticsAggregator>,
    pub page_limits: PageLimits,
    pub storage_timeout: Duration,
}

impl AppState {
    pub fn new(
        directory: Arc<dyn IdentityDirectory>,
        contents: Arc<dyn ContentStore>,
        ledger: Arc<dyn ReferenceLedger>,
    ) -> Self {
        Self {
            service: Arc::new(AchievementService::new(
                directory.clone(),
                contents.clone(),
                ledger.clone(),
            )),
            stats: Arc::new(StatisticsAggregator::new(directory, contents, ledger)),
            page_limits: PageLimits::default(),
            storage_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_page_limits(mut self, page_limits: PageLimits) -> Self {
        self.page_limits = page_limits;
        self
    }

    pub fn with_storage_timeout(mut self, storage_timeout: Duration) -> Self {
        self.storage_timeout = storage_timeout;
        self
    }

    /// run a synchronous service call on the blocking pool, bounded by the storage timeout
    pub async fn blocking<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> Result<T, WorkflowError> + Send + 'static,
        T: Send + 'static,
    {
        let task = tokio::task::spawn_blocking(op);
        match tokio::time::timeout(self.storage_timeout, task).await {
            Ok(Ok(result)) => result.map_err(ApiError::from),
            Ok(Err(join_error)) => Err(ApiError::internal(join_error)),
            Err(_) => {
                tracing::warn!(timeout = ?self.storage_timeout, "storage call timed out");
                Err(StoreError::Timeout(self.storage_timeout).into())
            }
        }
    }
}

/// create the application router
pub fn create_app(state: AppState) -> Router {
    let id_path = |suffix: &str| format!("{ACHIEVEMENTS_PATH}/{{id}}{suffix}");

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            ACHIEVEMENTS_PATH,
            get(handlers::list_all).post(handlers::create_achievement),
        )
        .route(&format!("{ACHIEVEMENTS_PATH}/my"), get(handlers::list_own))
        .route(&format!("{ACHIEVEMENTS_PATH}/advisee"), get(handlers::list_advisee))
        .route(&format!("{ACHIEVEMENTS_PATH}/stats/my"), get(handlers::stats_my))
        .route(&format!("{ACHIEVEMENTS_PATH}/stats/advisee"), get(handlers::stats_advisee))
        .route(&format!("{ACHIEVEMENTS_PATH}/stats/all"), get(handlers::stats_all))
        .route(
            &id_path(""),
            get(handlers::achievement_detail)
                .put(handlers::update_achievement)
                .delete(handlers::delete_achievement),
        )
        .route(&id_path("/submit"), post(handlers::submit_achievement))
        .route(&id_path("/verify"), post(handlers::verify_achievement))
        .route(&id_path("/reject"), post(handlers::reject_achievement))
        .with_state(state)
}

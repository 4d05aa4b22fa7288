use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        quota::{Decision, QuotaService, QuotaServiceApi},
        subscription::{SetTierRequest, UsageState, UsageSummary},
    },
    error::{AppError, AppResult},
};

/// Body returned by the quota endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resets_at: Option<chrono::DateTime<chrono::FixedOffset>>,
}

impl From<Decision> for DecisionResponse {
    fn from(decision: Decision) -> Self {
        Self {
            allowed: decision.allowed,
            message: decision.message,
            resets_at: decision.reset_time,
        }
    }
}

pub struct QuotaController {
    quota_service: Arc<QuotaService>,
}

impl QuotaController {
    pub fn new(quota_service: Arc<QuotaService>) -> Self {
        Self { quota_service }
    }

    /// GET /api/users/:user_id/quota - Can the user ask another question?
    pub async fn check_quota(
        State(controller): State<Arc<QuotaController>>,
        Path(user_id): Path<String>,
    ) -> AppResult<Json<DecisionResponse>> {
        let user_id = parse_user_id(&user_id)?;
        let decision = controller.quota_service.check_quota(user_id).await?;
        Ok(Json(decision.into()))
    }

    /// POST /api/users/:user_id/questions - Check and count a question atomically
    pub async fn ask_question(
        State(controller): State<Arc<QuotaController>>,
        Path(user_id): Path<String>,
    ) -> AppResult<(StatusCode, Json<DecisionResponse>)> {
        let user_id = parse_user_id(&user_id)?;
        let decision = controller.quota_service.ask_question(user_id).await?;

        let status = if decision.allowed {
            StatusCode::OK
        } else {
            StatusCode::TOO_MANY_REQUESTS
        };

        Ok((status, Json(decision.into())))
    }

    /// POST /api/users/:user_id/questions/record - Count a question already allowed
    pub async fn record_question(
        State(controller): State<Arc<QuotaController>>,
        Path(user_id): Path<String>,
    ) -> AppResult<Json<UsageState>> {
        let user_id = parse_user_id(&user_id)?;
        let usage = controller.quota_service.record_question(user_id).await?;
        Ok(Json(usage))
    }

    /// POST /api/users/:user_id/conversations - Count a new conversation
    pub async fn record_conversation(
        State(controller): State<Arc<QuotaController>>,
        Path(user_id): Path<String>,
    ) -> AppResult<Json<UsageState>> {
        let user_id = parse_user_id(&user_id)?;
        let usage = controller.quota_service.record_conversation(user_id).await?;
        Ok(Json(usage))
    }

    /// GET /api/users/:user_id/usage - Usage statistics and limits
    pub async fn get_usage(
        State(controller): State<Arc<QuotaController>>,
        Path(user_id): Path<String>,
    ) -> AppResult<Json<UsageSummary>> {
        let user_id = parse_user_id(&user_id)?;
        let summary = controller.quota_service.get_usage(user_id).await?;
        Ok(Json(summary))
    }

    /// PUT /api/users/:user_id/subscription - Apply a tier chosen by the payment provider
    pub async fn set_tier(
        State(controller): State<Arc<QuotaController>>,
        Path(user_id): Path<String>,
        Json(request): Json<SetTierRequest>,
    ) -> AppResult<StatusCode> {
        let user_id = parse_user_id(&user_id)?;
        controller
            .quota_service
            .set_tier(user_id, request.tier)
            .await?;
        Ok(StatusCode::NO_CONTENT)
    }
}

fn parse_user_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid user id: {}", raw)))
}

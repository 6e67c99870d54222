//! Subscription management: subscribe, unsubscribe and the settings view.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use birdtag_core::PipelineError;

use crate::error::{ErrorResponse, HttpError};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubscriptionRequest {
    /// Subscriber identity (email address).
    pub email: String,
    /// Species tag to subscribe to; normalized to lower case.
    pub species: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscribeResponse {
    pub success: bool,
    pub message: String,
    pub subscription_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnsubscribeResponse {
    pub success: bool,
    pub message: String,
    /// Whether a subscription actually existed; unsubscribing an unknown
    /// pair is a no-op, not an error.
    pub removed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsResponse {
    pub settings: Vec<SubscriptionSetting>,
    pub total_subscriptions: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionSetting {
    pub id: String,
    pub tag: String,
    pub channel: String,
    pub created_at: DateTime<Utc>,
}

#[utoipa::path(
    post,
    path = "/api/v1/subscriptions",
    tag = "subscriptions",
    request_body = SubscriptionRequest,
    responses(
        (status = 200, description = "Subscribed", body = SubscribeResponse),
        (status = 400, description = "Missing email or species", body = ErrorResponse)
    )
)]
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubscriptionRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let record = state
        .registry
        .subscribe(&request.email, &request.species)
        .await?;

    Ok(Json(SubscribeResponse {
        success: true,
        message: format!("Successfully subscribed to {}", record.tag_normalized),
        subscription_id: record.subscription_id,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/subscriptions",
    tag = "subscriptions",
    request_body = SubscriptionRequest,
    responses(
        (status = 200, description = "Unsubscribed (no-op when absent)", body = UnsubscribeResponse),
        (status = 400, description = "Missing email or species", body = ErrorResponse)
    )
)]
pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubscriptionRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let removed = state
        .registry
        .unsubscribe(&request.email, &request.species)
        .await?;

    Ok(Json(UnsubscribeResponse {
        success: true,
        message: format!("Successfully unsubscribed from {}", request.species),
        removed,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/subscriptions/settings",
    tag = "subscriptions",
    responses(
        (status = 200, description = "Subscriber's notification settings", body = SettingsResponse),
        (status = 400, description = "Missing email parameter", body = ErrorResponse)
    )
)]
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, HttpError> {
    let email = params
        .get("email")
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| {
            PipelineError::Validation(
                "email is required, use ?email=user@example.com".to_string(),
            )
        })?;

    let subscriptions = state.registry.subscriptions_for(email).await?;
    let settings: Vec<SubscriptionSetting> = subscriptions
        .into_iter()
        .map(|s| SubscriptionSetting {
            id: s.subscription_id,
            tag: s.tag_normalized,
            channel: s.channel_reference,
            created_at: s.created_at,
        })
        .collect();
    let total_subscriptions = settings.len();

    Ok(Json(SettingsResponse {
        settings,
        total_subscriptions,
    }))
}

//! `POST /api/v1/interactions`: record a favorite, playlist add or review
//! against the engagement ledger and report the PulsePoints awarded.

use std::str::FromStr;

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use pulsevest_core::ActionKind;
use pulsevest_db::InteractionOutcome;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    map_db_error, parse_json, parse_public_id, require_field, ApiError, ApiResponse, AppState,
    ResponseMeta,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RecordInteractionRequest {
    pub fan_id: Option<String>,
    pub project_id: Option<String>,
    pub action_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RecordInteractionResponse {
    pub points_awarded: Decimal,
    pub already_credited: bool,
}

impl From<&InteractionOutcome> for RecordInteractionResponse {
    fn from(outcome: &InteractionOutcome) -> Self {
        Self {
            points_awarded: outcome.points_awarded(),
            already_credited: outcome.is_duplicate(),
        }
    }
}

pub(super) async fn record_interaction(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<RecordInteractionRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<RecordInteractionResponse>>, ApiError> {
    let body = parse_json(body)?;

    let fan_id = require_field("fanId", body.fan_id.as_deref())?;
    let project_id = require_field("projectId", body.project_id.as_deref())?;
    let action_type = require_field("actionType", body.action_type.as_deref())?;

    let project_id = parse_public_id("projectId", project_id)?;
    let action =
        ActionKind::from_str(action_type).map_err(|e| ApiError::validation(e.to_string()))?;

    let outcome = pulsevest_db::record_interaction(&state.pool, fan_id, project_id, action)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data: RecordInteractionResponse::from(&outcome),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_outcome_serializes_zero_award() {
        let response = RecordInteractionResponse::from(&InteractionOutcome::AlreadyCredited);
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["alreadyCredited"], true);
        assert_eq!(json["pointsAwarded"], "0");
    }

    #[test]
    fn recorded_outcome_keeps_fractional_award() {
        let response = RecordInteractionResponse::from(&InteractionOutcome::Recorded {
            points_awarded: Decimal::new(49, 1),
            peer_rank: 1,
            credited: true,
        });
        assert_eq!(response.points_awarded, Decimal::new(49, 1));
        assert!(!response.already_credited);
    }
}

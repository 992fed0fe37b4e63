//! AI tutor API-key management. Keys are write-only over HTTP: reads return
//! a masked hint.

use crate::credentials::{SharedCredentialStore, mask_key};
use crate::error::ApiError;
use crate::models::DataResponse;
use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialBody {
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialStatus {
    pub owner: String,
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Store or replace the tutor API key for an owner
#[openapi(tag = "Tutor")]
#[put("/tutor/credentials/<owner>", data = "<body>")]
pub async fn put_credential(
    owner: &str,
    store: &State<SharedCredentialStore>,
    body: Json<CredentialBody>,
) -> Result<Json<DataResponse<CredentialStatus>>, ApiError> {
    store.set(owner, &body.api_key).await?;
    log::info!("stored tutor credential for {}", owner);

    Ok(Json(DataResponse {
        data: CredentialStatus {
            owner: owner.to_string(),
            configured: true,
            hint: Some(mask_key(body.api_key.trim())),
        },
    }))
}

/// Report whether an owner has a tutor API key, without revealing it
#[openapi(tag = "Tutor")]
#[get("/tutor/credentials/<owner>")]
pub async fn get_credential(
    owner: &str,
    store: &State<SharedCredentialStore>,
) -> Result<Json<DataResponse<CredentialStatus>>, ApiError> {
    let key = store.get(owner).await?;

    Ok(Json(DataResponse {
        data: CredentialStatus {
            owner: owner.to_string(),
            configured: key.is_some(),
            hint: key.as_deref().map(mask_key),
        },
    }))
}

/// Remove an owner's tutor API key
#[openapi(tag = "Tutor")]
#[delete("/tutor/credentials/<owner>")]
pub async fn delete_credential(
    owner: &str,
    store: &State<SharedCredentialStore>,
) -> Result<Json<DataResponse<CredentialStatus>>, ApiError> {
    if !store.clear(owner).await? {
        return Err(ApiError::NotFound(format!(
            "No tutor credential stored for '{owner}'"
        )));
    }
    log::info!("cleared tutor credential for {}", owner);

    Ok(Json(DataResponse {
        data: CredentialStatus {
            owner: owner.to_string(),
            configured: false,
            hint: None,
        },
    }))
}

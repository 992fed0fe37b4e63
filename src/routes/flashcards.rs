use crate::db::ContentDb;
use crate::error::ApiError;
use crate::import::database_operations::delete_flashcard_sets;
use crate::models::{DataResponse, DeletedResponse, FlashcardSetDetail};
use crate::routes::helpers::load_flashcard_set_detail;
use rocket::serde::json::Json;
use rocket_db_pools::Connection;
use rocket_okapi::openapi;
use uuid::Uuid;

/// Get an imported flashcard set with its ordered cards
#[openapi(tag = "Content")]
#[get("/flashcard-sets/<id>")]
pub async fn get_flashcard_set(
    id: Uuid,
    mut db: Connection<ContentDb>,
) -> Result<Json<DataResponse<FlashcardSetDetail>>, ApiError> {
    let detail = load_flashcard_set_detail(&mut db, id).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// Delete a flashcard set and its cards
#[openapi(tag = "Content")]
#[delete("/flashcard-sets/<id>")]
pub async fn delete_flashcard_set(
    id: Uuid,
    mut db: Connection<ContentDb>,
) -> Result<Json<DataResponse<DeletedResponse>>, ApiError> {
    let deleted = delete_flashcard_sets(&mut db, &[id]).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound(format!("Flashcard set '{id}' not found")));
    }

    log::info!("deleted flashcard set {}", id);
    Ok(Json(DataResponse {
        data: DeletedResponse { id, deleted: true },
    }))
}

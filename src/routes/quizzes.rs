use crate::db::ContentDb;
use crate::error::ApiError;
use crate::import::database_operations::delete_quizzes;
use crate::models::{DataResponse, DeletedResponse, QuizDetail};
use crate::routes::helpers::load_quiz_detail;
use rocket::serde::json::Json;
use rocket_db_pools::Connection;
use rocket_okapi::openapi;
use uuid::Uuid;

/// Get an imported quiz with its ordered questions and options
#[openapi(tag = "Content")]
#[get("/quizzes/<id>")]
pub async fn get_quiz(
    id: Uuid,
    mut db: Connection<ContentDb>,
) -> Result<Json<DataResponse<QuizDetail>>, ApiError> {
    let detail = load_quiz_detail(&mut db, id).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// Delete a quiz; its questions and options go with it
#[openapi(tag = "Content")]
#[delete("/quizzes/<id>")]
pub async fn delete_quiz(
    id: Uuid,
    mut db: Connection<ContentDb>,
) -> Result<Json<DataResponse<DeletedResponse>>, ApiError> {
    let deleted = delete_quizzes(&mut db, &[id]).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound(format!("Quiz '{id}' not found")));
    }

    log::info!("deleted quiz {}", id);
    Ok(Json(DataResponse {
        data: DeletedResponse { id, deleted: true },
    }))
}

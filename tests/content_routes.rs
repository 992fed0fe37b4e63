use content_import::api_routes;
use content_import::test_support::{TestDatabase, TestDatabaseError, TestFixtures, TestRocketBuilder};
use rocket::http::{ContentType, Status};
use serde_json::{Value, json};

#[tokio::test]
async fn deleting_a_quiz_cascades_to_questions_and_options() {
    let test_db = match TestDatabase::new_from_env().await {
        Ok(db) => db,
        Err(TestDatabaseError::MissingUrl) => {
            eprintln!("skipping content route test: TEST_DATABASE_URL not set");
            return;
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    };

    let client = TestRocketBuilder::new()
        .with_database_url(test_db.url())
        .manage_pg_pool(test_db.pool_clone())
        .mount_api_routes(api_routes())
        .async_client()
        .await;

    let payload = json!({"quizSets": [{
        "subject": "Chemistry",
        "topic": "Bonds",
        "title": "Chemical Bonds",
        "questions": [
            {"question": "Ionic bond?", "options": [{"text": "NaCl", "isCorrect": true}, {"text": "H2"}]},
            {"question": "Covalent bond?", "options": [{"text": "H2", "isCorrect": true}, {"text": "NaCl"}, {"text": "KBr"}]}
        ]
    }]});
    let response = client
        .post("/api/v1/imports/quizzes")
        .header(ContentType::JSON)
        .body(
            json!({
                "jsonData": payload.to_string(),
                "university": "medicaps",
                "degree": "btech_cse",
                "year": "SECOND_YEAR",
                "semester": "THIRD_SEMESTER"
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let summary: Value = response.into_json().await.expect("JSON body");
    let quiz_id = summary["quizId"].as_str().expect("quizId present").to_string();
    assert_eq!(summary["results"][0]["title"], "Chemical Bonds");

    let fixtures = TestFixtures::new(test_db.pool());
    assert_eq!(fixtures.quiz_counts().await.unwrap(), (1, 2, 5));

    let response = client
        .delete(format!("/api/v1/quizzes/{quiz_id}"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(fixtures.quiz_counts().await.unwrap(), (0, 0, 0));
    drop(response);

    let response = client
        .get(format!("/api/v1/quizzes/{quiz_id}"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
    let body: Value = response.into_json().await.expect("JSON body");
    assert_eq!(body["kind"], "NotFound");

    let response = client
        .delete(format!("/api/v1/flashcard-sets/{quiz_id}"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
    drop(response);

    drop(client);
    test_db.close().await.expect("failed to drop test database");
}

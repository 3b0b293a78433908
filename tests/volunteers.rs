mod common;

use axum::http::StatusCode;
use hopeconnect::entities::sea_orm_active_enums::Role;
use serde_json::json;

use common::spawn_app;

#[tokio::test]
async fn application_review_fills_the_opportunity() {
    let app = spawn_app().await;
    let manager = app.user("manager@example.com", Role::OrphanageManager).await;
    let volunteer = app.user("volunteer@example.com", Role::Volunteer).await;
    let home = app.orphanage(&manager).await;

    let (status, body) = app
        .post(
            "/api/v1/volunteers/opportunities",
            Some(&manager.token),
            json!({
                "orphanage_id": home.id,
                "title": "Weekend tutoring",
                "description": "Help with maths homework",
                "volunteers_needed": 1,
                "start_date": "2099-01-01"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let opportunity_id = body["data"]["id"].as_i64().unwrap();

    let apply = format!("/api/v1/volunteers/opportunities/{opportunity_id}/apply");
    let (status, body) = app
        .post(&apply, Some(&volunteer.token), json!({ "message": "I teach maths" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "pending");
    let application_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = app
        .post(&apply, Some(&volunteer.token), json!({ "message": "Again" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "You have already applied for this opportunity");

    // The first application is left untouched by the rejected duplicate.
    let (status, body) = app
        .get(
            &format!("/api/v1/volunteers/opportunities/{opportunity_id}/applications"),
            Some(&manager.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["id"], application_id);
    assert_eq!(body["data"][0]["message"], "I teach maths");
    assert_eq!(body["data"][0]["status"], "pending");

    // The orphanage contact person hears about the application.
    let (_, body) = app.get("/api/v1/notifications", Some(&manager.token)).await;
    assert_eq!(body["unread_count"], 1);
    assert_eq!(body["data"][0]["type"], "volunteer");

    let review = format!("/api/v1/volunteers/applications/{application_id}/status");
    let (status, _) = app
        .put(&review, Some(&manager.token), json!({ "status": "completed" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .put(&review, Some(&manager.token), json!({ "status": "approved" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "approved");

    let (_, body) = app
        .get(&format!("/api/v1/volunteers/opportunities/{opportunity_id}"), None)
        .await;
    assert_eq!(body["data"]["status"], "filled");
    assert_eq!(body["data"]["application_count"], 1);

    // Filled opportunities drop out of the default listing.
    let (_, body) = app.get("/api/v1/volunteers/opportunities", None).await;
    assert_eq!(body["pagination"]["total"], 0);

    let (_, body) = app.get("/api/v1/notifications", Some(&volunteer.token)).await;
    assert_eq!(body["unread_count"], 1);
}

#[tokio::test]
async fn volunteer_routes_check_roles() {
    let app = spawn_app().await;
    let manager = app.user("manager@example.com", Role::OrphanageManager).await;
    let donor = app.user("donor@example.com", Role::Donor).await;
    let home = app.orphanage(&manager).await;

    let (status, body) = app
        .post(
            "/api/v1/volunteers/opportunities",
            Some(&donor.token),
            json!({
                "orphanage_id": home.id,
                "title": "Painting",
                "description": "Repaint the dormitory",
                "start_date": "2099-01-01"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "User role donor is not authorized to access this route"
    );

    // A manager who is not the orphanage's contact person cannot post for it.
    let outsider = app.user("outsider@example.com", Role::OrphanageManager).await;
    let (status, _) = app
        .post(
            "/api/v1/volunteers/opportunities",
            Some(&outsider.token),
            json!({
                "orphanage_id": home.id,
                "title": "Painting",
                "description": "Repaint the dormitory",
                "start_date": "2099-01-01"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/v1/volunteers/stats", Some(&manager.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

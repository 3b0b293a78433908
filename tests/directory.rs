mod common;

use axum::http::StatusCode;
use hopeconnect::entities::sea_orm_active_enums::Role;
use serde_json::json;

use common::spawn_app;

#[tokio::test]
async fn orphanage_registration_and_verification() {
    let app = spawn_app().await;
    let admin = app.user("admin@example.com", Role::Admin).await;
    let manager = app.user("manager@example.com", Role::OrphanageManager).await;

    let (status, body) = app
        .post(
            "/api/v1/orphanages",
            Some(&manager.token),
            json!({ "name": "Hope House", "location": "Kampala" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["verification_status"], "pending");
    assert_eq!(body["data"]["contact_person_id"], manager.model.id);
    let id = body["data"]["id"].as_i64().unwrap();

    let (_, body) = app.get("/api/v1/notifications", Some(&admin.token)).await;
    assert_eq!(body["unread_count"], 1);

    let verify = format!("/api/v1/orphanages/{id}/verification");
    let (status, _) = app
        .put(&verify, Some(&manager.token), json!({ "verification_status": "approved" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put(&verify, Some(&admin.token), json!({ "verification_status": "approved" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["verification_status"], "approved");

    let (_, body) = app
        .get("/api/v1/orphanages?verificationStatus=approved", None)
        .await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["orphan_count"], 0);
}

#[tokio::test]
async fn one_review_per_user_with_rating_summary() {
    let app = spawn_app().await;
    let manager = app.user("manager@example.com", Role::OrphanageManager).await;
    let alice = app.user("alice@example.com", Role::Donor).await;
    let bob = app.user("bob@example.com", Role::Donor).await;
    let home = app.orphanage(&manager).await;
    let reviews = format!("/api/v1/orphanages/{}/reviews", home.id);

    let (status, _) = app
        .post(&reviews, Some(&alice.token), json!({ "rating": 6 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(&reviews, Some(&alice.token), json!({ "rating": 5, "comment": "Wonderful" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .post(&reviews, Some(&alice.token), json!({ "rating": 4 }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app
        .post(&reviews, Some(&bob.token), json!({ "rating": 2 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.get(&reviews, None).await;
    assert_eq!(status, StatusCode::OK);
    let summary = &body["data"]["summary"];
    assert_eq!(summary["total_reviews"], 2);
    assert_eq!(summary["average_rating"], 3.5);
    assert_eq!(summary["histogram"], json!([0, 1, 0, 0, 1]));

    let (_, body) = app.get("/api/v1/notifications", Some(&manager.token)).await;
    assert_eq!(body["unread_count"], 2);
}

#[tokio::test]
async fn orphans_with_active_sponsorships_cannot_be_deleted() {
    let app = spawn_app().await;
    let admin = app.user("admin@example.com", Role::Admin).await;
    let sponsor = app.user("sponsor@example.com", Role::Donor).await;
    let orphan = app.orphan(None).await;

    let (status, _) = app
        .post(
            "/api/v1/sponsorships",
            Some(&sponsor.token),
            json!({ "orphan_id": orphan.id, "monthly_amount": 40.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .request(
            axum::http::Method::DELETE,
            &format!("/api/v1/orphans/{}", orphan.id),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app.get("/api/v1/orphans?isSponsored=true", None).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert!(body["data"][0]["age"].as_u64().unwrap() >= 9);
}

#[tokio::test]
async fn out_of_range_pages_return_an_empty_list() {
    let app = spawn_app().await;

    let (status, body) = app
        .get("/api/v1/campaigns?page=9223372036854775807", None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["pagination"]["total"], 0);

    let (status, body) = app.get("/api/v1/orphans?page=18446744073709551615&limit=100", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"], json!([]));
}

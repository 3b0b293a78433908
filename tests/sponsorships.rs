mod common;

use axum::http::StatusCode;
use hopeconnect::entities::sea_orm_active_enums::Role;
use serde_json::json;

use common::spawn_app;

#[tokio::test]
async fn sponsorship_lifecycle_keeps_orphan_flag_in_step() {
    let app = spawn_app().await;
    let sponsor = app.user("sponsor@example.com", Role::Donor).await;
    let rival = app.user("rival@example.com", Role::Donor).await;
    let orphan = app.orphan(None).await;

    let (status, body) = app
        .post(
            "/api/v1/sponsorships",
            Some(&sponsor.token),
            json!({ "orphan_id": orphan.id, "monthly_amount": 50.0, "start_date": "2024-01-01" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let sponsorship = &body["data"]["sponsorship"];
    assert_eq!(sponsorship["status"], "active");
    assert_eq!(sponsorship["payment_frequency"], "monthly");
    assert_eq!(sponsorship["next_payment_date"], "2024-02-01");
    assert_eq!(sponsorship["payment_count"], 1);
    assert_eq!(sponsorship["total_paid"], 50.0);
    assert_eq!(body["data"]["donation"]["donation_type"], "sponsorship");
    assert_eq!(body["data"]["donation"]["status"], "completed");
    let id = sponsorship["id"].as_i64().unwrap();

    let (_, body) = app.get(&format!("/api/v1/orphans/{}", orphan.id), None).await;
    assert_eq!(body["data"]["is_sponsored"], true);
    assert_eq!(body["data"]["has_active_sponsorship"], true);

    let (status, body) = app
        .post(
            "/api/v1/sponsorships",
            Some(&rival.token),
            json!({ "orphan_id": orphan.id, "monthly_amount": 80.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (status, body) = app
        .post(&format!("/api/v1/sponsorships/{id}/payment"), Some(&sponsor.token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let sponsorship = &body["data"]["sponsorship"];
    assert_eq!(sponsorship["payment_count"], 2);
    assert_eq!(sponsorship["total_paid"], 100.0);
    assert_eq!(sponsorship["next_payment_date"], "2024-03-01");

    let (status, _) = app.get(&format!("/api/v1/sponsorships/{id}"), Some(&rival.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Someone else's sponsorship cannot be ended, and nothing changes.
    let (status, _) = app
        .put(
            &format!("/api/v1/sponsorships/{id}/status"),
            Some(&rival.token),
            json!({ "status": "terminated" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, body) = app.get(&format!("/api/v1/orphans/{}", orphan.id), None).await;
    assert_eq!(body["data"]["is_sponsored"], true);

    let (status, _) = app
        .put(
            "/api/v1/sponsorships/9999/status",
            Some(&sponsor.token),
            json!({ "status": "paused" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .put(
            &format!("/api/v1/sponsorships/{id}/status"),
            Some(&sponsor.token),
            json!({ "status": "terminated" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "terminated");
    assert!(body["data"]["end_date"].is_string());

    let (_, body) = app.get(&format!("/api/v1/orphans/{}", orphan.id), None).await;
    assert_eq!(body["data"]["is_sponsored"], false);

    let (status, _) = app
        .put(
            &format!("/api/v1/sponsorships/{id}/status"),
            Some(&sponsor.token),
            json!({ "status": "active" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // With the first sponsorship over, the orphan can be sponsored again.
    let (status, body) = app
        .post(
            "/api/v1/sponsorships",
            Some(&rival.token),
            json!({ "orphan_id": orphan.id, "monthly_amount": 80.0, "payment_frequency": "quarterly", "start_date": "2024-01-31" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["sponsorship"]["next_payment_date"], "2024-04-30");
}

#[tokio::test]
async fn paused_sponsorship_cannot_take_payments() {
    let app = spawn_app().await;
    let sponsor = app.user("sponsor@example.com", Role::Donor).await;
    let orphan = app.orphan(None).await;

    let (_, body) = app
        .post(
            "/api/v1/sponsorships",
            Some(&sponsor.token),
            json!({ "orphan_id": orphan.id, "monthly_amount": 30.0 }),
        )
        .await;
    let id = body["data"]["sponsorship"]["id"].as_i64().unwrap();

    let (status, _) = app
        .put(
            &format!("/api/v1/sponsorships/{id}/status"),
            Some(&sponsor.token),
            json!({ "status": "paused" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(&format!("/api/v1/sponsorships/{id}/payment"), Some(&sponsor.token), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get(&format!("/api/v1/orphans/{}", orphan.id), None).await;
    assert_eq!(body["data"]["is_sponsored"], false);

    let (status, body) = app
        .put(
            &format!("/api/v1/sponsorships/{id}/status"),
            Some(&sponsor.token),
            json!({ "status": "active" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (_, body) = app.get(&format!("/api/v1/orphans/{}", orphan.id), None).await;
    assert_eq!(body["data"]["is_sponsored"], true);
}

#[tokio::test]
async fn sponsoring_an_unknown_orphan_is_not_found() {
    let app = spawn_app().await;
    let sponsor = app.user("sponsor@example.com", Role::Donor).await;

    let (status, _) = app
        .post(
            "/api/v1/sponsorships",
            Some(&sponsor.token),
            json!({ "orphan_id": 999, "monthly_amount": 30.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

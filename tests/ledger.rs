mod common;

use axum::http::StatusCode;
use hopeconnect::entities::{delivery, donation, sea_orm_active_enums::Role};
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait};
use serde_json::{Value, json};

use common::{TestApp, TestUser, spawn_app};

async fn campaign(app: &TestApp, admin: &TestUser, target: f64) -> i64 {
    let (status, body) = app
        .post(
            "/api/v1/campaigns",
            Some(&admin.token),
            json!({
                "title": "School supplies",
                "description": "Books and uniforms for the new term",
                "target_amount": target,
                "end_date": "2099-12-31"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_i64().unwrap()
}

async fn donate(app: &TestApp, donor: &TestUser, body: Value) -> Value {
    let (status, body) = app.post("/api/v1/donations", Some(&donor.token), body).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

async fn campaign_view(app: &TestApp, id: i64) -> Value {
    let (status, body) = app.get(&format!("/api/v1/campaigns/{id}"), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"].clone()
}

async fn set_donation_status(app: &TestApp, admin: &TestUser, id: i64, status: &str) {
    let (code, body) = app
        .put(
            &format!("/api/v1/donations/{id}/status"),
            Some(&admin.token),
            json!({ "status": status }),
        )
        .await;
    assert_eq!(code, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn campaign_total_tracks_non_rejected_donations() {
    let app = spawn_app().await;
    let admin = app.user("admin@example.com", Role::Admin).await;
    let donor = app.user("donor@example.com", Role::Donor).await;
    let campaign_id = campaign(&app, &admin, 1000.0).await;

    let first = donate(
        &app,
        &donor,
        json!({ "amount": 300.0, "donation_type": "general", "category": "monetary", "campaign_id": campaign_id }),
    )
    .await;
    donate(
        &app,
        &donor,
        json!({ "amount": 200.0, "donation_type": "general", "category": "monetary", "campaign_id": campaign_id }),
    )
    .await;

    let view = campaign_view(&app, campaign_id).await;
    assert_eq!(view["current_amount"], 500.0);
    assert_eq!(view["progress_percentage"], 50);
    assert_eq!(view["donation_count"], 2);

    let first_id = first["id"].as_i64().unwrap();
    set_donation_status(&app, &admin, first_id, "rejected").await;
    assert_eq!(campaign_view(&app, campaign_id).await["current_amount"], 200.0);

    // A repeated rejection must not debit the campaign twice.
    set_donation_status(&app, &admin, first_id, "rejected").await;
    assert_eq!(campaign_view(&app, campaign_id).await["current_amount"], 200.0);

    set_donation_status(&app, &admin, first_id, "verified").await;
    assert_eq!(campaign_view(&app, campaign_id).await["current_amount"], 500.0);
}

#[tokio::test]
async fn donations_to_closed_campaigns_are_refused() {
    let app = spawn_app().await;
    let admin = app.user("admin@example.com", Role::Admin).await;
    let donor = app.user("donor@example.com", Role::Donor).await;
    let campaign_id = campaign(&app, &admin, 500.0).await;

    let (status, _) = app
        .put(
            &format!("/api/v1/campaigns/{campaign_id}"),
            Some(&admin.token),
            json!({ "status": "cancelled" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post(
            "/api/v1/donations",
            Some(&donor.token),
            json!({ "amount": 50.0, "donation_type": "general", "category": "monetary", "campaign_id": campaign_id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(campaign_view(&app, campaign_id).await["current_amount"], 0.0);
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let app = spawn_app().await;
    let donor = app.user("donor@example.com", Role::Donor).await;

    let (status, body) = app
        .post(
            "/api/v1/donations",
            Some(&donor.token),
            json!({ "amount": 0.0, "donation_type": "general", "category": "monetary" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

async fn ledger_rows(app: &TestApp) -> (u64, u64) {
    let donations = donation::Entity::find().count(&app.state.db).await.unwrap();
    let deliveries = delivery::Entity::find().count(&app.state.db).await.unwrap();
    (donations, deliveries)
}

#[tokio::test]
async fn failed_donation_leaves_no_partial_rows() {
    let app = spawn_app().await;
    let donor = app.user("donor@example.com", Role::Donor).await;
    let in_kind = |campaign_id: Option<i64>| {
        json!({
            "amount": 80.0,
            "donation_type": "books",
            "category": "in_kind",
            "campaign_id": campaign_id
        })
    };

    let (status, body) = app
        .post("/api/v1/donations", Some(&donor.token), in_kind(Some(999)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    assert_eq!(ledger_rows(&app).await, (0, 0));

    // The delivery insert fails after the donation row is written.
    app.state
        .db
        .execute_unprepared("DROP TABLE delivery_status_history")
        .await
        .unwrap();
    app.state
        .db
        .execute_unprepared("DROP TABLE delivery_tracking")
        .await
        .unwrap();
    let (status, body) = app
        .post("/api/v1/donations", Some(&donor.token), in_kind(None))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{body}");
    let donations = donation::Entity::find().count(&app.state.db).await.unwrap();
    assert_eq!(donations, 0);
}

#[tokio::test]
async fn in_kind_donation_opens_a_tracked_delivery() {
    let app = spawn_app().await;
    let admin = app.user("admin@example.com", Role::Admin).await;
    let donor = app.user("donor@example.com", Role::Donor).await;

    let donation = donate(
        &app,
        &donor,
        json!({
            "amount": 120.0,
            "donation_type": "clothes",
            "category": "in_kind",
            "pickup_address": "12 Market Street"
        }),
    )
    .await;
    let donation_id = donation["id"].as_i64().unwrap();

    let (status, body) = app
        .get(&format!("/api/v1/donations/{donation_id}"), Some(&donor.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let delivery = &body["data"]["delivery"];
    assert_eq!(delivery["status"], "preparing");
    assert_eq!(delivery["pickup_address"], "12 Market Street");
    let delivery_id = delivery["id"].as_i64().unwrap();

    let (status, body) = app
        .put(
            &format!("/api/v1/deliveries/{delivery_id}"),
            Some(&admin.token),
            json!({ "status": "in_transit", "carrier": "DHL", "tracking_number": "TRK-1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "in_transit");

    let (status, body) = app
        .get(&format!("/api/v1/deliveries/{delivery_id}"), Some(&donor.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let history = body["data"]["status_history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["status"], "in_transit");
    assert_eq!(history[1]["status"], "preparing");

    // Going backwards is not a legal transition.
    let (status, _) = app
        .put(
            &format!("/api/v1/deliveries/{delivery_id}"),
            Some(&admin.token),
            json!({ "status": "preparing" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The donor was told about the shipment.
    let (_, body) = app.get("/api/v1/notifications", Some(&donor.token)).await;
    assert!(body["unread_count"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn donors_only_see_their_own_donations() {
    let app = spawn_app().await;
    let alice = app.user("alice@example.com", Role::Donor).await;
    let bob = app.user("bob@example.com", Role::Donor).await;

    let donation = donate(
        &app,
        &alice,
        json!({ "amount": 25.0, "donation_type": "general", "category": "monetary" }),
    )
    .await;
    donate(
        &app,
        &bob,
        json!({ "amount": 40.0, "donation_type": "general", "category": "monetary" }),
    )
    .await;

    let (status, _) = app
        .get(&format!("/api/v1/donations/{}", donation["id"]), Some(&bob.token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get("/api/v1/donations", Some(&bob.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["amount"], 40.0);
}

#[tokio::test]
async fn ledger_audit_detects_and_repairs_drift() {
    use hopeconnect::entities::campaign;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, sea_query::Expr};

    let app = spawn_app().await;
    let admin = app.user("admin@example.com", Role::Admin).await;
    let donor = app.user("donor@example.com", Role::Donor).await;
    let campaign_id = campaign(&app, &admin, 1000.0).await;
    donate(
        &app,
        &donor,
        json!({ "amount": 75.0, "donation_type": "general", "category": "monetary", "campaign_id": campaign_id }),
    )
    .await;

    campaign::Entity::update_many()
        .col_expr(campaign::Column::CurrentAmount, Expr::value(10.0))
        .filter(campaign::Column::Id.eq(campaign_id as i32))
        .exec(&app.state.db)
        .await
        .unwrap();

    let (status, body) = app.get("/api/v1/admin/ledger/audit", Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    let drift = &body["data"]["campaign_totals"][0];
    assert_eq!(drift["campaign_id"], campaign_id);
    assert_eq!(drift["recorded"], 10.0);
    assert_eq!(drift["expected"], 75.0);

    let (status, _) = app
        .post("/api/v1/admin/ledger/repair", Some(&admin.token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(campaign_view(&app, campaign_id).await["current_amount"], 75.0);

    let (_, body) = app.get("/api/v1/admin/ledger/audit", Some(&admin.token)).await;
    assert!(body["data"]["campaign_totals"].as_array().unwrap().is_empty());

    let (status, _) = app.get("/api/v1/admin/ledger/audit", Some(&donor.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

mod common;

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use salondesk::cache::ManualClock;
use salondesk::models::{AppointmentStatus, Role};

fn pinned_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap(),
    ))
}

#[actix_web::test]
async fn stats_require_an_admin() {
    let state = common::test_state().await;
    let app = test_app!(state);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/dashboard/stats").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let staff = common::create_user(&state, "Tina", "tina@b.c", Role::Staff).await;
    let (token, _) = common::open_session(&state, &staff, Role::Staff);
    let req = test::TestRequest::get()
        .uri("/api/dashboard/stats")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn the_report_counts_the_whole_shop() {
    let mut state = common::test_state().await;
    let clock = pinned_clock();
    state.clock = clock.clone();
    let app = test_app!(state);

    let admin = common::create_user(&state, "Root", "root@b.c", Role::Admin).await;
    let cleo = common::create_user(&state, "Cleo", "cleo@b.c", Role::Client).await;
    let bob = common::create_user(&state, "Bob", "bob@b.c", Role::Client).await;
    let tina = common::create_user(&state, "Tina", "tina@b.c", Role::Staff).await;
    let mona = common::create_user(&state, "Mona", "mona@b.c", Role::Staff).await;
    let haircut = common::create_service(&state, "Haircut", 25.0).await;
    let facial = common::create_service(&state, "Facial", 40.0).await;

    common::create_appointment(
        &state, &cleo, &tina, &haircut, "2026-09-01", "10:00", AppointmentStatus::Pending, 25.0,
    )
    .await;
    let done_haircut = common::create_appointment(
        &state, &bob, &tina, &haircut, "2026-08-20", "10:00", AppointmentStatus::Completed, 25.0,
    )
    .await;
    let done_facial = common::create_appointment(
        &state, &cleo, &mona, &facial, "2026-08-21", "11:00", AppointmentStatus::Completed, 40.0,
    )
    .await;
    common::create_appointment(
        &state, &bob, &mona, &facial, "2026-09-01", "12:00", AppointmentStatus::Cancelled, 40.0,
    )
    .await;
    common::create_appointment(
        &state, &cleo, &tina, &haircut, "2026-08-22", "13:00", AppointmentStatus::Confirmed, 25.0,
    )
    .await;
    common::insert_feedback(&state, &done_haircut, 4.0).await;
    common::insert_feedback(&state, &done_facial, 5.0).await;

    let (token, _) = common::open_session(&state, &admin, Role::Admin);
    let req = test::TestRequest::get()
        .uri("/api/dashboard/stats")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["cached"], false);

    let report = &body["data"];
    assert_eq!(report["total_clients"], 2);
    assert_eq!(report["total_staff"], 2);
    assert_eq!(report["total_appointments"], 5);
    assert_eq!(report["pending_appointments"], 1);
    assert_eq!(report["confirmed_appointments"], 1);
    assert_eq!(report["completed_appointments"], 2);
    assert_eq!(report["cancelled_appointments"], 1);
    // only completed bookings count towards revenue
    assert_eq!(report["total_revenue"], 65.0);
    assert_eq!(report["appointments_today"], 2);

    let top = report["top_services"].as_array().unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0]["name"], "Haircut");
    assert_eq!(top[0]["bookings"], 3);
    assert_eq!(top[1]["name"], "Facial");
    assert_eq!(top[1]["bookings"], 2);

    let service_ratings = report["service_ratings"].as_array().unwrap();
    assert_eq!(service_ratings[0]["name"], "Facial");
    assert_eq!(service_ratings[0]["avg_rating"], 5.0);
    assert_eq!(service_ratings[0]["ratings"], 1);
    assert_eq!(service_ratings[1]["name"], "Haircut");
    assert_eq!(service_ratings[1]["avg_rating"], 4.0);

    let staff_ratings = report["staff_ratings"].as_array().unwrap();
    assert_eq!(staff_ratings[0]["name"], "Mona");
    assert_eq!(staff_ratings[0]["avg_rating"], 5.0);
    assert_eq!(staff_ratings[1]["name"], "Tina");
    assert_eq!(staff_ratings[1]["avg_rating"], 4.0);
}

#[actix_web::test]
async fn reports_are_memoized_per_session() {
    let mut state = common::test_state().await;
    let clock = pinned_clock();
    state.clock = clock.clone();
    let app = test_app!(state);

    let admin = common::create_user(&state, "Root", "root@b.c", Role::Admin).await;
    let cleo = common::create_user(&state, "Cleo", "cleo@b.c", Role::Client).await;
    let tina = common::create_user(&state, "Tina", "tina@b.c", Role::Staff).await;
    let service = common::create_service(&state, "Haircut", 25.0).await;
    let (token, _) = common::open_session(&state, &admin, Role::Admin);

    let req = test::TestRequest::get()
        .uri("/api/dashboard/stats")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let first: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(first["cached"], false);
    assert_eq!(first["data"]["total_appointments"], 0);

    // writes inside the window are not visible
    common::create_appointment(
        &state, &cleo, &tina, &service, "2026-09-01", "10:00", AppointmentStatus::Pending, 25.0,
    )
    .await;
    clock.advance_secs(29);
    let req = test::TestRequest::get()
        .uri("/api/dashboard/stats")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let second: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(second["cached"], true);
    assert_eq!(second["data"], first["data"]);

    // a different session computes its own report
    let (other_token, _) = common::open_session(&state, &admin, Role::Admin);
    let req = test::TestRequest::get()
        .uri("/api/dashboard/stats")
        .insert_header(("Authorization", format!("Bearer {other_token}")))
        .to_request();
    let other: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(other["cached"], false);
    assert_eq!(other["data"]["total_appointments"], 1);

    clock.advance_secs(1);
    let req = test::TestRequest::get()
        .uri("/api/dashboard/stats")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let third: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(third["cached"], false);
    assert_eq!(third["data"]["total_appointments"], 1);
}

#[actix_web::test]
async fn parameter_admins_always_recompute() {
    let state = common::test_state().await;
    let app = test_app!(state);

    let admin = common::create_user(&state, "Root", "root@b.c", Role::Admin).await;

    for _ in 0..2 {
        let req = test::TestRequest::get()
            .uri(&format!("/api/dashboard/stats?user_id={admin}&role=admin"))
            .to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["cached"], false);
    }
}

#[actix_web::test]
async fn logging_out_drops_the_memo() {
    let state = common::test_state().await;
    let app = test_app!(state);

    let admin = common::create_user(&state, "Root", "root@b.c", Role::Admin).await;
    let (token, csrf) = common::open_session(&state, &admin, Role::Admin);

    let req = test::TestRequest::get()
        .uri("/api/dashboard/stats")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    assert!(state.dashboard_cache.get(&token, state.clock.now_utc()).is_some());

    let req = test::TestRequest::post()
        .uri("/api/logout")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .insert_header(("X-Csrf-Token", csrf))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    assert!(state.dashboard_cache.get(&token, state.clock.now_utc()).is_none());
}

//! Router-level tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Datelike, NaiveDate, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use tutora_shared::Role;
use tutora_store::{Account, Database, NewAccount};

use super::{build_router, AppState};
use crate::auth::issue_token;
use crate::config::ServerConfig;
use crate::notify::tests::RecordingMailer;
use crate::notify::Notifier;
use crate::rooms::InMemoryRooms;

struct TestApp {
    router: Router,
    state: AppState,
    mailer: Arc<RecordingMailer>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    fn with_config(config: ServerConfig) -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(
            Database::open_in_memory().unwrap(),
            config,
            Notifier::new(mailer.clone(), "Tutora <test@tutora.local>"),
            Arc::new(InMemoryRooms::new()),
        );
        Self {
            router: build_router(state.clone()),
            state,
            mailer,
        }
    }

    /// Insert an account directly and return it with a bearer token.
    fn account(&self, role: Role, email: &str) -> (Account, String) {
        let mut new = NewAccount::new("Test User", email, "unused", role);
        if role == Role::Teacher {
            new.subjects = vec!["Math".into(), "Physics".into()];
            new.hourly_rate = Some(40.0);
        }
        let account = self
            .state
            .with_db(|db| Ok(db.create_account(&new)?))
            .unwrap();
        let token = issue_token(&account, &self.state.config).unwrap();
        (account, token)
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(token), Some(body)).await
    }
}

/// A date at least a week ahead that falls on `weekday` (0 = Sunday).
fn upcoming(weekday: u32) -> NaiveDate {
    let mut date = Utc::now().date_naive() + chrono::Duration::days(7);
    while date.weekday().num_days_from_sunday() != weekday {
        date += chrono::Duration::days(1);
    }
    date
}

async fn monday_slot(app: &TestApp, teacher_token: &str) {
    let (status, body) = app
        .post(
            "/api/availability",
            teacher_token,
            json!({ "dayOfWeek": 1, "startTime": "09:00", "endTime": "12:00" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

async fn book(app: &TestApp, token: &str, teacher: &Account, date: NaiveDate, start: &str, duration: u32) -> (StatusCode, Value) {
    app.post(
        "/api/bookings",
        token,
        json!({
            "teacherId": teacher.id,
            "subject": "Math",
            "date": date.to_string(),
            "startTime": start,
            "duration": duration,
        }),
    )
    .await
}

// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_and_unknown_route() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");

    let (status, body) = app.get("/api/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "message": "Route not found" }));
}

#[tokio::test]
async fn register_login_and_me() {
    let app = TestApp::new();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Sam Student",
                "email": "Sam@Example.com",
                "password": "secret1",
                "role": "student",
                "grade": "10",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["account"]["email"], "sam@example.com");
    assert!(body["data"]["account"].get("passwordHash").is_none());
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "student");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "sam@example.com", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "sam@example.com", "password": "wrong!" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Sam Again",
                "email": "sam@example.com",
                "password": "secret1",
                "grade": "11",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email is already registered");
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/api/auth/me", Some("not.a.jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn booking_lifecycle_end_to_end() {
    let app = TestApp::new();
    let (teacher, t_token) = app.account(Role::Teacher, "tess@x.io");
    let (student, s_token) = app.account(Role::Student, "sam@x.io");
    let (_, other_token) = app.account(Role::Student, "olga@x.io");
    monday_slot(&app, &t_token).await;
    let monday = upcoming(1);

    // Book 10:00 for an hour.
    let (status, body) = book(&app, &s_token, &teacher, monday, "10:00", 60).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let booking = &body["data"];
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["endTime"], "11:00");
    assert_eq!(booking["amount"], 40.0);
    assert_eq!(booking["student"]["id"], json!(student.id));
    assert!(booking["meetingLink"]
        .as_str()
        .unwrap()
        .starts_with("https://meet.jit.si/class-"));
    let id = booking["id"].as_str().unwrap().to_string();

    // Overlapping request from another student.
    let (status, body) = book(&app, &other_token, &teacher, monday, "10:30", 60).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Time slot is already booked");

    // Outside the slot.
    let (status, body) = book(&app, &other_token, &teacher, monday, "11:30", 60).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Teacher is not available at the selected time");

    // Illegal jump straight to completed.
    let (status, _) = app
        .put(&format!("/api/bookings/{id}/status"), &t_token, json!({ "status": "completed" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Review before completion.
    let (status, body) = app
        .post(&format!("/api/bookings/{id}/review"), &s_token, json!({ "rating": 5 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Can only review completed bookings");

    for next in ["confirmed", "completed"] {
        let (status, body) = app
            .put(
                &format!("/api/bookings/{id}/status"),
                &t_token,
                json!({ "status": next, "teacherNotes": "Worked on fractions" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["status"], next);
    }

    let (status, body) = app
        .post(
            &format!("/api/bookings/{id}/review"),
            &s_token,
            json!({ "rating": 5, "review": "Great class" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["rating"], 5);

    let (_, body) = app.get(&format!("/api/teachers/{}", teacher.id), None).await;
    assert_eq!(body["data"]["rating"], 5.0);
    assert_eq!(body["data"]["totalReviews"], 1);

    let (status, body) = app
        .post(&format!("/api/bookings/{id}/review"), &s_token, json!({ "rating": 1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Booking already reviewed");

    // Completed bookings cannot be cancelled.
    let (status, body) = app
        .put(&format!("/api/bookings/{id}/cancel"), &s_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Booking cannot be cancelled");

    // Both notifications went out in the background.
    for _ in 0..50 {
        if app.mailer.sent.lock().unwrap().len() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let sent = app.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, "sam@x.io");
    assert_eq!(sent[1].to, "tess@x.io");
}

#[tokio::test]
async fn booking_rules_and_permissions() {
    let app = TestApp::new();
    let (teacher, t_token) = app.account(Role::Teacher, "tess@x.io");
    let (_, s_token) = app.account(Role::Student, "sam@x.io");
    let (_, other_token) = app.account(Role::Student, "olga@x.io");
    monday_slot(&app, &t_token).await;

    // Teachers cannot book.
    let (status, body) = book(&app, &t_token, &teacher, upcoming(1), "09:00", 30).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not authorized");

    // Today is not bookable.
    let today = Utc::now().date_naive();
    let (status, body) = book(&app, &s_token, &teacher, today, "09:00", 30).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot book classes in the past");

    // Crossing midnight.
    let (status, body) = book(&app, &s_token, &teacher, upcoming(1), "23:30", 60).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "duration");

    // Unknown teacher.
    let ghost = Account {
        id: uuid::Uuid::new_v4(),
        ..teacher.clone()
    };
    let (status, body) = book(&app, &s_token, &ghost, upcoming(1), "09:00", 30).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Teacher not found");

    // Field validation.
    let (status, body) = app
        .post("/api/bookings", &s_token, json!({ "teacherId": "x", "duration": 5 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"].as_array().unwrap().len() >= 4);

    let (status, body) = book(&app, &s_token, &teacher, upcoming(1), "09:00", 30).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    // Outsiders cannot see or cancel it.
    let (status, _) = app.get(&format!("/api/bookings/{id}"), Some(&other_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .put(&format!("/api/bookings/{id}/cancel"), &other_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Students cannot drive status.
    let (status, _) = app
        .put(&format!("/api/bookings/{id}/status"), &s_token, json!({ "status": "confirmed" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Cancelling frees the window.
    let (status, body) = app
        .put(&format!("/api/bookings/{id}/cancel"), &s_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");
    let (status, _) = book(&app, &other_token, &teacher, upcoming(1), "09:00", 30).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.get("/api/bookings/not-a-uuid", Some(&s_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn booking_lists_are_scoped() {
    let app = TestApp::new();
    let (teacher, t_token) = app.account(Role::Teacher, "tess@x.io");
    let (_, s_token) = app.account(Role::Student, "sam@x.io");
    let (_, other_token) = app.account(Role::Student, "olga@x.io");
    let (_, admin_token) = app.account(Role::Admin, "root@x.io");
    monday_slot(&app, &t_token).await;

    book(&app, &s_token, &teacher, upcoming(1), "11:00", 30).await;
    book(&app, &s_token, &teacher, upcoming(1), "09:00", 30).await;
    book(&app, &other_token, &teacher, upcoming(1), "10:00", 30).await;

    let (_, body) = app.get("/api/bookings", Some(&s_token)).await;
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["data"][0]["startTime"], "09:00");

    let (_, body) = app.get("/api/bookings?limit=2&page=2", Some(&t_token)).await;
    assert_eq!(body["pagination"], json!({ "current": 2, "pages": 2, "total": 3 }));
    assert_eq!(body["data"][0]["startTime"], "11:00");

    let (_, body) = app.get("/api/bookings?status=confirmed", Some(&admin_token)).await;
    assert_eq!(body["pagination"]["total"], 0);
    let (_, body) = app.get("/api/bookings", Some(&admin_token)).await;
    assert_eq!(body["pagination"]["total"], 3);

    let (status, _) = app.get("/api/bookings?status=finished", Some(&s_token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn availability_management() {
    let app = TestApp::new();
    let (teacher, t_token) = app.account(Role::Teacher, "tess@x.io");
    let (_, other_t_token) = app.account(Role::Teacher, "tom@x.io");
    let (_, s_token) = app.account(Role::Student, "sam@x.io");

    // Students cannot manage slots.
    let (status, _) = app
        .post(
            "/api/availability",
            &s_token,
            json!({ "dayOfWeek": 1, "startTime": "09:00", "endTime": "10:00" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    monday_slot(&app, &t_token).await;
    let (status, body) = app
        .post(
            "/api/availability",
            &t_token,
            json!({ "dayOfWeek": 1, "startTime": "09:00", "endTime": "12:00" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Time slot already exists");

    let (status, body) = app
        .post(
            "/api/availability",
            &t_token,
            json!({ "dayOfWeek": 3, "startTime": "14:00", "endTime": "13:00" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "End time must be after start time");

    let (_, body) = app.get("/api/availability", Some(&t_token)).await;
    let grouped = body["data"].as_object().unwrap();
    assert_eq!(grouped.len(), 7);
    assert_eq!(grouped["1"].as_array().unwrap().len(), 1);
    assert!(grouped["0"].as_array().unwrap().is_empty());
    let slot_id = grouped["1"][0]["id"].as_str().unwrap().to_string();

    // Only the owner may touch a slot.
    let (status, _) = app
        .put(&format!("/api/availability/{slot_id}"), &other_t_token, json!({ "isAvailable": false }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put(
            &format!("/api/availability/{slot_id}"),
            &t_token,
            json!({ "endTime": "08:00" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = app
        .put(&format!("/api/availability/{slot_id}"), &t_token, json!({ "isAvailable": false }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isAvailable"], false);

    // Public reads: the raw list includes unavailable slots, the schedule does not.
    let (_, body) = app
        .get(&format!("/api/availability/teacher/{}?dayOfWeek=1", teacher.id), None)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (_, body) = app.get(&format!("/api/teachers/{}/schedule", teacher.id), None).await;
    assert!(body["data"]["1"].as_array().unwrap().is_empty());

    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/api/availability/{slot_id}"),
            Some(&t_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Availability slot deleted");

    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/api/availability/{slot_id}"),
            Some(&t_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Availability slot not found");
}

#[tokio::test]
async fn bulk_replace_is_all_or_nothing() {
    let app = TestApp::new();
    let (teacher, t_token) = app.account(Role::Teacher, "tess@x.io");
    monday_slot(&app, &t_token).await;

    let (status, body) = app
        .post(
            "/api/availability/bulk",
            &t_token,
            json!({ "slots": [
                { "dayOfWeek": 2, "startTime": "09:00", "endTime": "10:00" },
                { "dayOfWeek": 9, "startTime": "09:00", "endTime": "10:00" },
            ]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "slots[1].dayOfWeek");

    let (_, body) = app
        .get(&format!("/api/availability/teacher/{}", teacher.id), None)
        .await;
    assert_eq!(body["data"][0]["dayOfWeek"], 1);

    let (status, body) = app
        .post(
            "/api/availability/bulk",
            &t_token,
            json!({ "slots": [
                { "dayOfWeek": 5, "startTime": "15:00", "endTime": "16:00" },
                { "dayOfWeek": 2, "startTime": "09:00", "endTime": "10:00" },
            ]}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"][0]["dayOfWeek"], 2);

    let (_, body) = app
        .get(&format!("/api/availability/teacher/{}", teacher.id), None)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = app.post("/api/availability/bulk", &t_token, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Slots must be an array");
}

#[tokio::test]
async fn teacher_directory() {
    let app = TestApp::new();
    let (tess, t_token) = app.account(Role::Teacher, "tess@x.io");
    app.account(Role::Teacher, "tom@x.io");
    app.account(Role::Teacher, "tina@x.io");
    app.account(Role::Student, "sam@x.io");
    monday_slot(&app, &t_token).await;

    let (status, body) = app.get("/api/teachers?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"], json!({ "current": 1, "pages": 2, "total": 3 }));

    let (_, body) = app.get("/api/teachers?subject=phys&maxPrice=30", None).await;
    assert_eq!(body["pagination"]["total"], 0);

    let (_, body) = app.get("/api/teachers/subjects/popular", None).await;
    assert_eq!(body["data"][0]["count"], 3);

    let (status, body) = app
        .get(&format!("/api/teachers/{}/availability?date={}", tess.id, upcoming(1)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["startTime"], "09:00");

    let (status, body) = app
        .get(&format!("/api/teachers/{}/availability", tess.id), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Date parameter is required");

    let (status, _) = app
        .get(&format!("/api/teachers/{}", uuid::Uuid::new_v4()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_query_filters_are_ignored() {
    let app = TestApp::new();
    let (tess, t_token) = app.account(Role::Teacher, "tess@x.io");
    let (_, s_token) = app.account(Role::Student, "sam@x.io");
    app.account(Role::Teacher, "tom@x.io");
    monday_slot(&app, &t_token).await;

    let (status, body) = app
        .get("/api/teachers?subject=&minRating=&maxPrice=&page=&limit=", None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["pagination"]["total"], 2);

    let (status, body) = app
        .get(&format!("/api/availability/teacher/{}?dayOfWeek=", tess.id), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .get("/api/bookings?status=&page=&limit=", Some(&s_token))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Non-blank garbage is still rejected.
    let (status, _) = app.get("/api/teachers?minRating=high", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_endpoints() {
    let app = TestApp::new();
    let (tess, _) = app.account(Role::Teacher, "tess@x.io");
    let (_, s_token) = app.account(Role::Student, "sam@x.io");
    let (_, admin_token) = app.account(Role::Admin, "root@x.io");

    let (status, _) = app.get("/api/users/stats/overview", Some(&s_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put(&format!("/api/users/{}/verify", tess.id), &admin_token, json!({ "isVerified": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isVerified"], true);

    let (status, body) = app.get("/api/users/stats/overview", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalUsers"], 3);
    assert_eq!(body["data"]["totalTeachers"], 1);
    assert_eq!(body["data"]["verifiedTeachers"], 1);
    assert_eq!(body["data"]["recentRegistrations"], 3);
}

#[tokio::test]
async fn admin_bootstrap_runs_once() {
    let config = ServerConfig {
        admin_email: Some("root@x.io".into()),
        admin_password: Some("rootpass".into()),
        ..ServerConfig::default()
    };
    let app = TestApp::with_config(config);

    super::bootstrap_admin(&app.state).await.unwrap();
    super::bootstrap_admin(&app.state).await.unwrap();

    let admin = app
        .state
        .with_db(|db| Ok(db.find_account_by_email("root@x.io")?))
        .unwrap()
        .unwrap();
    assert_eq!(admin.role, Role::Admin);
    let total = app
        .state
        .with_db(|db| Ok(db.overview(Utc::now())?))
        .unwrap()
        .total_users;
    assert_eq!(total, 1);
}

#[tokio::test]
async fn video_room_requires_confirmed_booking() {
    let app = TestApp::new();
    let (teacher, t_token) = app.account(Role::Teacher, "tess@x.io");
    let (student, s_token) = app.account(Role::Student, "sam@x.io");
    let (_, other_token) = app.account(Role::Student, "olga@x.io");
    monday_slot(&app, &t_token).await;

    let (_, body) = book(&app, &s_token, &teacher, upcoming(1), "09:00", 60).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post(&format!("/api/rooms/{id}/join"), &s_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.put(&format!("/api/bookings/{id}/status"), &t_token, json!({ "status": "confirmed" }))
        .await;

    let (status, _) = app
        .post(&format!("/api/rooms/{id}/join"), &other_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(&format!("/api/rooms/{id}/join"), &s_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["participants"], json!([student.id]));

    app.post(&format!("/api/rooms/{id}/join"), &t_token, json!({})).await;
    let (_, body) = app.get(&format!("/api/rooms/{id}"), Some(&t_token)).await;
    assert_eq!(body["data"]["participants"].as_array().unwrap().len(), 2);

    let (_, body) = app
        .post(&format!("/api/rooms/{id}/leave"), &s_token, json!({}))
        .await;
    assert_eq!(body["data"]["participants"], json!([teacher.id]));
}

#[tokio::test]
async fn rate_limit_skips_auth_routes() {
    let config = ServerConfig {
        rate_limit_max: 2,
        ..ServerConfig::default()
    };
    let app = TestApp::with_config(config);

    let from_client = |uri: &str| {
        Request::builder()
            .uri(uri)
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap()
    };

    for _ in 0..2 {
        let resp = app.router.clone().oneshot(from_client("/api/teachers")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let resp = app.router.clone().oneshot(from_client("/api/teachers")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    let resp = app.router.clone().oneshot(from_client("/api/auth/me")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

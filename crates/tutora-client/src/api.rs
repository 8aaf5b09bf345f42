//! Thin typed wrapper over the REST API.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;
use tutora_shared::{BookingStatus, PageInfo, Role, TimeOfDay};
use tutora_store::{Account, AvailabilitySlot, BookingDetails, ProfileUpdate, SlotSpec};
use uuid::Uuid;

use crate::error::{ClientError, Result};

/// Body of `POST /api/auth/register`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
}

/// Body of `POST /api/bookings`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub teacher_id: Uuid,
    pub subject: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body of `PUT /api/availability/:id`; `None` keeps the current value.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<TimeOfDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<TimeOfDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub account: Account,
}

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
    pagination: Option<PageInfo>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody<'a> {
    status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    teacher_notes: Option<&'a str>,
}

#[derive(Serialize)]
struct BulkSlots<'a> {
    slots: &'a [SlotSpec],
}

#[derive(Serialize)]
struct ReviewBody<'a> {
    rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    review: Option<&'a str>,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:5000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, self.url(path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<(T, Option<PageInfo>)> {
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        debug!(status, bytes = body.len(), "API response");
        decode(status, &body)
    }

    async fn data<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        self.send(req).await.map(|(data, _)| data)
    }

    async fn page<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Page<T>> {
        let (items, pagination) = self.send::<Vec<T>>(req).await?;
        let pagination = pagination.unwrap_or(PageInfo {
            current: 1,
            pages: 1,
            total: items.len() as u64,
        });
        Ok(Page { items, pagination })
    }

    // -- auth ---------------------------------------------------------------

    pub async fn register(&self, registration: &Registration) -> Result<AuthResponse> {
        self.data(self.request(Method::POST, "/auth/register").json(registration))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        self.data(
            self.request(Method::POST, "/auth/login")
                .json(&Credentials { email, password }),
        )
        .await
    }

    pub async fn me(&self) -> Result<Account> {
        self.data(self.request(Method::GET, "/auth/me")).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Account> {
        self.data(self.request(Method::PUT, "/auth/profile").json(update))
            .await
    }

    // -- teachers -----------------------------------------------------------

    pub async fn list_teachers(
        &self,
        subject: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<Page<Account>> {
        let mut query = vec![("page", page.to_string()), ("limit", limit.to_string())];
        if let Some(subject) = subject {
            query.push(("subject", subject.to_string()));
        }
        self.page(self.request(Method::GET, "/teachers").query(&query))
            .await
    }

    pub async fn get_teacher(&self, id: Uuid) -> Result<Account> {
        self.data(self.request(Method::GET, &format!("/teachers/{id}")))
            .await
    }

    /// Open slots for the weekday `date` falls on.
    pub async fn teacher_availability(
        &self,
        id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<AvailabilitySlot>> {
        self.data(
            self.request(Method::GET, &format!("/teachers/{id}/availability"))
                .query(&[("date", date.to_string())]),
        )
        .await
    }

    // -- bookings -----------------------------------------------------------

    pub async fn create_booking(&self, booking: &BookingRequest) -> Result<BookingDetails> {
        self.data(self.request(Method::POST, "/bookings").json(booking))
            .await
    }

    pub async fn list_bookings(
        &self,
        status: Option<BookingStatus>,
        page: u32,
        limit: u32,
    ) -> Result<Page<BookingDetails>> {
        let mut query = vec![("page", page.to_string()), ("limit", limit.to_string())];
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }
        self.page(self.request(Method::GET, "/bookings").query(&query))
            .await
    }

    pub async fn get_booking(&self, id: Uuid) -> Result<BookingDetails> {
        self.data(self.request(Method::GET, &format!("/bookings/{id}")))
            .await
    }

    /// Teacher-side transition (confirm, complete, cancel, no-show).
    pub async fn update_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        teacher_notes: Option<&str>,
    ) -> Result<BookingDetails> {
        self.data(
            self.request(Method::PUT, &format!("/bookings/{id}/status"))
                .json(&StatusBody {
                    status,
                    teacher_notes,
                }),
        )
        .await
    }

    pub async fn cancel_booking(&self, id: Uuid) -> Result<BookingDetails> {
        self.data(
            self.request(Method::PUT, &format!("/bookings/{id}/cancel"))
                .json(&serde_json::json!({})),
        )
        .await
    }

    pub async fn review_booking(
        &self,
        id: Uuid,
        rating: u8,
        review: Option<&str>,
    ) -> Result<BookingDetails> {
        self.data(
            self.request(Method::POST, &format!("/bookings/{id}/review"))
                .json(&ReviewBody { rating, review }),
        )
        .await
    }

    // -- availability (teacher) ---------------------------------------------

    /// The caller's own slots keyed by weekday (0 = Sunday).
    pub async fn my_availability(&self) -> Result<BTreeMap<u8, Vec<AvailabilitySlot>>> {
        self.data(self.request(Method::GET, "/availability")).await
    }

    /// Every slot of a teacher, available or not.
    pub async fn teacher_slots(
        &self,
        teacher_id: Uuid,
        day_of_week: Option<u8>,
    ) -> Result<Vec<AvailabilitySlot>> {
        let mut req = self.request(Method::GET, &format!("/availability/teacher/{teacher_id}"));
        if let Some(day) = day_of_week {
            req = req.query(&[("dayOfWeek", day)]);
        }
        self.data(req).await
    }

    pub async fn create_slot(&self, slot: &SlotSpec) -> Result<AvailabilitySlot> {
        self.data(self.request(Method::POST, "/availability").json(slot))
            .await
    }

    pub async fn update_slot(&self, id: Uuid, changes: &SlotChanges) -> Result<AvailabilitySlot> {
        self.data(
            self.request(Method::PUT, &format!("/availability/{id}"))
                .json(changes),
        )
        .await
    }

    pub async fn delete_slot(&self, id: Uuid) -> Result<()> {
        self.send::<Option<serde_json::Value>>(
            self.request(Method::DELETE, &format!("/availability/{id}")),
        )
        .await
        .map(|_| ())
    }

    /// Replace all of the caller's slots; nothing changes if any is invalid.
    pub async fn replace_slots(&self, slots: &[SlotSpec]) -> Result<Vec<AvailabilitySlot>> {
        self.data(
            self.request(Method::POST, "/availability/bulk")
                .json(&BulkSlots { slots }),
        )
        .await
    }
}

/// Unwrap the response envelope, turning `success: false` bodies into
/// [`ClientError::Api`].
fn decode<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<(T, Option<PageInfo>)> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_slice::<ErrorEnvelope>(body)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| format!("Request failed with status {status}"));
        return Err(ClientError::Api { status, message });
    }
    let envelope: Envelope<T> = serde_json::from_slice(body)?;
    Ok((envelope.data, envelope.pagination))
}

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::extract::AppJson,
    error::{AppError, AppResult},
    models::{DeliveryReport, Notification, ScheduleEntry, ScheduleTime},
    services::scheduler::ScheduleHandle,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct SendNotificationRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendNotificationResponse {
    pub message: String,
    pub report: DeliveryReport,
}

/// Title and body must be present and non-empty.
fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn send_notification(
    State(state): State<AppState>,
    AppJson(req): AppJson<SendNotificationRequest>,
) -> AppResult<Json<SendNotificationResponse>> {
    let (Some(title), Some(body)) = (required(req.title), required(req.message)) else {
        return Err(AppError::InvalidInput(
            "Title and message are required fields.".to_string(),
        ));
    };

    let notification = Notification::new(title, body)
        .with_link(req.link)
        .with_image(req.image);

    let report = state.dispatcher.broadcast(&notification).await?;

    Ok(Json(SendNotificationResponse {
        message: "Notifications sent successfully".to_string(),
        report,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ScheduleNotificationRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "scheduleTime")]
    pub schedule_time: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleNotificationResponse {
    pub message: String,
    pub id: ScheduleHandle,
    pub cron: String,
}

pub async fn schedule_notification(
    State(state): State<AppState>,
    AppJson(req): AppJson<ScheduleNotificationRequest>,
) -> AppResult<Json<ScheduleNotificationResponse>> {
    let (Some(title), Some(body), Some(schedule_time)) = (
        required(req.title),
        required(req.message),
        required(req.schedule_time),
    ) else {
        return Err(AppError::InvalidInput(
            "Title, message, and scheduleTime are required.".to_string(),
        ));
    };

    let time = ScheduleTime::parse(&schedule_time)?;
    let notification = Notification::new(title, body)
        .with_link(req.link)
        .with_image(req.image);

    let id = state.scheduler.schedule(notification, time).await?;

    Ok(Json(ScheduleNotificationResponse {
        message: "Notification scheduled successfully".to_string(),
        id,
        cron: time.cron_expression(),
    }))
}

pub async fn list_schedules(State(state): State<AppState>) -> Json<Vec<ScheduleEntry>> {
    Json(state.scheduler.entries().await)
}

/// Run a schedule's broadcast now without waiting for its daily time.
pub async fn fire_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SendNotificationResponse>> {
    let report = state.scheduler.fire(ScheduleHandle(id)).await?;

    Ok(Json(SendNotificationResponse {
        message: "Notifications sent successfully".to_string(),
        report,
    }))
}

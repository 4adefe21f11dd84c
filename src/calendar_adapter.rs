use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::config::CalendarConfig;
use crate::error::{TaskError, TaskResult};
use crate::event_parser::{EventDetails, ReminderMethod};

pub const CALENDAR_CREDENTIAL_HINT: &str =
    "Set GOOGLE_CALENDAR_TOKEN (or calendar.access_token in the config file) to an OAuth access token with calendar scope.";

/// Summary of a created event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub id: String,
    #[serde(rename = "htmlLink", default)]
    pub html_link: Option<String>,
}

/// Query for upcoming events
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub time_min: String,
    pub max_results: u32,
    pub order_by: String,
}

/// The calendar operations the executor needs
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn insert_event(&self, calendar_id: &str, event: &Value) -> TaskResult<CreatedEvent>;
    async fn list_events(&self, calendar_id: &str, query: &EventQuery) -> TaskResult<Value>;
    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> TaskResult<()>;
    async fn patch_event(&self, calendar_id: &str, event_id: &str, fields: &Value) -> TaskResult<Value>;
}

/// Build the `events.insert` body, attaching the zone to the naive times
pub fn event_request_body(event: &EventDetails, timezone: &str) -> Value {
    let overrides: Vec<Value> = event
        .reminders
        .iter()
        .map(|r| {
            json!({
                "method": match r.method {
                    ReminderMethod::Popup => "popup",
                    ReminderMethod::Email => "email",
                },
                "minutes": r.minutes,
            })
        })
        .collect();

    json!({
        "summary": event.summary,
        "description": event.description,
        "start": {"dateTime": event.start_time, "timeZone": timezone},
        "end": {"dateTime": event.end_time, "timeZone": timezone},
        "reminders": {"useDefault": false, "overrides": overrides},
    })
}

/// Patch body carrying only the fields that changed
pub fn patch_request_body(
    summary: Option<&str>,
    start_time: Option<&str>,
    end_time: Option<&str>,
    timezone: &str,
) -> Value {
    let mut fields = Map::new();
    if let Some(summary) = summary {
        fields.insert("summary".to_string(), json!(summary));
    }
    if let Some(start) = start_time {
        fields.insert("start".to_string(), json!({"dateTime": start, "timeZone": timezone}));
    }
    if let Some(end) = end_time {
        fields.insert("end".to_string(), json!({"dateTime": end, "timeZone": timezone}));
    }
    Value::Object(fields)
}

/// Google Calendar v3 REST client
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    client: Client,
    api_url: String,
    access_token: String,
}

impl GoogleCalendarClient {
    pub fn new(config: &CalendarConfig, timeout: Duration) -> TaskResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone().unwrap_or_default(),
        })
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!("{}/calendars/{}/events", self.api_url, urlencoding::encode(calendar_id))
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!("{}/{}", self.events_url(calendar_id), urlencoding::encode(event_id))
    }

    async fn send(&self, request: RequestBuilder) -> TaskResult<reqwest::Response> {
        let response = request
            .header("Authorization", format!("Bearer {}", self.access_token))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TaskError::from_status(status, &error_text, CALENDAR_CREDENTIAL_HINT));
        }

        Ok(response)
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarClient {
    async fn insert_event(&self, calendar_id: &str, event: &Value) -> TaskResult<CreatedEvent> {
        let response = self
            .send(self.client.post(self.events_url(calendar_id)).json(event))
            .await?;
        Ok(response.json().await?)
    }

    async fn list_events(&self, calendar_id: &str, query: &EventQuery) -> TaskResult<Value> {
        let max_results = query.max_results.to_string();
        let request = self.client.get(self.events_url(calendar_id)).query(&[
            ("timeMin", query.time_min.as_str()),
            ("maxResults", max_results.as_str()),
            ("orderBy", query.order_by.as_str()),
            ("singleEvents", "true"),
        ]);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> TaskResult<()> {
        self.send(self.client.delete(self.event_url(calendar_id, event_id)))
            .await?;
        Ok(())
    }

    async fn patch_event(&self, calendar_id: &str, event_id: &str, fields: &Value) -> TaskResult<Value> {
        let response = self
            .send(self.client.patch(self.event_url(calendar_id, event_id)).json(fields))
            .await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_parser::Reminder;

    #[test]
    fn test_event_body_carries_timezone_not_offsets() {
        let event = EventDetails {
            summary: "Design review".to_string(),
            description: "Quarterly design review".to_string(),
            start_time: "2025-11-07T05:30:00".to_string(),
            end_time: "2025-11-07T06:10:00".to_string(),
            reminders: vec![
                Reminder::popup(15),
                Reminder {
                    method: ReminderMethod::Email,
                    minutes: 60,
                },
            ],
        };

        let body = event_request_body(&event, "Asia/Kolkata");
        assert_eq!(body["start"]["dateTime"], "2025-11-07T05:30:00");
        assert_eq!(body["start"]["timeZone"], "Asia/Kolkata");
        assert_eq!(body["end"]["dateTime"], "2025-11-07T06:10:00");
        assert_eq!(body["reminders"]["useDefault"], false);
        assert_eq!(body["reminders"]["overrides"][1]["method"], "email");
        assert_eq!(body["reminders"]["overrides"][1]["minutes"], 60);
    }

    #[test]
    fn test_patch_body_only_includes_given_fields() {
        let body = patch_request_body(Some("Renamed"), None, None, "UTC");
        assert_eq!(body, json!({"summary": "Renamed"}));

        let body = patch_request_body(None, Some("2025-11-07T10:00:00"), Some("2025-11-07T11:00:00"), "UTC");
        assert_eq!(body["start"]["timeZone"], "UTC");
        assert!(body.get("summary").is_none());
    }

    #[test]
    fn test_urls_encode_calendar_ids() {
        let client = GoogleCalendarClient::new(&CalendarConfig::default(), Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.events_url("team@example.com"),
            "https://www.googleapis.com/calendar/v3/calendars/team%40example.com/events"
        );
        assert_eq!(
            client.event_url("primary", "abc123"),
            "https://www.googleapis.com/calendar/v3/calendars/primary/events/abc123"
        );
    }

    #[test]
    fn test_created_event_deserializes_html_link() {
        let created: CreatedEvent =
            serde_json::from_value(json!({"id": "evt1", "htmlLink": "https://calendar.google.com/e/1", "status": "confirmed"}))
                .unwrap();
        assert_eq!(created.id, "evt1");
        assert_eq!(created.html_link.as_deref(), Some("https://calendar.google.com/e/1"));
    }
}

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::{TaskError, TaskResult};
use crate::llm_client::{ChatMessage, LLMClient};
use crate::temporal::{self, format_naive, parse_naive, resolve_timezone, strip_offset, tomorrow_at};

pub const DEFAULT_SUMMARY: &str = "New Event";
pub const DEFAULT_REMINDER_MINUTES: u32 = 15;
const FALLBACK_SUMMARY_CHARS: usize = 50;
const REPAIR_TIME: &str = "14:00:00";
const DEFAULT_START_HOUR: u32 = 9;
const REPAIR_START_HOUR: u32 = 14;

const SYSTEM_PROMPT: &str = "You are a calendar assistant that extracts event details from natural language. \
Reply with a single JSON object and nothing else.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMethod {
    Popup,
    Email,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub method: ReminderMethod,
    pub minutes: u32,
}

impl Reminder {
    pub fn popup(minutes: u32) -> Self {
        Self {
            method: ReminderMethod::Popup,
            minutes,
        }
    }
}

/// Normalized parameters for creating a calendar event.
///
/// `start_time` and `end_time` are naive wall-clock strings; the configured
/// timezone is attached when the event is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    pub summary: String,
    pub description: String,
    pub start_time: String,
    pub end_time: String,
    pub reminders: Vec<Reminder>,
}

/// Turns a free-text request into [`EventDetails`] through a language model,
/// falling back to fixed defaults whenever the model cannot help.
pub struct NaturalLanguageEventParser {
    llm_client: Option<Arc<dyn LLMClient>>,
    model: String,
}

impl NaturalLanguageEventParser {
    pub fn new(llm_client: Option<Arc<dyn LLMClient>>, model: impl Into<String>) -> Self {
        Self {
            llm_client,
            model: model.into(),
        }
    }

    /// Parser with no model attached; every call takes the fallback path
    pub fn offline() -> Self {
        Self::new(None, "")
    }

    pub fn has_model(&self) -> bool {
        self.llm_client.is_some()
    }

    pub async fn parse(&self, description: &str, now: DateTime<Utc>, timezone: &str) -> EventDetails {
        let tz = resolve_timezone(timezone);

        let Some(client) = &self.llm_client else {
            log::debug!("No language model configured, using fallback event");
            return fallback_event(description, now, tz);
        };

        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_prompt(description, now, tz)),
        ];

        let reply = match client.complete(&self.model, &messages, 0.0).await {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("Language model call failed: {}", e);
                return fallback_event(description, now, tz);
            }
        };

        match decode_reply(&reply) {
            Ok(object) => repair_event(&object, description, now, tz),
            Err(e) => {
                log::warn!("{}", e);
                fallback_event(description, now, tz)
            }
        }
    }
}

/// Prompt embedding today's date and the verbatim request
pub fn build_prompt(description: &str, now: DateTime<Utc>, tz: Tz) -> String {
    let local = now.with_timezone(&tz);
    let current_date = local.format("%Y-%m-%d").to_string();
    let current_day = local.format("%A").to_string();

    let mut prompt = String::new();
    prompt.push_str(&format!("Today is {} ({}). Timezone: {}.\n\n", current_date, current_day, tz.name()));
    prompt.push_str("Extract the event from the request below and return a JSON object with exactly these fields:\n");
    prompt.push_str("{\n");
    prompt.push_str("  \"summary\": \"short event title\",\n");
    prompt.push_str("  \"description\": \"longer description\",\n");
    prompt.push_str("  \"start_time\": \"YYYY-MM-DDTHH:MM:SS\",\n");
    prompt.push_str("  \"end_time\": \"YYYY-MM-DDTHH:MM:SS\",\n");
    prompt.push_str("  \"reminders\": [{\"method\": \"popup\", \"minutes\": 15}]\n");
    prompt.push_str("}\n\n");
    prompt.push_str("Rules:\n");
    prompt.push_str("- Resolve relative dates (\"tomorrow\", \"next Friday\") against today's date\n");
    prompt.push_str("- Do NOT add a timezone suffix: no 'Z', no '+05:30'\n");
    prompt.push_str("- If no duration is given the event lasts one hour\n");
    prompt.push_str("- reminders.method is \"popup\" or \"email\"\n\n");
    prompt.push_str("Example:\n");
    prompt.push_str("Request: \"Team sync on the 12th at 3pm for 30 minutes\"\n");
    prompt.push_str("{\"summary\": \"Team sync\", \"description\": \"Team sync\", ");
    prompt.push_str("\"start_time\": \"YYYY-MM-12T15:00:00\", \"end_time\": \"YYYY-MM-12T15:30:00\", ");
    prompt.push_str("\"reminders\": [{\"method\": \"popup\", \"minutes\": 15}]}\n\n");
    prompt.push_str(&format!("Request: \"{}\"\n", description));
    prompt.push_str("Return only the JSON object.");
    prompt
}

/// Strip code fences and decode the outermost JSON object
pub fn decode_reply(reply: &str) -> TaskResult<Map<String, Value>> {
    let unfenced = strip_code_fence(reply);
    let json_str = match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced,
    };

    match serde_json::from_str::<Value>(json_str)? {
        Value::Object(object) => Ok(object),
        other => Err(TaskError::Parse(format!("expected a JSON object, got {}", other))),
    }
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the language tag line, e.g. ```json
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Apply defaults and repairs to a decoded model reply
pub fn repair_event(object: &Map<String, Value>, description: &str, now: DateTime<Utc>, tz: Tz) -> EventDetails {
    let text = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let summary = text("summary").unwrap_or(DEFAULT_SUMMARY).to_string();
    let event_description = text("description").unwrap_or(description).to_string();

    let start_time = match text("start_time") {
        None => tomorrow_at(now, tz, DEFAULT_START_HOUR),
        Some(raw) => repair_start(raw).unwrap_or_else(|| {
            log::debug!("Discarding malformed start_time '{}'", raw);
            tomorrow_at(now, tz, REPAIR_START_HOUR)
        }),
    };

    let one_hour_later = temporal::add_minutes(&start_time, 60).unwrap_or_else(|| start_time.clone());
    let end_time = text("end_time")
        .and_then(normalize_full)
        .filter(|end| is_after(end, &start_time))
        .unwrap_or(one_hour_later);

    EventDetails {
        summary,
        description: event_description,
        start_time,
        end_time,
        reminders: parse_reminders(object.get("reminders")),
    }
}

/// Date-only values get the repair time; anything else must be a full date-time
fn repair_start(raw: &str) -> Option<String> {
    if raw.len() == 10 && !raw.contains('T') {
        return normalize_full(&format!("{}T{}", raw, REPAIR_TIME));
    }
    normalize_full(raw)
}

fn normalize_full(raw: &str) -> Option<String> {
    if !raw.contains('T') || raw.len() < 19 {
        return None;
    }
    parse_naive(&strip_offset(raw)).map(format_naive)
}

fn is_after(end: &str, start: &str) -> bool {
    match (parse_naive(end), parse_naive(start)) {
        (Some(end), Some(start)) => end > start,
        _ => false,
    }
}

fn parse_reminders(value: Option<&Value>) -> Vec<Reminder> {
    let reminders: Vec<Reminder> = value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_reminder).collect())
        .unwrap_or_default();

    if reminders.is_empty() {
        vec![Reminder::popup(DEFAULT_REMINDER_MINUTES)]
    } else {
        reminders
    }
}

fn parse_reminder(value: &Value) -> Option<Reminder> {
    let method = match value.get("method").and_then(Value::as_str).map(str::to_lowercase) {
        Some(m) if m == "email" => ReminderMethod::Email,
        Some(m) if m == "popup" => ReminderMethod::Popup,
        None => ReminderMethod::Popup,
        Some(_) => return None,
    };
    let minutes = value.get("minutes").and_then(Value::as_u64)?;
    Some(Reminder {
        method,
        minutes: u32::try_from(minutes).ok()?,
    })
}

/// Placeholder event used when the model is unavailable or unusable
pub fn fallback_event(description: &str, now: DateTime<Utc>, tz: Tz) -> EventDetails {
    let excerpt: String = description.chars().take(FALLBACK_SUMMARY_CHARS).collect();
    EventDetails {
        summary: format!("Meeting: {}", excerpt),
        description: description.to_string(),
        start_time: tomorrow_at(now, tz, DEFAULT_START_HOUR),
        end_time: tomorrow_at(now, tz, DEFAULT_START_HOUR + 1),
        reminders: vec![Reminder::popup(DEFAULT_REMINDER_MINUTES)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::MockLLMClient;
    use chrono::TimeZone;

    const TZ: &str = "Asia/Kolkata";

    fn now() -> DateTime<Utc> {
        // 2025-11-05 10:00 in Asia/Kolkata
        Utc.with_ymd_and_hms(2025, 11, 5, 4, 30, 0).unwrap()
    }

    fn parser_with(responses: Vec<&str>) -> (NaturalLanguageEventParser, Arc<MockLLMClient>) {
        let mock = Arc::new(MockLLMClient::new(responses));
        let parser = NaturalLanguageEventParser::new(Some(mock.clone() as Arc<dyn LLMClient>), "test-model");
        (parser, mock)
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let reply = r#"```json
{
  "summary": "Meeting",
  "description": "Meeting on November 7th",
  "start_time": "2025-11-07T05:30:00",
  "end_time": "2025-11-07T06:10:00",
  "reminders": [{"method": "popup", "minutes": 15}]
}
```"#;
        let (parser, mock) = parser_with(vec![reply]);
        let event = parser
            .parse("Schedule meeting on November 7th at 5:30 am for 40 minutes", now(), TZ)
            .await;

        assert_eq!(event.start_time, "2025-11-07T05:30:00");
        assert_eq!(event.end_time, "2025-11-07T06:10:00");
        assert_eq!(event.reminders, vec![Reminder::popup(15)]);

        let prompts = mock.prompts.lock().unwrap();
        let user_prompt = &prompts[0][1].content;
        assert!(user_prompt.contains("2025-11-05"));
        assert!(user_prompt.contains("Wednesday"));
        assert!(user_prompt.contains("Schedule meeting on November 7th at 5:30 am for 40 minutes"));
        assert_eq!(mock.temperatures.lock().unwrap()[0], 0.0);
    }

    #[tokio::test]
    async fn test_not_json_uses_fallback() {
        let (parser, _) = parser_with(vec!["not json"]);
        let event = parser.parse("Coffee with Priya", now(), TZ).await;

        assert_eq!(event.start_time, "2025-11-06T09:00:00");
        assert_eq!(event.end_time, "2025-11-06T10:00:00");
        assert_eq!(event.reminders.len(), 1);
        assert_eq!(event.summary, "Meeting: Coffee with Priya");
    }

    #[tokio::test]
    async fn test_model_error_uses_fallback() {
        let mock = Arc::new(MockLLMClient::failing("connection reset"));
        let parser = NaturalLanguageEventParser::new(Some(mock as Arc<dyn LLMClient>), "m");
        let event = parser.parse("Standup", now(), TZ).await;
        assert_eq!(event.summary, "Meeting: Standup");
    }

    #[tokio::test]
    async fn test_offline_parser_truncates_summary() {
        let long = "a".repeat(80);
        let event = NaturalLanguageEventParser::offline().parse(&long, now(), TZ).await;
        assert_eq!(event.summary, format!("Meeting: {}", "a".repeat(50)));
        assert_eq!(event.description, long);
    }

    #[tokio::test]
    async fn test_date_only_start_is_repaired() {
        let (parser, _) = parser_with(vec![r#"{"summary": "Review", "start_time": "2025-11-07"}"#]);
        let event = parser.parse("Review on the 7th", now(), TZ).await;
        assert_eq!(event.start_time, "2025-11-07T14:00:00");
        assert_eq!(event.end_time, "2025-11-07T15:00:00");
    }

    #[test]
    fn test_offsets_are_stripped_from_reply() {
        let object = decode_reply(
            r#"{"start_time": "2025-11-07T05:30:00+05:30", "end_time": "2025-11-07T06:00:00Z"}"#,
        )
        .unwrap();
        let event = repair_event(&object, "sync", now(), chrono_tz::Asia::Kolkata);
        assert_eq!(event.start_time, "2025-11-07T05:30:00");
        assert_eq!(event.end_time, "2025-11-07T06:00:00");
        assert_eq!(event.summary, DEFAULT_SUMMARY);
        assert_eq!(event.description, "sync");
    }

    #[test]
    fn test_missing_and_malformed_start() {
        let tz = chrono_tz::Asia::Kolkata;
        let missing = repair_event(&Map::new(), "x", now(), tz);
        assert_eq!(missing.start_time, "2025-11-06T09:00:00");
        assert_eq!(missing.end_time, "2025-11-06T10:00:00");

        let object = decode_reply(r#"{"start_time": "next friday at 3"}"#).unwrap();
        let malformed = repair_event(&object, "x", now(), tz);
        assert_eq!(malformed.start_time, "2025-11-06T14:00:00");
    }

    #[test]
    fn test_end_not_after_start_is_replaced() {
        let object = decode_reply(
            r#"{"start_time": "2025-11-07T10:00:00", "end_time": "2025-11-07T09:00:00"}"#,
        )
        .unwrap();
        let event = repair_event(&object, "x", now(), chrono_tz::Asia::Kolkata);
        assert_eq!(event.end_time, "2025-11-07T11:00:00");
    }

    #[test]
    fn test_reminder_parsing() {
        let object = decode_reply(
            r#"{"reminders": [{"method": "email", "minutes": 60}, {"method": "sms", "minutes": 5}, {"minutes": -3}]}"#,
        )
        .unwrap();
        let event = repair_event(&object, "x", now(), chrono_tz::Asia::Kolkata);
        assert_eq!(
            event.reminders,
            vec![Reminder {
                method: ReminderMethod::Email,
                minutes: 60
            }]
        );

        let empty = decode_reply(r#"{"reminders": []}"#).unwrap();
        let event = repair_event(&empty, "x", now(), chrono_tz::Asia::Kolkata);
        assert_eq!(event.reminders, vec![Reminder::popup(15)]);
    }

    #[test]
    fn test_decode_reply_rejects_non_objects() {
        assert!(decode_reply("[1, 2]").is_err());
        assert!(decode_reply("not json").is_err());
        assert!(decode_reply("Sure! {\"summary\": \"x\"} Hope that helps").is_ok());
    }
}

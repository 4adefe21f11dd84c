//! Deterministic stand-ins for provider responses.
//!
//! Every fixture mirrors the shape of the real provider JSON so the normal
//! formatters can render it. Output depends only on the arguments.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde_json::{json, Value};

use crate::temporal::{local_date, NAIVE_FORMAT};

pub const MOCK_NOTICE: &str = "ℹ️ Sample data: no credential is configured for this service.";

/// Calendar `events.list` response with up to three upcoming events
pub fn calendar_events(now: DateTime<Utc>, tz: Tz, max_results: u32) -> Value {
    let tomorrow = local_date(now, tz) + Duration::days(1);
    let fixtures = [
        ("Team standup", 9, 30),
        ("Project review", 14, 0),
        ("1:1 with manager", 16, 30),
    ];

    let items: Vec<Value> = fixtures
        .iter()
        .take(max_results as usize)
        .enumerate()
        .filter_map(|(i, (summary, hour, minute))| {
            let start = tomorrow.and_hms_opt(*hour, *minute, 0)?;
            let end = start + Duration::minutes(30);
            Some(json!({
                "id": format!("mock-event-{}", i + 1),
                "summary": summary,
                "start": {"dateTime": start.format(NAIVE_FORMAT).to_string(), "timeZone": tz.name()},
                "end": {"dateTime": end.format(NAIVE_FORMAT).to_string(), "timeZone": tz.name()},
                "htmlLink": format!("https://calendar.google.com/calendar/event?eid=mock-event-{}", i + 1),
            }))
        })
        .collect();

    json!({ "items": items })
}

pub fn commits(owner: &str, repo: &str, since: Option<&str>) -> Value {
    let date = since.unwrap_or("2025-01-01T00:00:00Z");
    let fixtures = [
        ("a1b2c3d4e5f6a7b8c9d0", "Fix pagination in list endpoint", "octocat"),
        ("b2c3d4e5f6a7b8c9d0e1", "Add retry to webhook delivery", "hubot"),
        ("c3d4e5f6a7b8c9d0e1f2", "Update README with setup steps", "octocat"),
    ];

    Value::Array(
        fixtures
            .iter()
            .map(|(sha, message, author)| {
                json!({
                    "sha": sha,
                    "html_url": format!("https://github.com/{}/{}/commit/{}", owner, repo, sha),
                    "commit": {
                        "message": message,
                        "author": {"name": author, "date": date},
                    },
                })
            })
            .collect(),
    )
}

pub fn issues(owner: &str, repo: &str, state: &str) -> Value {
    let fixtures = [(42, "Crash when config file is empty"), (57, "Support custom API base URL")];

    Value::Array(
        fixtures
            .iter()
            .map(|(number, title)| {
                json!({
                    "number": number,
                    "title": title,
                    "state": state,
                    "html_url": format!("https://github.com/{}/{}/issues/{}", owner, repo, number),
                    "user": {"login": "octocat"},
                })
            })
            .collect(),
    )
}

pub fn repository(owner: &str, repo: &str) -> Value {
    json!({
        "full_name": format!("{}/{}", owner, repo),
        "description": "Sample repository",
        "stargazers_count": 128,
        "forks_count": 16,
        "open_issues_count": 2,
        "language": "Rust",
        "default_branch": "main",
        "html_url": format!("https://github.com/{}/{}", owner, repo),
    })
}

pub fn user_repositories(user: &str) -> Value {
    let fixtures = [("dotfiles", 12, "Shell"), ("website", 5, "TypeScript"), ("toolbox", 48, "Rust")];

    Value::Array(
        fixtures
            .iter()
            .map(|(name, stars, language)| {
                json!({
                    "full_name": format!("{}/{}", user, name),
                    "description": null,
                    "stargazers_count": stars,
                    "language": language,
                    "html_url": format!("https://github.com/{}/{}", user, name),
                })
            })
            .collect(),
    )
}

pub fn search_repositories(query: &str) -> Value {
    json!({
        "total_count": 2,
        "items": [
            {
                "full_name": format!("example/{}", slug(query)),
                "description": format!("Top result for '{}'", query),
                "stargazers_count": 900,
                "language": "Rust",
                "html_url": "https://github.com/example",
            },
            {
                "full_name": format!("sample/{}-rs", slug(query)),
                "description": null,
                "stargazers_count": 45,
                "language": "Rust",
                "html_url": "https://github.com/sample",
            }
        ]
    })
}

fn slug(text: &str) -> String {
    let slug: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let trimmed = slug.trim_matches('-');
    if trimmed.is_empty() {
        "project".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_calendar_fixture_is_deterministic() {
        let now = Utc.with_ymd_and_hms(2025, 11, 5, 4, 30, 0).unwrap();
        let first = calendar_events(now, chrono_tz::Asia::Kolkata, 10);
        let second = calendar_events(now, chrono_tz::Asia::Kolkata, 10);

        assert_eq!(first, second);
        assert_eq!(first["items"].as_array().unwrap().len(), 3);
        assert_eq!(first["items"][0]["start"]["dateTime"], "2025-11-06T09:30:00");
    }

    #[test]
    fn test_calendar_fixture_respects_max_results() {
        let now = Utc.with_ymd_and_hms(2025, 11, 5, 4, 30, 0).unwrap();
        let value = calendar_events(now, chrono_tz::UTC, 1);
        assert_eq!(value["items"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_github_fixtures_use_arguments() {
        let commit_url = commits("rust-lang", "cargo", None)[0]["html_url"].as_str().unwrap().to_string();
        assert!(commit_url.starts_with("https://github.com/rust-lang/cargo/commit/"));
        assert_eq!(issues("o", "r", "closed")[1]["state"], "closed");
        assert_eq!(repository("o", "r")["full_name"], "o/r");
        assert_eq!(search_repositories("Async HTTP!")["items"][0]["full_name"], "example/async-http");
    }
}

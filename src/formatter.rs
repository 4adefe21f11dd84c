//! Renders provider JSON as readable text.

use chrono::DateTime;
use serde_json::{json, Value};

use crate::calendar_adapter::CreatedEvent;
use crate::event_parser::EventDetails;
use crate::mock_data::MOCK_NOTICE;
use crate::task::ResultEnvelope;
use crate::temporal::parse_naive;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Flag an envelope built from fixtures and say so in the content
pub fn mark_mock(mut envelope: ResultEnvelope) -> ResultEnvelope {
    envelope.mock_data = Some(true);
    envelope.content = format!("{}\n\n{}", envelope.content, MOCK_NOTICE);
    envelope
}

fn str_field<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |current, key| current.get(*key))
        .and_then(Value::as_str)
}

/// RFC 3339 or naive date-times as `YYYY-MM-DD HH:MM`; dates pass through
pub fn display_time(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(DISPLAY_FORMAT).to_string();
    }
    match parse_naive(raw) {
        Some(dt) => dt.format(DISPLAY_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

pub fn calendar_list(response: &Value) -> ResultEnvelope {
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    if items.is_empty() {
        return ResultEnvelope::success("📅 No upcoming events found.", Some(json!({"events": [], "count": 0})));
    }

    let mut content = format!("📅 Upcoming events ({}):", items.len());
    for (i, item) in items.iter().enumerate() {
        let summary = str_field(item, &["summary"]).unwrap_or("(no title)");
        let start = str_field(item, &["start", "dateTime"])
            .or_else(|| str_field(item, &["start", "date"]))
            .map(display_time)
            .unwrap_or_else(|| "time unknown".to_string());
        content.push_str(&format!("\n{}. {} - {}", i + 1, summary, start));
    }

    let count = items.len();
    ResultEnvelope::success(content, Some(json!({"events": items, "count": count})))
}

pub fn calendar_created(created: &CreatedEvent, event: &EventDetails, timezone: &str) -> ResultEnvelope {
    let mut content = format!(
        "✅ Event created: {}\n🕒 {} to {} ({})",
        event.summary,
        display_time(&event.start_time),
        display_time(&event.end_time),
        timezone
    );
    if let Some(link) = &created.html_link {
        content.push_str(&format!("\n🔗 {}", link));
    }

    ResultEnvelope::success(
        content,
        Some(json!({
            "event_id": created.id,
            "html_link": created.html_link,
            "event": event,
            "timezone": timezone,
        })),
    )
}

pub fn calendar_deleted(event_id: &str) -> ResultEnvelope {
    ResultEnvelope::success(format!("🗑️ Deleted event {}", event_id), Some(json!({"event_id": event_id})))
}

pub fn calendar_updated(event_id: &str, response: &Value) -> ResultEnvelope {
    let summary = str_field(response, &["summary"]).unwrap_or("event");
    ResultEnvelope::success(
        format!("✏️ Updated {} ({})", summary, event_id),
        Some(json!({"event_id": event_id, "event": response})),
    )
}

pub fn commits(repo: &str, response: &Value) -> ResultEnvelope {
    let commits = response.as_array().cloned().unwrap_or_default();
    if commits.is_empty() {
        return ResultEnvelope::success(
            format!("📝 No commits found in {}.", repo),
            Some(json!({"repo": repo, "commits": [], "count": 0})),
        );
    }

    let mut content = format!("📝 Recent commits in {} ({}):", repo, commits.len());
    for commit in &commits {
        let sha: String = str_field(commit, &["sha"]).unwrap_or("").chars().take(7).collect();
        let message = str_field(commit, &["commit", "message"])
            .and_then(|m| m.lines().next())
            .unwrap_or("");
        let author = str_field(commit, &["commit", "author", "name"]).unwrap_or("unknown");
        let date = str_field(commit, &["commit", "author", "date"])
            .map(display_time)
            .unwrap_or_default();
        content.push_str(&format!("\n- {} {} ({}, {})", sha, message, author, date));
    }

    let count = commits.len();
    ResultEnvelope::success(content, Some(json!({"repo": repo, "commits": commits, "count": count})))
}

pub fn issues(repo: &str, state: &str, response: &Value) -> ResultEnvelope {
    let issues = response.as_array().cloned().unwrap_or_default();
    if issues.is_empty() {
        return ResultEnvelope::success(
            format!("🐛 No {} issues in {}.", state, repo),
            Some(json!({"repo": repo, "issues": [], "count": 0})),
        );
    }

    let mut content = format!("🐛 {} issues in {} ({}):", capitalize(state), repo, issues.len());
    for issue in &issues {
        let number = issue.get("number").and_then(Value::as_u64).unwrap_or(0);
        let title = str_field(issue, &["title"]).unwrap_or("");
        let issue_state = str_field(issue, &["state"]).unwrap_or(state);
        let kind = if issue.get("pull_request").is_some() { " (PR)" } else { "" };
        content.push_str(&format!("\n- #{} {} [{}]{}", number, title, issue_state, kind));
    }

    let count = issues.len();
    ResultEnvelope::success(content, Some(json!({"repo": repo, "issues": issues, "count": count})))
}

pub fn repository(response: &Value) -> ResultEnvelope {
    let name = str_field(response, &["full_name"]).unwrap_or("repository");
    let description = str_field(response, &["description"]).unwrap_or("No description");
    let number = |key: &str| response.get(key).and_then(Value::as_u64).unwrap_or(0);

    let mut content = format!(
        "📦 {}: {}\n⭐ {} stars | 🍴 {} forks | 🐛 {} open issues",
        name,
        description,
        number("stargazers_count"),
        number("forks_count"),
        number("open_issues_count")
    );
    if let Some(language) = str_field(response, &["language"]) {
        content.push_str(&format!(" | {}", language));
    }
    if let Some(url) = str_field(response, &["html_url"]) {
        content.push_str(&format!("\n🔗 {}", url));
    }

    ResultEnvelope::success(content, Some(response.clone()))
}

pub fn repository_list(title: &str, repos: &[Value]) -> String {
    let mut content = format!("{} ({}):", title, repos.len());
    for repo in repos {
        let name = str_field(repo, &["full_name"]).unwrap_or("");
        let stars = repo.get("stargazers_count").and_then(Value::as_u64).unwrap_or(0);
        content.push_str(&format!("\n- {} ⭐{}", name, stars));
        if let Some(language) = str_field(repo, &["language"]) {
            content.push_str(&format!(" ({})", language));
        }
        if let Some(description) = str_field(repo, &["description"]) {
            content.push_str(&format!(": {}", description));
        }
    }
    content
}

pub fn user_repositories(user: &str, response: &Value) -> ResultEnvelope {
    let repos = response.as_array().cloned().unwrap_or_default();
    let content = if repos.is_empty() {
        format!("📚 {} has no public repositories.", user)
    } else {
        repository_list(&format!("📚 Repositories for {}", user), &repos)
    };
    let count = repos.len();
    ResultEnvelope::success(content, Some(json!({"user": user, "repositories": repos, "count": count})))
}

pub fn search_results(query: &str, response: &Value) -> ResultEnvelope {
    let repos = response
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let total = response.get("total_count").and_then(Value::as_u64).unwrap_or(repos.len() as u64);

    let content = if repos.is_empty() {
        format!("🔍 No repositories match '{}'.", query)
    } else {
        repository_list(&format!("🔍 {} repositories match '{}', showing", total, query), &repos)
    };
    ResultEnvelope::success(
        content,
        Some(json!({"query": query, "total_count": total, "repositories": repos})),
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Utc};
use futures::FutureExt;
use regex::Regex;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, LazyLock};

use crate::calendar_adapter::{
    event_request_body, patch_request_body, CalendarProvider, EventQuery, CALENDAR_CREDENTIAL_HINT,
};
use crate::config::Config;
use crate::dispatcher::{DispatchRequest, OperationKind, RetryingApiDispatcher};
use crate::error::{TaskError, TaskResult};
use crate::event_parser::{EventDetails, NaturalLanguageEventParser, Reminder, DEFAULT_REMINDER_MINUTES};
use crate::formatter::{self, mark_mock};
use crate::github_adapter::{RepoRef, SourceControlProvider, GITHUB_CREDENTIAL_HINT};
use crate::intent_classifier::{IntentClassifier, KeywordTables};
use crate::mock_data;
use crate::task::{Intent, ResultEnvelope, Task};
use crate::temporal::{self, day_start_utc, local_date, resolve_timezone, strip_offset};

pub type Clock = fn() -> DateTime<Utc>;

/// Where a task is in its journey through an executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStage {
    Received,
    Classified,
    Parsing,
    Normalized,
    Dispatched,
    Completed,
    Failed,
}

impl fmt::Display for ExecutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionStage::Received => "received",
            ExecutionStage::Classified => "classified",
            ExecutionStage::Parsing => "parsing",
            ExecutionStage::Normalized => "normalized",
            ExecutionStage::Dispatched => "dispatched",
            ExecutionStage::Completed => "completed",
            ExecutionStage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

fn enter(executor: &str, stage: ExecutionStage) {
    log::debug!("[{}] {}", executor, stage);
}

/// Runs one provider's tasks end to end. Never fails: errors come back as envelopes.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    fn name(&self) -> &str;
    fn can_handle(&self, task: &Task) -> bool;
    async fn execute(&self, task: Task) -> ResultEnvelope;
}

/// Await `future`, turning a panic into a failure envelope
pub async fn contain_panics<F>(executor: &str, future: F) -> ResultEnvelope
where
    F: std::future::Future<Output = ResultEnvelope>,
{
    let envelope = match AssertUnwindSafe(future).catch_unwind().await {
        Ok(envelope) => envelope,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("[{}] task panicked: {}", executor, message);
            ResultEnvelope::failure("❌ Internal error while running the task.", message)
        }
    };

    enter(
        executor,
        if envelope.success { ExecutionStage::Completed } else { ExecutionStage::Failed },
    );
    envelope
}

fn text_mentions(task: &Task, words: &[&str]) -> bool {
    let haystack = format!("{} {}", task.task_type, task.description).to_lowercase();
    words.iter().any(|w| haystack.contains(w))
}

// ==================== CALENDAR ====================

const CALENDAR_WORDS: &[&str] = &[
    "calendar", "event", "meeting", "schedule", "appointment", "agenda", "remind",
];

pub struct CalendarExecutor {
    config: Arc<Config>,
    classifier: IntentClassifier,
    parser: NaturalLanguageEventParser,
    dispatcher: RetryingApiDispatcher,
    provider: Arc<dyn CalendarProvider>,
    clock: Clock,
}

impl CalendarExecutor {
    pub fn new(
        config: Arc<Config>,
        parser: NaturalLanguageEventParser,
        provider: Arc<dyn CalendarProvider>,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(KeywordTables::with_extra(&config.keywords)),
            dispatcher: RetryingApiDispatcher::new(&config.dispatch),
            config,
            parser,
            provider,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn request<'a>(&self, name: &'a str, kind: OperationKind) -> DispatchRequest<'a> {
        DispatchRequest {
            name,
            kind,
            has_credential: self.config.calendar_token().is_some(),
            credential_hint: CALENDAR_CREDENTIAL_HINT,
        }
    }

    async fn run(&self, task: Task) -> ResultEnvelope {
        enter(self.name(), ExecutionStage::Received);
        let intent = self.classifier.classify(&task);
        enter(self.name(), ExecutionStage::Classified);
        log::info!("Calendar task resolved to {}", intent);

        match intent {
            Intent::List => self.list_events(&task).await,
            Intent::Create => self.create_event(&task).await,
            Intent::Delete => self.delete_event(&task).await,
            Intent::Update => self.update_event(&task).await,
            Intent::Unknown => TaskError::validation(
                "the task has no type, description or parameters",
                "Describe what to do, e.g. \"schedule a meeting tomorrow at 2pm\".",
            )
            .into(),
        }
    }

    async fn list_events(&self, task: &Task) -> ResultEnvelope {
        let now = (self.clock)();
        let tz = resolve_timezone(&self.config.timezone);
        let max_results = task
            .param_u64("max_results")
            .or_else(|| task.param_u64("limit"))
            .map(|n| n.clamp(1, 250) as u32)
            .unwrap_or(self.config.calendar.default_max_results);
        let query = EventQuery {
            time_min: now.to_rfc3339(),
            max_results,
            order_by: "startTime".to_string(),
        };

        let provider = self.provider.as_ref();
        let calendar_id = self.config.calendar.calendar_id.as_str();
        let query_ref = &query;

        enter(self.name(), ExecutionStage::Dispatched);
        self.dispatcher
            .dispatch(
                &self.request("calendar.list", OperationKind::Read),
                move || async move { provider.list_events(calendar_id, query_ref).await },
                |response| formatter::calendar_list(&response),
                || mark_mock(formatter::calendar_list(&mock_data::calendar_events(now, tz, max_results))),
            )
            .await
    }

    async fn create_event(&self, task: &Task) -> ResultEnvelope {
        let event = match self.event_details(task).await {
            Ok(event) => event,
            Err(e) => return e.into(),
        };
        enter(self.name(), ExecutionStage::Normalized);

        let timezone = resolve_timezone(&self.config.timezone).name();
        let body = event_request_body(&event, timezone);
        let provider = self.provider.as_ref();
        let calendar_id = self.config.calendar.calendar_id.as_str();
        let body_ref = &body;

        enter(self.name(), ExecutionStage::Dispatched);
        self.dispatcher
            .dispatch(
                &self.request("calendar.insert", OperationKind::Write),
                move || async move { provider.insert_event(calendar_id, body_ref).await },
                |created| formatter::calendar_created(&created, &event, timezone),
                || ResultEnvelope::failure("❌ Events cannot be created from sample data.", "mock write"),
            )
            .await
    }

    /// Pre-parsed parameters win; otherwise ask the language model
    async fn event_details(&self, task: &Task) -> TaskResult<EventDetails> {
        if let (Some(start), Some(end)) = (window_value(task, "start"), window_value(task, "end")) {
            return event_from_parameters(task, start, end);
        }

        if task.description.trim().is_empty() {
            return Err(TaskError::validation(
                "no start/end time and no description to derive them from",
                "Pass start_time and end_time parameters or describe the event in words.",
            ));
        }

        enter(self.name(), ExecutionStage::Parsing);
        Ok(self
            .parser
            .parse(&task.description, (self.clock)(), &self.config.timezone)
            .await)
    }

    async fn delete_event(&self, task: &Task) -> ResultEnvelope {
        let Some(event_id) = task.param_str("event_id") else {
            return TaskError::validation(
                "event_id is required to delete an event",
                "List events first, then pass --param event_id=<id>.",
            )
            .into();
        };

        let provider = self.provider.as_ref();
        let calendar_id = self.config.calendar.calendar_id.as_str();

        enter(self.name(), ExecutionStage::Dispatched);
        self.dispatcher
            .dispatch(
                &self.request("calendar.delete", OperationKind::Write),
                move || async move { provider.delete_event(calendar_id, event_id).await },
                |_| formatter::calendar_deleted(event_id),
                || ResultEnvelope::failure("❌ Events cannot be deleted from sample data.", "mock write"),
            )
            .await
    }

    async fn update_event(&self, task: &Task) -> ResultEnvelope {
        let Some(event_id) = task.param_str("event_id") else {
            return TaskError::validation(
                "event_id is required to update an event",
                "List events first, then pass --param event_id=<id>.",
            )
            .into();
        };

        let start = match window_value(task, "start").map(normalize_parameter).transpose() {
            Ok(start) => start,
            Err(e) => return e.into(),
        };
        let end = match window_value(task, "end").map(normalize_parameter).transpose() {
            Ok(end) => end,
            Err(e) => return e.into(),
        };
        let summary = task.param_str("summary");
        if summary.is_none() && start.is_none() && end.is_none() {
            return TaskError::validation(
                "nothing to update",
                "Pass at least one of summary, start_time or end_time.",
            )
            .into();
        }
        enter(self.name(), ExecutionStage::Normalized);

        let timezone = resolve_timezone(&self.config.timezone).name();
        let fields = patch_request_body(summary, start.as_deref(), end.as_deref(), timezone);
        let provider = self.provider.as_ref();
        let calendar_id = self.config.calendar.calendar_id.as_str();
        let fields_ref = &fields;

        enter(self.name(), ExecutionStage::Dispatched);
        self.dispatcher
            .dispatch(
                &self.request("calendar.patch", OperationKind::Write),
                move || async move { provider.patch_event(calendar_id, event_id, fields_ref).await },
                |response| formatter::calendar_updated(event_id, &response),
                || ResultEnvelope::failure("❌ Events cannot be updated from sample data.", "mock write"),
            )
            .await
    }
}

#[async_trait]
impl TaskExecutor for CalendarExecutor {
    fn name(&self) -> &str {
        "calendar"
    }

    /// Source-control requests are left to the GitHub executor even when they say "meeting"
    fn can_handle(&self, task: &Task) -> bool {
        if mentions_source_control(task) {
            return false;
        }
        text_mentions(task, CALENDAR_WORDS)
            || (window_value(task, "start").is_some() && window_value(task, "end").is_some())
            || task.param_str("event_id").is_some()
            || self.classifier.mentions_keywords(task)
    }

    async fn execute(&self, task: Task) -> ResultEnvelope {
        contain_panics(self.name(), self.run(task)).await
    }
}

/// `start_time`/`start` (or the `end` pair) from the task parameters
fn window_value<'a>(task: &'a Task, prefix: &str) -> Option<&'a str> {
    task.param_str(&format!("{}_time", prefix)).or_else(|| task.param_str(prefix))
}

fn normalize_parameter(raw: &str) -> TaskResult<String> {
    temporal::parse_naive(&strip_offset(raw))
        .map(temporal::format_naive)
        .ok_or_else(|| {
            TaskError::validation(
                format!("'{}' is not a date-time", raw),
                "Use the form YYYY-MM-DDTHH:MM:SS.",
            )
        })
}

fn event_from_parameters(task: &Task, start: &str, end: &str) -> TaskResult<EventDetails> {
    let start_time = normalize_parameter(start)?;
    let end_time = normalize_parameter(end)?;
    if temporal::parse_naive(&end_time) <= temporal::parse_naive(&start_time) {
        return Err(TaskError::validation(
            format!("end_time {} is not after start_time {}", end_time, start_time),
            "Make sure the event ends after it starts.",
        ));
    }

    let summary = task
        .param_str("summary")
        .map(str::to_string)
        .unwrap_or_else(|| {
            let text = task.description.trim();
            if text.is_empty() {
                crate::event_parser::DEFAULT_SUMMARY.to_string()
            } else {
                text.chars().take(100).collect()
            }
        });
    let reminder_minutes = task
        .param_u64("reminder_minutes")
        .and_then(|m| u32::try_from(m).ok())
        .unwrap_or(DEFAULT_REMINDER_MINUTES);

    Ok(EventDetails {
        summary,
        description: task.param_str("description").unwrap_or(&task.description).to_string(),
        start_time,
        end_time,
        reminders: vec![Reminder::popup(reminder_minutes)],
    })
}

// ==================== GITHUB ====================

const GITHUB_WORDS: &[&str] = &[
    "github", "commit", "repo", "issue", "pull request", "source control",
];
const DEFAULT_PAGE_SIZE: u32 = 10;

static REPO_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s(])((?:https?://)?(?:github\.com/)?[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+)").expect("Invalid repo regex")
});
static SEARCH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)search(?:\s+github)?(?:\s+for)?(?:\s+(?:repos|repositories))?(?:\s+(?:about|for|on|matching))?\s+(.+)")
        .expect("Invalid search regex")
});
static USER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:repos|repositories)\s+(?:of|for|by|from)\s+@?([A-Za-z0-9-]+)").expect("Invalid user regex")
});

/// Slash phrases that are prose, not `owner/name`
const SLASH_IDIOMS: &[&str] = &["and/or", "either/or", "start/end", "am/pm", "n/a", "w/o", "s/o"];

fn looks_like_repo(token: &str) -> bool {
    let bare = token
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("github.com/")
        .to_lowercase();
    let Some((owner, _)) = bare.split_once('/') else {
        return false;
    };
    !SLASH_IDIOMS.contains(&bare.as_str()) && !owner.chars().all(|c| c.is_ascii_digit())
}

/// A github.com link wins; otherwise the last `owner/name` token
pub fn repo_in_description(description: &str) -> Option<RepoRef> {
    let candidates: Vec<&str> = REPO_PATTERN
        .captures_iter(description)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim_end_matches(['.', ',', ')']))
        .filter(|token| looks_like_repo(token))
        .collect();

    candidates
        .iter()
        .find(|token| token.contains("github.com/"))
        .or_else(|| candidates.last())
        .and_then(|token| RepoRef::parse(token))
}

/// GitHub words, a `repo` parameter or an `owner/name` token
pub fn mentions_source_control(task: &Task) -> bool {
    text_mentions(task, GITHUB_WORDS)
        || task.param_str("repo").is_some()
        || repo_in_description(&task.description).is_some()
}

/// Read operations supported against the source-control host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubOperation {
    Commits,
    Issues,
    RepoInfo,
    UserRepos,
    SearchRepos,
}

type TextPredicate = fn(&str) -> bool;

fn mentions_search(text: &str) -> bool {
    text.contains("search") || text.contains("find repo")
}
fn mentions_commits(text: &str) -> bool {
    text.contains("commit")
}
fn mentions_issues(text: &str) -> bool {
    text.contains("issue") || text.contains("bug") || text.contains("pull request")
}
fn mentions_repo_list(text: &str) -> bool {
    text.contains("repos") || text.contains("repositories") || text.contains("user_repo")
}
fn mentions_repo(text: &str) -> bool {
    text.contains("repo") || text.contains("star") || text.contains("info")
}

/// Checked in order over the lowercased type and description
const GITHUB_RULES: &[(TextPredicate, GitHubOperation)] = &[
    (mentions_search, GitHubOperation::SearchRepos),
    (mentions_commits, GitHubOperation::Commits),
    (mentions_issues, GitHubOperation::Issues),
    (mentions_repo_list, GitHubOperation::UserRepos),
    (mentions_repo, GitHubOperation::RepoInfo),
];

pub fn resolve_github_operation(task: &Task) -> GitHubOperation {
    let text = format!("{} {}", task.task_type, task.description).to_lowercase();
    GITHUB_RULES
        .iter()
        .find(|(predicate, _)| predicate(&text))
        .map(|(_, operation)| *operation)
        .unwrap_or(GitHubOperation::Commits)
}

/// Lower bound for commits implied by words like "yesterday"
pub fn since_from_description(description: &str, now: DateTime<Utc>, timezone: &str) -> Option<String> {
    let tz = resolve_timezone(timezone);
    let today = local_date(now, tz);
    let text = description.to_lowercase();

    let start = if text.contains("yesterday") {
        today - Duration::days(1)
    } else if text.contains("today") {
        today
    } else if text.contains("last week") {
        today - Duration::days(today.weekday().num_days_from_monday() as i64 + 7)
    } else if text.contains("this week") {
        today - Duration::days(today.weekday().num_days_from_monday() as i64)
    } else {
        return None;
    };
    Some(day_start_utc(start, tz))
}

pub struct GitHubExecutor {
    config: Arc<Config>,
    dispatcher: RetryingApiDispatcher,
    provider: Arc<dyn SourceControlProvider>,
    clock: Clock,
}

impl GitHubExecutor {
    pub fn new(config: Arc<Config>, provider: Arc<dyn SourceControlProvider>) -> Self {
        Self {
            dispatcher: RetryingApiDispatcher::new(&config.dispatch),
            config,
            provider,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn request<'a>(&self, name: &'a str) -> DispatchRequest<'a> {
        DispatchRequest {
            name,
            kind: OperationKind::Read,
            has_credential: self.config.github_token().is_some(),
            credential_hint: GITHUB_CREDENTIAL_HINT,
        }
    }

    fn page_size(task: &Task) -> u32 {
        task.param_u64("limit")
            .map(|n| n.clamp(1, 100) as u32)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    fn repo(&self, task: &Task) -> TaskResult<RepoRef> {
        let from_params = match (task.param_str("owner"), task.param_str("repo")) {
            (Some(owner), Some(repo)) if !repo.contains('/') => RepoRef::parse(&format!("{}/{}", owner, repo)),
            (_, Some(repo)) => RepoRef::parse(repo),
            _ => None,
        };

        from_params
            .or_else(|| repo_in_description(&task.description))
            .or_else(|| self.config.github.default_repo.as_deref().and_then(RepoRef::parse))
            .ok_or_else(|| {
                TaskError::validation(
                    "no repository given",
                    "Pass --param repo=owner/name, mention owner/name in the description, or set github.default_repo.",
                )
            })
    }

    fn user(&self, task: &Task) -> TaskResult<String> {
        task.param_str("user")
            .or_else(|| task.param_str("username"))
            .or_else(|| task.param_str("owner"))
            .map(str::to_string)
            .or_else(|| {
                USER_PATTERN
                    .captures(&task.description)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
            })
            .or_else(|| self.config.github.default_user.clone())
            .ok_or_else(|| {
                TaskError::validation(
                    "no GitHub user given",
                    "Pass --param user=<login> or set github.default_user.",
                )
            })
    }

    fn search_query(task: &Task) -> TaskResult<String> {
        task.param_str("query")
            .map(str::to_string)
            .or_else(|| {
                SEARCH_PATTERN
                    .captures(&task.description)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().trim().trim_end_matches(['.', '?', '!']).to_string())
                    .filter(|q| !q.is_empty())
            })
            .ok_or_else(|| {
                TaskError::validation("no search query given", "Pass --param query=<terms>.")
            })
    }

    async fn run(&self, task: Task) -> ResultEnvelope {
        enter(self.name(), ExecutionStage::Received);
        let operation = resolve_github_operation(&task);
        enter(self.name(), ExecutionStage::Classified);
        log::info!("GitHub task resolved to {:?}", operation);

        let result = match operation {
            GitHubOperation::Commits => self.commits(&task).await,
            GitHubOperation::Issues => self.issues(&task).await,
            GitHubOperation::RepoInfo => self.repo_info(&task).await,
            GitHubOperation::UserRepos => self.user_repos(&task).await,
            GitHubOperation::SearchRepos => self.search(&task).await,
        };
        result.unwrap_or_else(ResultEnvelope::from)
    }

    async fn commits(&self, task: &Task) -> TaskResult<ResultEnvelope> {
        let repo = self.repo(task)?;
        let since = task
            .param_str("since")
            .map(str::to_string)
            .or_else(|| since_from_description(&task.description, (self.clock)(), &self.config.timezone));
        let per_page = Self::page_size(task);
        let full_name = repo.full_name();

        let provider = self.provider.as_ref();
        let repo_ref = &repo;
        let since_ref = since.as_deref();

        enter(self.name(), ExecutionStage::Dispatched);
        Ok(self
            .dispatcher
            .dispatch(
                &self.request("github.commits"),
                move || async move { provider.list_commits(repo_ref, since_ref, per_page).await },
                |response| formatter::commits(&full_name, &response),
                || {
                    mark_mock(formatter::commits(
                        &full_name,
                        &mock_data::commits(&repo.owner, &repo.name, since_ref),
                    ))
                },
            )
            .await)
    }

    async fn issues(&self, task: &Task) -> TaskResult<ResultEnvelope> {
        let repo = self.repo(task)?;
        let state = match task.param_str("state") {
            Some(state @ ("open" | "closed" | "all")) => state,
            Some(other) => {
                return Err(TaskError::validation(
                    format!("unknown issue state '{}'", other),
                    "Use state=open, closed or all.",
                ))
            }
            None if task.description.to_lowercase().contains("closed") => "closed",
            None => "open",
        };
        let per_page = Self::page_size(task);
        let full_name = repo.full_name();

        let provider = self.provider.as_ref();
        let repo_ref = &repo;

        enter(self.name(), ExecutionStage::Dispatched);
        Ok(self
            .dispatcher
            .dispatch(
                &self.request("github.issues"),
                move || async move { provider.list_issues(repo_ref, state, per_page).await },
                |response| formatter::issues(&full_name, state, &response),
                || {
                    mark_mock(formatter::issues(
                        &full_name,
                        state,
                        &mock_data::issues(&repo.owner, &repo.name, state),
                    ))
                },
            )
            .await)
    }

    async fn repo_info(&self, task: &Task) -> TaskResult<ResultEnvelope> {
        let repo = self.repo(task)?;
        let provider = self.provider.as_ref();
        let repo_ref = &repo;

        enter(self.name(), ExecutionStage::Dispatched);
        Ok(self
            .dispatcher
            .dispatch(
                &self.request("github.repository"),
                move || async move { provider.get_repository(repo_ref).await },
                |response| formatter::repository(&response),
                || mark_mock(formatter::repository(&mock_data::repository(&repo.owner, &repo.name))),
            )
            .await)
    }

    async fn user_repos(&self, task: &Task) -> TaskResult<ResultEnvelope> {
        let user = self.user(task)?;
        let per_page = Self::page_size(task);
        let provider = self.provider.as_ref();
        let user_ref = user.as_str();

        enter(self.name(), ExecutionStage::Dispatched);
        Ok(self
            .dispatcher
            .dispatch(
                &self.request("github.user_repos"),
                move || async move { provider.list_user_repositories(user_ref, per_page).await },
                |response| formatter::user_repositories(user_ref, &response),
                || mark_mock(formatter::user_repositories(user_ref, &mock_data::user_repositories(user_ref))),
            )
            .await)
    }

    async fn search(&self, task: &Task) -> TaskResult<ResultEnvelope> {
        let query = Self::search_query(task)?;
        let per_page = Self::page_size(task);
        let provider = self.provider.as_ref();
        let query_ref = query.as_str();

        enter(self.name(), ExecutionStage::Dispatched);
        Ok(self
            .dispatcher
            .dispatch(
                &self.request("github.search"),
                move || async move { provider.search_repositories(query_ref, per_page).await },
                |response| formatter::search_results(query_ref, &response),
                || mark_mock(formatter::search_results(query_ref, &mock_data::search_repositories(query_ref))),
            )
            .await)
    }
}

#[async_trait]
impl TaskExecutor for GitHubExecutor {
    fn name(&self) -> &str {
        "github"
    }

    fn can_handle(&self, task: &Task) -> bool {
        mentions_source_control(task)
    }

    async fn execute(&self, task: Task) -> ResultEnvelope {
        contain_panics(self.name(), self.run(task)).await
    }
}

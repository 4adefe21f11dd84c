use std::sync::Arc;
use std::time::Duration;

use crate::calendar_adapter::GoogleCalendarClient;
use crate::config::Config;
use crate::error::{TaskError, TaskResult};
use crate::event_parser::NaturalLanguageEventParser;
use crate::executor::{CalendarExecutor, GitHubExecutor, TaskExecutor};
use crate::github_adapter::GitHubClient;
use crate::openai_client::create_llm_client;
use crate::task::{ResultEnvelope, Task};

/// Hands each task to the first executor that claims it
pub struct TaskRouter {
    executors: Vec<Box<dyn TaskExecutor>>,
}

impl TaskRouter {
    pub fn new(executors: Vec<Box<dyn TaskExecutor>>) -> Self {
        Self { executors }
    }

    /// Wire the live providers; calendar is consulted before GitHub
    pub fn from_config(config: Arc<Config>) -> TaskResult<Self> {
        let timeout = Duration::from_secs(config.dispatch.http_timeout_secs);

        let llm_client = create_llm_client(&config);
        if llm_client.is_none() {
            log::info!("No language model configured, event parsing uses fallbacks");
        }
        let parser = NaturalLanguageEventParser::new(llm_client, config.get_llm_model());

        let calendar = CalendarExecutor::new(
            config.clone(),
            parser,
            Arc::new(GoogleCalendarClient::new(&config.calendar, timeout)?),
        );
        let github = GitHubExecutor::new(config.clone(), Arc::new(GitHubClient::new(&config.github, timeout)?));

        Ok(Self::new(vec![Box::new(calendar), Box::new(github)]))
    }

    pub fn executor_for(&self, task: &Task) -> Option<&dyn TaskExecutor> {
        self.executors
            .iter()
            .find(|executor| executor.can_handle(task))
            .map(|executor| executor.as_ref())
    }

    pub fn executor_names(&self) -> Vec<&str> {
        self.executors.iter().map(|executor| executor.name()).collect()
    }

    pub async fn route(&self, task: Task) -> ResultEnvelope {
        match self.executor_for(&task) {
            Some(executor) => {
                log::debug!("Routing '{}' to {}", task.task_type, executor.name());
                executor.execute(task).await
            }
            None => TaskError::validation(
                format!("no executor handles task type '{}'", task.task_type),
                format!(
                    "Mention what to act on (events, meetings, commits, issues, repos). Available: {}",
                    self.executor_names().join(", ")
                ),
            )
            .into(),
        }
    }
}

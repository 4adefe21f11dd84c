pub mod calendar_adapter;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event_parser;
pub mod executor;
pub mod formatter;
pub mod github_adapter;
pub mod intent_classifier;
pub mod llm_client;
pub mod mock_data;
pub mod openai_client;
pub mod router;
pub mod task;
pub mod temporal;

pub use config::Config;
pub use error::{TaskError, TaskResult};
pub use router::TaskRouter;
pub use task::{Intent, ResultEnvelope, Task};

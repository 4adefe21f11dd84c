use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};

use crate::task::Task;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Run calendar and GitHub tasks described in plain language", long_about = None)]
#[clap(propagate_version = true)]
pub struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[clap(short, long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Route a task to its executor and print the result
    Run(RunArgs),
    /// Show which calendar intent a task resolves to
    Classify(ClassifyArgs),
    /// Parse a natural-language event description
    Parse(ParseArgs),
    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// What to do, e.g. "show my events for tomorrow"
    pub description: String,
    /// Task type hint, e.g. create_event or github_commits
    #[clap(short = 't', long = "type", default_value = "")]
    pub task_type: String,
    /// Extra parameters as key=value, repeatable
    #[clap(short, long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,
    /// Print the full result envelope as JSON
    #[clap(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    pub description: String,
    #[clap(short = 't', long = "type", default_value = "")]
    pub task_type: String,
    #[clap(short, long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    pub description: String,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Write a sample config file
    #[clap(long)]
    pub init: bool,
    /// Print the effective configuration
    #[clap(long)]
    pub show: bool,
    /// Set a key in the config file
    #[clap(long, num_args = 2, value_names = ["KEY", "VALUE"])]
    pub set: Option<Vec<String>>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

/// Parameters stay strings; numeric readers parse them on demand
pub fn build_task(task_type: &str, description: &str, params: &[(String, String)]) -> Task {
    let parameters: Map<String, Value> = params
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();

    Task {
        task_type: task_type.to_string(),
        description: description.to_string(),
        parameters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_command_parsing() {
        let cli = Cli::try_parse_from([
            "taskwright",
            "run",
            "--type",
            "delete_event",
            "--param",
            "event_id=abc",
            "-p",
            "limit=5",
            "--json",
            "cancel standup",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.task_type, "delete_event");
        assert_eq!(args.description, "cancel standup");
        assert!(args.json);

        let task = build_task(&args.task_type, &args.description, &args.params);
        assert_eq!(task.param_str("event_id"), Some("abc"));
        assert_eq!(task.param_u64("limit"), Some(5));
    }

    #[test]
    fn test_bad_parameter_is_rejected() {
        assert!(Cli::try_parse_from(["taskwright", "run", "--param", "novalue", "x"]).is_err());
        assert!(parse_key_value("=x").is_err());
        assert_eq!(parse_key_value("q=a=b").unwrap(), ("q".to_string(), "a=b".to_string()));
    }

    #[test]
    fn test_config_set_takes_two_values() {
        let cli = Cli::try_parse_from(["taskwright", "-v", "config", "--set", "timezone", "UTC"]).unwrap();
        assert!(cli.verbose);
        let Commands::Config(args) = cli.command else {
            panic!("expected config");
        };
        assert_eq!(args.set, Some(vec!["timezone".to_string(), "UTC".to_string()]));
    }
}

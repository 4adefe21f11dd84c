use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;

use taskwright::cli::{build_task, Cli, Commands, ConfigArgs};
use taskwright::config::Config;
use taskwright::event_parser::NaturalLanguageEventParser;
use taskwright::intent_classifier::{IntentClassifier, KeywordTables};
use taskwright::openai_client::create_llm_client;
use taskwright::router::TaskRouter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether the command succeeded
async fn run(cli: Cli) -> Result<bool> {
    if let Commands::Config(args) = &cli.command {
        handle_config(args)?;
        return Ok(true);
    }

    let config = Config::load()?;
    config.validate()?;
    let config = Arc::new(config);

    match cli.command {
        Commands::Run(args) => {
            let router = TaskRouter::from_config(config)?;
            let task = build_task(&args.task_type, &args.description, &args.params);
            let envelope = router.route(task).await;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&envelope)?);
            } else if envelope.success {
                println!("{}", envelope.content);
            } else {
                eprintln!("{}", envelope.content);
            }
            Ok(envelope.success)
        }
        Commands::Classify(args) => {
            let classifier = IntentClassifier::new(KeywordTables::with_extra(&config.keywords));
            let task = build_task(&args.task_type, &args.description, &args.params);
            println!("{}", classifier.classify(&task));
            Ok(true)
        }
        Commands::Parse(args) => {
            let parser = NaturalLanguageEventParser::new(create_llm_client(&config), config.get_llm_model());
            if !parser.has_model() {
                eprintln!("⚠️ No language model configured, showing fallback values");
            }
            let event = parser.parse(&args.description, Utc::now(), &config.timezone).await;
            println!("{}", serde_json::to_string_pretty(&event)?);
            Ok(true)
        }
        Commands::Config(_) => Ok(true),
    }
}

fn handle_config(args: &ConfigArgs) -> Result<()> {
    if args.init {
        return Config::create_sample_config();
    }

    if let Some(pair) = &args.set {
        let [key, value] = pair.as_slice() else {
            anyhow::bail!("--set takes exactly a key and a value");
        };
        let mut config = Config::load_file();
        config.set_value(key, value)?;
        config.validate()?;
        config.save()?;
        println!("✅ Set {} in {}", key, Config::get_config_path().display());
        return Ok(());
    }

    if args.show {
        let config = Config::load()?;
        println!("# {}", Config::get_config_path().display());
        println!("{}", toml::to_string_pretty(&config.redacted())?);
        return Ok(());
    }

    println!("Available keys:");
    for key in Config::get_available_keys() {
        println!("  {}", key);
    }
    Ok(())
}

use clap::{Parser, Subcommand};
use taskflow::actions::HandlerRegistry;
use taskflow::compiler::Compiler;
use taskflow::compiler::loader::load_flow_definition_from_yaml;
use taskflow::logging::{self, LogLevel};
use taskflow::runtime::redis_storage::{RedisTaskStore, DEFAULT_KEY_PREFIX};
use taskflow::{Flow, Task, TaskCodec};
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Build, check and persist task flows.", long_about = None)]
struct Cli {
    /// Logging level; falls back to TASKFLOW_LOG, then info.
    #[arg(long, value_enum, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a flow definition, check it and print its tasks in run order
    Check {
        /// Path to the flow YAML file
        file: PathBuf,
    },

    /// Compile a flow definition and save every task to Redis
    Save {
        /// Path to the flow YAML file
        file: PathBuf,

        /// Redis connection URL
        #[arg(long, default_value = "redis://127.0.0.1:6379/0")]
        redis: String,

        /// Prefix for every Redis key written
        #[arg(long, default_value = DEFAULT_KEY_PREFIX)]
        key_prefix: String,
    },

    /// Load a saved task by id and print it
    Show {
        /// Task id (`flow/name`)
        task_id: String,

        /// Redis connection URL
        #[arg(long, default_value = "redis://127.0.0.1:6379/0")]
        redis: String,

        /// Prefix for every Redis key read
        #[arg(long, default_value = DEFAULT_KEY_PREFIX)]
        key_prefix: String,
    },
}

fn compile_file(file: &Path, handlers: &HandlerRegistry) -> Result<Flow> {
    info!("Loading flow from: {:?}", file);
    let definition = load_flow_definition_from_yaml(file)?;
    let compiler = Compiler::new(handlers.clone());
    let flow = compiler
        .compile(definition)
        .with_context(|| format!("Failed to compile {}", file.display()))?;
    Ok(flow)
}

fn open_store(redis: &str, key_prefix: &str) -> Result<RedisTaskStore> {
    let client = redis::Client::open(redis).with_context(|| format!("Invalid Redis URL: {redis}"))?;
    Ok(RedisTaskStore::new(client, key_prefix))
}

fn print_task(flow: &Flow, task: &Task) {
    println!("  - {}", task.id());
    if let Some(handler) = task.handler_name() {
        println!("      fn: {handler}");
    }
    println!("      trigger: {}", task.trigger());
    println!("      retries: {} (delay {:?})", task.retries(), task.retry_delay());
    let upstream = flow.upstream_ids(task.id());
    if !upstream.is_empty() {
        println!("      after: {:?}", upstream);
    }
    if let Some(params) = task.params() {
        println!("      params: {}", serde_json::Value::Object(params.clone()));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level)?;

    let handlers = HandlerRegistry::with_builtins();

    match cli.command {
        Commands::Check { file } => {
            let flow = compile_file(&file, &handlers)?;
            let order = flow.topological_order()?;

            println!("flow {} ({} tasks, {} relationships):", flow.id(), order.len(), flow.edges().len());
            for task in &order {
                print_task(&flow, task);
            }
        }

        Commands::Save { file, redis, key_prefix } => {
            let flow = compile_file(&file, &handlers)?;
            let store = open_store(&redis, &key_prefix)?;

            let records = flow.save(&store).await?;
            for record in &records {
                println!("saved {}", record.id);
            }
            info!("Saved {} tasks of flow {}", records.len(), flow.id());
        }

        Commands::Show { task_id, redis, key_prefix } => {
            let store = open_store(&redis, &key_prefix)?;
            let codec = TaskCodec::new(handlers);

            match Task::from_id(&task_id, &store, &codec).await? {
                Some(task) => {
                    println!("{task}");
                    print_task(task.flow(), &task);
                }
                None => {
                    eprintln!("no task stored under '{task_id}'");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

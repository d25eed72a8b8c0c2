//! Command-line front end for the workbench.
//!
//! State (requests, environments and history) lives in a JSON file that is
//! loaded at startup and written back after commands that change it. Results
//! are printed to stdout as pretty JSON; logs go to stderr.

use clap::{Args, Parser, Subcommand};
use rest_workbench::api::{ActivateBody, ApiEnvelope, ApiError, ExecuteRequestBody, ResolveBody};
use rest_workbench::config::{get_config, load_config_file};
use rest_workbench::history::{
    filter_by_method, filter_by_status, filter_errors, search_history, HistoryRecorder,
    JsonlHistoryStore, DEFAULT_RECENT_LIMIT,
};
use rest_workbench::snapshot::WorkbenchState;
use rest_workbench::{EnvironmentStore, ReqwestTransport, RequestStore, Workbench};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "workbench", version, about = "Execute stored API requests", long_about = None)]
struct Cli {
    /// State file holding requests, environments and history
    #[arg(short, long, default_value = "workbench.json")]
    state: PathBuf,

    /// Configuration file (plain or wrapped in a "rest-workbench" key)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a stored request
    Execute(ExecuteArgs),
    /// Resolve placeholders in text against an environment
    Resolve { environment_id: String, text: String },
    /// Make an environment the active one in its workspace
    Activate {
        environment_id: String,
        #[arg(short, long)]
        workspace: Option<String>,
    },
    Deactivate { environment_id: String },
    /// List environments
    Envs {
        #[arg(short, long)]
        workspace: Option<String>,
    },
    /// List stored requests
    Requests {
        #[arg(long)]
        collection: Option<String>,
    },
    /// Show recorded executions
    History(HistoryArgs),
}

#[derive(Args)]
struct ExecuteArgs {
    request_id: String,

    #[arg(short, long)]
    env: Option<String>,

    #[arg(short, long)]
    url: Option<String>,

    /// Header override as NAME=VALUE; repeatable
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    #[arg(short, long)]
    body: Option<String>,

    /// Record the execution even if history recording is disabled in config
    #[arg(long)]
    record: bool,
}

#[derive(Args)]
struct HistoryArgs {
    #[arg(long, conflicts_with_all = ["collection", "workspace"])]
    request: Option<String>,

    #[arg(long, conflicts_with = "workspace")]
    collection: Option<String>,

    #[arg(long)]
    workspace: Option<String>,

    #[arg(short, long, default_value_t = DEFAULT_RECENT_LIMIT)]
    limit: usize,

    /// Case-insensitive text search
    #[arg(long)]
    search: Option<String>,

    #[arg(short, long)]
    method: Option<String>,

    #[arg(long)]
    status: Option<u16>,

    /// Only failures and error responses
    #[arg(long)]
    errors: bool,
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid header '{}', expected NAME=VALUE", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid header '{}', name is empty", s));
    }
    Ok((name.to_string(), value.to_string()))
}

fn exit_status(status: u16) -> u8 {
    match status {
        200..=299 => 0,
        400 => 2,
        404 => 4,
        _ => 1,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

fn report<T: Serialize>(result: Result<T, ApiError>, message: &str) -> Result<ExitCode, String> {
    let (status, envelope) = ApiEnvelope::respond(result, message);
    print_json(&envelope)?;
    Ok(ExitCode::from(exit_status(status)))
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, String> {
    if let Some(path) = &cli.config {
        load_config_file(path).map_err(|e| e.to_string())?;
    }
    let config = get_config();

    let state = WorkbenchState::load(&cli.state).map_err(|e| e.to_string())?;
    let (requests, environments, history) = state.into_stores();
    let requests = Arc::new(requests);
    let environments = Arc::new(environments);
    let state_history =
        Arc::new(history.with_sanitized_headers(config.sanitize_history_headers));

    let recorder: Arc<dyn HistoryRecorder> = match JsonlHistoryStore::from_global_config() {
        Some(store) => Arc::new(store),
        None => state_history.clone(),
    };

    let transport = ReqwestTransport::from_global_config().map_err(|e| e.to_string())?;
    let workbench = Workbench::new(requests.clone(), environments.clone(), Arc::new(transport))
        .with_history(recorder.clone());

    let (code, changed) = match cli.command {
        Commands::Execute(args) => {
            let record = args.record || config.record_history;
            let workbench = workbench.with_recording(record);
            let headers: HashMap<String, String> = args.headers.into_iter().collect();
            let body = ExecuteRequestBody {
                environment_id: args.env,
                override_url: args.url,
                override_headers: (!headers.is_empty()).then_some(headers),
                override_body: args.body,
                ..ExecuteRequestBody::default()
            };
            let result = workbench.execute_request(&args.request_id, body).await;
            (report(result, "Request executed successfully")?, record)
        }
        Commands::Resolve {
            environment_id,
            text,
        } => {
            let result = workbench.resolve_variables(&environment_id, ResolveBody { text: Some(text) });
            (report(result, "Variables resolved successfully")?, false)
        }
        Commands::Activate {
            environment_id,
            workspace,
        } => {
            let body = ActivateBody {
                workspace_id: workspace,
            };
            let result = workbench.activate_environment(&environment_id, body);
            (report(result, "Environment activated successfully")?, true)
        }
        Commands::Deactivate { environment_id } => {
            let result = workbench.deactivate_environment(&environment_id);
            (report(result, "Environment deactivated successfully")?, true)
        }
        Commands::Envs { workspace } => {
            let list = match workspace {
                Some(ws) => environments.list_by_workspace(&ws),
                None => environments.list_all(),
            };
            let result = list.map_err(ApiError::from);
            (report(result, "Environments retrieved successfully")?, false)
        }
        Commands::Requests { collection } => {
            let list = match collection {
                Some(id) => requests.list_by_collection(&id),
                None => requests.list_all(),
            };
            let result = list.map_err(ApiError::from);
            (report(result, "Requests retrieved successfully")?, false)
        }
        Commands::History(args) => {
            let result = query_history(recorder.as_ref(), args)
                .map_err(|e| ApiError::Internal(e.to_string()));
            (report(result, "History retrieved successfully")?, false)
        }
    };

    if changed {
        WorkbenchState::capture(requests.as_ref(), environments.as_ref(), state_history.as_ref())
            .and_then(|state| state.save(&cli.state))
            .map_err(|e| e.to_string())?;
    }

    Ok(code)
}

fn query_history(
    recorder: &dyn HistoryRecorder,
    args: HistoryArgs,
) -> Result<Vec<rest_workbench::RequestHistoryEntry>, rest_workbench::history::HistoryError> {
    let mut entries = if let Some(id) = &args.request {
        recorder.list_by_request(id)?
    } else if let Some(id) = &args.collection {
        recorder.list_by_collection(id)?
    } else if let Some(id) = &args.workspace {
        recorder.list_by_workspace(id)?
    } else {
        recorder.list_recent(args.limit)?
    };

    if let Some(query) = &args.search {
        entries = search_history(query, &entries);
    }
    if let Some(method) = &args.method {
        entries = filter_by_method(method, &entries);
    }
    if let Some(status) = args.status {
        entries = filter_by_status(status, &entries);
    }
    if args.errors {
        entries = filter_errors(&entries);
    }
    entries.truncate(args.limit);
    Ok(entries)
}

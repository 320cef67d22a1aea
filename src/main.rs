//! Flowwarden CLI Entry Point
//!
//! Loads workflow definitions and runs an operator console on stdin.
//!
//! # Usage
//!
//! ```bash
//! # Watch the workflows in ./workflows.yaml
//! flowwarden
//!
//! # Use another definitions file
//! flowwarden config/workflows.yaml
//!
//! # Give notification endpoints 30 seconds to answer
//! flowwarden workflows.yaml --notify-timeout 30
//! ```
//!
//! Console commands:
//!
//! ```text
//! start <workflow>      Start a run
//! advance <run_id>      Move a run to its next step
//! complete <run_id>     Finish a run successfully
//! show <run_id>         Print a run
//! runs [status] [name]  List runs
//! workflows             List defined workflows
//! quit                  Drain watchdogs and exit
//! ```

use std::env;
use std::process::ExitCode;
use std::time::Duration;

use colored::{ColoredString, Colorize};
use log::{error, info};
use tokio::sync::mpsc;

use flowwarden::execution::{HttpNotifier, RunsFilter, DEFAULT_NOTIFY_TIMEOUT};
use flowwarden::{load_definitions, Engine, MemoryStore, RunSnapshot, RunStatus};
use flowwarden::{APP_NAME, VERSION};

/// Default definitions file used when none is specified.
const DEFAULT_DEFINITIONS: &str = "workflows.yaml";

/// Command-line configuration parsed from arguments.
#[derive(Debug, PartialEq)]
struct Config {
    definitions_path: String,
    notify_timeout: Duration,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            definitions_path: DEFAULT_DEFINITIONS.to_string(),
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("Workflow Deadline Orchestration");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: flowwarden [OPTIONS] [WORKFLOWS_FILE]");
    println!();
    println!("Arguments:");
    println!(
        "  [WORKFLOWS_FILE]        Workflow definitions YAML (default: {})",
        DEFAULT_DEFINITIONS
    );
    println!();
    println!("Options:");
    println!(
        "  --notify-timeout SECS   Notification request timeout (default: {})",
        DEFAULT_NOTIFY_TIMEOUT.as_secs()
    );
    println!("  --verbose               Enable debug logging");
    println!("  --help                  Show this help message");
    println!("  --version               Show version information");
    println!();
    println!("Examples:");
    println!("  flowwarden workflows.yaml");
    println!("  flowwarden workflows.yaml --notify-timeout 30 --verbose");
}

/// Prints the console command reference.
fn print_commands() {
    println!("Commands:");
    println!("  start <workflow>                          Start a run");
    println!("  advance <run_id>                          Move a run to its next step");
    println!("  complete <run_id>                         Finish a run successfully");
    println!("  show <run_id>                             Print a run");
    println!("  runs [ongoing|completed|failed] [name]    List runs");
    println!("  workflows                                 List defined workflows");
    println!("  help                                      Show this list");
    println!("  quit                                      Drain watchdogs and exit");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut positional_index = 0;
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--notify-timeout" => {
                i += 1;
                if i >= args.len() {
                    return Err("--notify-timeout requires a number of seconds".to_string());
                }
                let secs: u64 = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid notify timeout: {}", args[i]))?;
                if secs == 0 {
                    return Err("--notify-timeout must be at least 1 second".to_string());
                }
                config.notify_timeout = Duration::from_secs(secs);
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                match positional_index {
                    0 => config.definitions_path = arg.clone(),
                    _ => return Err(format!("Unexpected argument: {}", arg)),
                }
                positional_index += 1;
            }
        }
        i += 1;
    }

    Ok(config)
}

/// A single operator console command.
#[derive(Debug, PartialEq)]
enum Command {
    Start(String),
    Advance(String),
    Complete(String),
    Show(String),
    Runs {
        status: Option<RunStatus>,
        workflow: Option<String>,
    },
    Workflows,
    Help,
    Quit,
}

/// Parses one console line. Blank lines yield `None`.
fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(keyword) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let single = |what: &str| -> Result<String, String> {
        match args.as_slice() {
            [value] => Ok(value.to_string()),
            _ => Err(format!("Usage: {} <{}>", keyword, what)),
        }
    };

    let command = match keyword {
        "start" => Command::Start(single("workflow")?),
        "advance" => Command::Advance(single("run_id")?),
        "complete" => Command::Complete(single("run_id")?),
        "show" => Command::Show(single("run_id")?),
        "runs" => parse_runs(&args)?,
        "workflows" => Command::Workflows,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command: {} (try 'help')", other)),
    };

    Ok(Some(command))
}

fn parse_runs(args: &[&str]) -> Result<Command, String> {
    match args {
        [] => Ok(Command::Runs {
            status: None,
            workflow: None,
        }),
        [first] => match first.parse::<RunStatus>() {
            Ok(status) => Ok(Command::Runs {
                status: Some(status),
                workflow: None,
            }),
            Err(_) => Ok(Command::Runs {
                status: None,
                workflow: Some(first.to_string()),
            }),
        },
        [status, workflow] => Ok(Command::Runs {
            status: Some(status.parse()?),
            workflow: Some(workflow.to_string()),
        }),
        _ => Err("Usage: runs [ongoing|completed|failed] [workflow]".to_string()),
    }
}

fn paint_status(status: RunStatus) -> ColoredString {
    match status {
        RunStatus::Ongoing => status.as_str().blue(),
        RunStatus::Completed => status.as_str().green(),
        RunStatus::Failed => status.as_str().red(),
    }
}

fn print_run(engine: &Engine, run_id: &str, run: &RunSnapshot) {
    let step_name = engine
        .workflows()
        .step(&run.workflow_name, run.current_step)
        .map(|step| step.name.as_str())
        .unwrap_or("undefined");

    println!("Run:      {}", run_id);
    println!("Workflow: {}", run.workflow_name);
    println!("Step:     {} ({})", run.current_step, step_name);
    println!("Status:   {}", paint_status(run.status()));
    println!("Started:  {}", run.start.to_rfc3339());
    if let Some(end) = run.end {
        println!("Ended:    {}", end.to_rfc3339());
    }
    if let Some(duration) = run.duration() {
        println!("Duration: {}ms", duration.num_milliseconds());
    }
}

/// Executes one console command. Returns false when the console should stop.
fn execute(engine: &Engine, command: Command) -> bool {
    let result = match command {
        Command::Start(workflow) => engine.initiate_workflow(&workflow).map(|run_id| {
            if engine.workflows().get_workflow(&workflow).is_none() {
                println!("{} workflow '{}' is not defined", "Warning:".yellow(), workflow);
            }
            println!("{}", run_id);
        }),
        Command::Advance(run_id) => engine
            .update_workflow(&run_id)
            .map(|step| println!("{} now at step {}", run_id, step)),
        Command::Complete(run_id) => engine
            .complete_workflow(&run_id)
            .map(|()| println!("{} {}", run_id, paint_status(RunStatus::Completed))),
        Command::Show(run_id) => {
            match engine.run(&run_id) {
                Some(run) => print_run(engine, &run_id, &run),
                None => println!("{} no data found for run ID: {}", "Error:".red(), run_id),
            }
            Ok(())
        }
        Command::Runs { status, workflow } => {
            let page = engine.list_runs(&RunsFilter {
                status,
                workflow_name: workflow,
                ..RunsFilter::default()
            });
            for run in &page.runs {
                println!(
                    "{}  {:<20} step {:<3} {}",
                    run.run_id,
                    run.workflow_name,
                    run.current_step,
                    paint_status(run.status)
                );
            }
            println!(
                "{} of {} runs (page {}/{})",
                page.runs.len(),
                page.total,
                page.page,
                page.total_pages
            );
            Ok(())
        }
        Command::Workflows => {
            for (name, workflow) in engine.workflows().iter() {
                println!("{:<24} {} steps", name, workflow.len());
            }
            Ok(())
        }
        Command::Help => {
            print_commands();
            Ok(())
        }
        Command::Quit => return false,
    };

    if let Err(e) = result {
        let label = if e.is_client_error() {
            "Rejected:".yellow()
        } else {
            "Error:".red()
        };
        println!("{} {}", label, e);
    }

    true
}

/// Forwards stdin lines from a dedicated thread; the channel closes on EOF.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);

    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    rx
}

/// Reads and executes console commands until quit, end of input or Ctrl-C.
async fn console(engine: &Engine) {
    let mut lines = spawn_stdin_reader();
    print_commands();

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else {
                    info!("End of input");
                    break;
                };
                match parse_command(&line) {
                    Ok(Some(command)) => {
                        if !execute(engine, command) {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{} {}", "Error:".red(), e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                info!("Interrupted");
                break;
            }
        }
    }
}

/// Main application entry point.
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    // Setup logging
    setup_logging(config.verbose);

    // Print banner
    print_banner();

    // Load definitions
    info!("Loading workflows: {}", config.definitions_path);
    let definitions = load_definitions(&config.definitions_path).map_err(|e| {
        error!("Failed to load workflows: {}", e);
        format!(
            "Could not load workflows from '{}': {}",
            config.definitions_path, e
        )
    })?;

    info!("Workflows loaded: {}", definitions.names().join(", "));

    // Create engine
    let notifier = HttpNotifier::with_timeout(config.notify_timeout)?;
    let engine = Engine::new(
        definitions,
        std::sync::Arc::new(MemoryStore::new()),
        std::sync::Arc::new(notifier),
    );

    console(&engine).await;

    engine.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

//! Mudra CLI - Command-line interface for Mudra Flow
//!
//! Commands:
//! - replay: Run recorded landmark frames (and telemetry) through a session
//! - telemetry: Turn sensor lines from stdin into biometric snapshots
//! - config: Print the default engine configuration
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use mudra_flow::{
    parse_line, BiometricEstimator, Detection, EngineConfig, FlowError, SessionEngine,
    MUDRA_FLOW_VERSION, PRODUCER_NAME,
};
use tracing::{debug, info};

/// Mudra - Real-time biofeedback core for webcam meditation sessions
#[derive(Parser)]
#[command(name = "mudra")]
#[command(version = MUDRA_FLOW_VERSION)]
#[command(about = "Replay and inspect mudra meditation sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run recorded landmark frames through a session
    Replay {
        /// NDJSON frames, one `{"timestamp_ms", "hands", "face"}` object per line (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Telemetry lines prefixed with a timestamp, e.g. `1500 BPM:72,SpO2:98`
        #[arg(short, long)]
        telemetry: Option<PathBuf>,

        /// Engine configuration JSON
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only print the final session report
        #[arg(long)]
        report_only: bool,
    },

    /// Parse telemetry lines from stdin and print biometric snapshots
    Telemetry {
        /// Lines carry a leading millisecond timestamp instead of using the wall clock
        #[arg(long)]
        timestamped: bool,

        /// Engine configuration JSON (telemetry section is used)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the default engine configuration
    Config,

    /// Diagnose configuration and environment
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// One recorded frame
#[derive(serde::Deserialize)]
struct ReplayFrame {
    timestamp_ms: u64,
    #[serde(flatten)]
    detection: Detection,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), MudraCliError> {
    match cli.command {
        Commands::Replay {
            input,
            telemetry,
            config,
            report_only,
        } => cmd_replay(&input, telemetry.as_deref(), config.as_deref(), report_only),

        Commands::Telemetry {
            timestamped,
            config,
        } => cmd_telemetry(timestamped, config.as_deref()),

        Commands::Config => cmd_config(),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, MudraCliError> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            Ok(EngineConfig::from_json(&json)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Split a `<timestamp_ms> <line>` record
fn split_timestamped(record: &str) -> Result<(u64, &str), MudraCliError> {
    let (ts, line) = record
        .split_once(char::is_whitespace)
        .ok_or_else(|| MudraCliError::ParseError(format!("Missing timestamp: {record}")))?;
    let ts = ts
        .parse::<u64>()
        .map_err(|e| MudraCliError::ParseError(format!("Bad timestamp '{ts}': {e}")))?;
    Ok((ts, line.trim()))
}

fn cmd_replay(
    input: &Path,
    telemetry: Option<&Path>,
    config: Option<&Path>,
    report_only: bool,
) -> Result<(), MudraCliError> {
    let config = load_config(config)?;

    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let mut frames = Vec::new();
    for (index, line) in input_data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let frame: ReplayFrame = serde_json::from_str(trimmed).map_err(|e| {
            MudraCliError::ParseError(format!("Failed to parse frame {}: {}", index + 1, e))
        })?;
        frames.push(frame);
    }
    if frames.is_empty() {
        return Err(MudraCliError::NoFrames);
    }

    let mut readings = Vec::new();
    if let Some(path) = telemetry {
        for record in fs::read_to_string(path)?.lines() {
            if record.trim().is_empty() {
                continue;
            }
            let (ts, line) = split_timestamped(record.trim())?;
            readings.push((ts, line.to_string()));
        }
        readings.sort_by_key(|(ts, _)| *ts);
    }

    let mut estimator = BiometricEstimator::new(config.telemetry.clone());
    estimator.set_connected(telemetry.is_some());
    let mut engine = SessionEngine::new(config);
    info!(session_id = engine.session_id(), frames = frames.len(), "replay started");

    let mut stdout = io::stdout();
    let mut pending = readings.into_iter().peekable();

    for frame in frames {
        let now_ms = frame.timestamp_ms;
        let mut events = Vec::new();

        while let Some((ts, line)) = pending.next_if(|(ts, _)| *ts <= now_ms) {
            if let Some(snapshot) = parse_line(&line).and_then(|l| estimator.ingest(&l, ts)) {
                events.extend(engine.apply_biometrics(snapshot));
            } else {
                debug!(ts, line = %line, "ignored telemetry line");
            }
        }
        if let Some(snapshot) = estimator.tick(now_ms) {
            events.extend(engine.apply_biometrics(snapshot));
        }

        let mut output = engine.process_frame(&frame.detection, now_ms);
        events.append(&mut output.events);
        output.events = events;

        if !report_only {
            writeln!(stdout, "{}", serde_json::to_string(&output)?)?;
        }
    }

    let report = engine.report();
    writeln!(stdout, "{}", serde_json::to_string(&report)?)?;
    stdout.flush()?;
    Ok(())
}

fn cmd_telemetry(timestamped: bool, config: Option<&Path>) -> Result<(), MudraCliError> {
    let config = load_config(config)?;
    let mut estimator = BiometricEstimator::new(config.telemetry);
    estimator.set_connected(true);

    let started = Instant::now();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for record in BufReader::new(stdin.lock()).lines() {
        let record = record?;
        let trimmed = record.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (now_ms, line) = if timestamped {
            split_timestamped(trimmed)?
        } else {
            (started.elapsed().as_millis() as u64, trimmed)
        };

        if let Some(snapshot) = estimator.tick(now_ms) {
            writeln!(stdout, "{}", serde_json::to_string(&snapshot)?)?;
        }
        match parse_line(line).and_then(|l| estimator.ingest(&l, now_ms)) {
            Some(snapshot) => {
                writeln!(stdout, "{}", serde_json::to_string(&snapshot)?)?;
                stdout.flush()?;
            }
            None => debug!(line, "ignored telemetry line"),
        }
    }

    Ok(())
}

fn cmd_config() -> Result<(), MudraCliError> {
    println!("{}", EngineConfig::default().to_json()?);
    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), MudraCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Mudra Flow version {}", MUDRA_FLOW_VERSION),
    });

    if let Some(config_path) = config {
        if config_path.exists() {
            match fs::read_to_string(config_path) {
                Ok(content) => match EngineConfig::from_json(&content) {
                    Ok(config) => checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Config valid (gesture window {} ms, max level {})",
                            config.debounce.gesture_stability_ms, config.progression.max_level
                        ),
                    }),
                    Err(e) => checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Invalid config: {}", e),
                    }),
                },
                Err(e) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                }),
            }
        } else {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist".to_string(),
            });
        }
    }

    // Telemetry streaming reads stdin
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (telemetry streaming ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: MUDRA_FLOW_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Mudra Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(MudraCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum MudraCliError {
    Io(io::Error),
    Flow(FlowError),
    Json(serde_json::Error),
    NoFrames,
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for MudraCliError {
    fn from(e: io::Error) -> Self {
        MudraCliError::Io(e)
    }
}

impl From<FlowError> for MudraCliError {
    fn from(e: FlowError) -> Self {
        MudraCliError::Flow(e)
    }
}

impl From<serde_json::Error> for MudraCliError {
    fn from(e: serde_json::Error) -> Self {
        MudraCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MudraCliError> for CliError {
    fn from(e: MudraCliError) -> Self {
        match e {
            MudraCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            MudraCliError::Flow(FlowError::ConfigError(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'mudra config' to see valid defaults".to_string()),
            },
            MudraCliError::Flow(e) => CliError {
                code: "FLOW_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check that frames carry 21 hand points and 468+ face points".to_string()),
            },
            MudraCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            MudraCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frames found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            MudraCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            MudraCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cnhcheck_client::image::decode_base64;
use cnhcheck_client::{ClientConfig, IdentityClient, ImageInput, LivenessUiConfig};
use cnhcheck_core::{DocumentSource, ExtractedIdentityRecord, StepOutcome, StepStatus};
use serde::Serialize;
use tracing::{error, info, info_span};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod display;
mod steps;

use display::Card;

#[derive(Parser, Debug)]
#[command(name = "cnhcheck")]
#[command(about = "Verify a CNH driver's license against its QR code, liveness and face match")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Identity provider base URL
    #[arg(
        long,
        global = true,
        env = "CNHCHECK_BASE_URL",
        default_value = cnhcheck_client::config::DEFAULT_BASE_URL
    )]
    base_url: String,

    /// Provider client key, exchanged for an access token per run
    #[arg(long, global = true, env = "CNHCHECK_CLIENT_KEY", hide_env_values = true)]
    client_key: Option<String>,

    /// Timeout for provider calls, in seconds
    #[arg(long, global = true, env = "CNHCHECK_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Timeout for authentication, in seconds
    #[arg(long, global = true, env = "CNHCHECK_AUTH_TIMEOUT_SECS", default_value_t = 10)]
    auth_timeout_secs: u64,

    /// Print the step outcome as JSON instead of a text card
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract identity fields from the front of the card
    ExtractFront(ExtractArgs),
    /// Extract identity fields from the QR code on the back of the card
    ExtractQr(ExtractArgs),
    /// Create a liveness session and print its URL
    LivenessStart {
        /// Webhook the provider calls when the session finishes
        #[arg(long, env = "CNHCHECK_LIVENESS_WEBHOOK")]
        webhook_url: String,
        /// Where to send the user after the capture
        #[arg(long)]
        redirect_url: Option<String>,
        #[arg(long)]
        theme: Option<String>,
        #[arg(long)]
        primary_color: Option<String>,
        #[arg(long)]
        language: Option<String>,
    },
    /// Query a liveness session once
    LivenessStatus {
        #[arg(long)]
        process_id: String,
        /// Write the frontal face capture here, if the provider returned one
        #[arg(long)]
        frontal_out: Option<PathBuf>,
    },
    /// Compare two face images
    Facematch {
        #[arg(long)]
        face_a: String,
        #[arg(long)]
        face_b: String,
    },
    /// Reconcile two saved extraction records with the biometric scores
    Reconcile {
        /// Front record, as written by `extract-front --out`
        #[arg(long)]
        front: PathBuf,
        /// QR record, as written by `extract-qr --out`
        #[arg(long)]
        qr: PathBuf,
        /// Liveness score, percent
        #[arg(long)]
        liveness_score: f64,
        /// Face similarity, percent
        #[arg(long)]
        facematch_score: f64,
        #[arg(long)]
        facematch_approved: bool,
    },
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Image path, base64 text, or `-` for stdin
    #[arg(long)]
    image: String,
    /// Save the extracted record as JSON for a later `reconcile`
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Cli { global, command } = Cli::parse();

    let status = match run(&global, command).await {
        Ok(status) => status,
        Err(e) => {
            error!(error = %format!("{e:#}"), "step failed");
            emit(&global, &failure(&e))?
        }
    };
    Ok(exit_code(status))
}

/// Failures outside a provider call still answer with an error outcome.
fn failure(err: &anyhow::Error) -> StepOutcome<()> {
    StepOutcome::error(format!("{err:#}"))
}

async fn run(global: &GlobalArgs, command: Command) -> Result<StepStatus> {
    let status = match command {
        Command::ExtractFront(args) => run_extract(global, DocumentSource::Front, args).await?,
        Command::ExtractQr(args) => run_extract(global, DocumentSource::Qr, args).await?,
        Command::LivenessStart {
            webhook_url,
            redirect_url,
            theme,
            primary_color,
            language,
        } => {
            let mut ui = LivenessUiConfig::default();
            if let Some(theme) = theme {
                ui.theme = theme;
            }
            if let Some(color) = primary_color {
                ui.primary_color = color;
            }
            if let Some(language) = language {
                ui.default_language = language;
            }
            ui.redirect_url = redirect_url;

            let client = client(global, "liveness-start")?;
            let outcome = match steps::authenticate(&client, &client_key(global)?).await {
                Ok(token) => steps::start_liveness(&client, &token, &webhook_url, &ui).await,
                Err(outcome) => outcome,
            };
            emit(global, &outcome)?
        }
        Command::LivenessStatus {
            process_id,
            frontal_out,
        } => {
            let client = client(global, "liveness-status")?;
            let outcome = match steps::authenticate(&client, &client_key(global)?).await {
                Ok(token) => steps::liveness_status(&client, &token, &process_id).await,
                Err(outcome) => outcome,
            };
            if let (Some(path), Some(image)) = (
                frontal_out,
                outcome.data.as_ref().and_then(|d| d.frontal_image.as_deref()),
            ) {
                write_image(&path, image)?;
            }
            emit(global, &outcome)?
        }
        Command::Facematch { face_a, face_b } => {
            let client = client(global, "facematch")?;
            let outcome = match steps::authenticate(&client, &client_key(global)?).await {
                Ok(token) => {
                    steps::face_match(&client, &token, image_arg(&face_a)?, image_arg(&face_b)?)
                        .await
                }
                Err(outcome) => outcome,
            };
            emit(global, &outcome)?
        }
        Command::Reconcile {
            front,
            qr,
            liveness_score,
            facematch_score,
            facematch_approved,
        } => {
            let _span = info_span!("workflow", step = "reconcile").entered();
            let front = load_record(&front)?;
            let qr = load_record(&qr)?;
            let outcome = steps::final_validation(
                &front,
                &qr,
                liveness_score,
                facematch_score,
                facematch_approved,
            );
            emit(global, &outcome)?
        }
    };
    Ok(status)
}

async fn run_extract(
    global: &GlobalArgs,
    source: DocumentSource,
    args: ExtractArgs,
) -> Result<StepStatus> {
    let step = match source {
        DocumentSource::Front => "extract-front",
        DocumentSource::Qr => "extract-qr",
    };
    let client = client(global, step)?;
    let image = image_arg(&args.image)?;
    let outcome = match steps::authenticate(&client, &client_key(global)?).await {
        Ok(token) => steps::extract(&client, &token, source, image).await,
        Err(outcome) => outcome,
    };

    if let (Some(path), Some(data)) = (&args.out, &outcome.data) {
        save_record(path, &data.record)?;
        info!(path = %path.display(), "record saved");
    }
    emit(global, &outcome)
}

fn client(global: &GlobalArgs, step: &'static str) -> Result<IdentityClient> {
    let mut config = ClientConfig::with_base_url(&global.base_url);
    config.request_timeout = Duration::from_secs(global.timeout_secs);
    config.auth_timeout = Duration::from_secs(global.auth_timeout_secs);
    let client = IdentityClient::new(config).context("failed to build HTTP client")?;
    Ok(client.with_span(info_span!("workflow", step)))
}

fn client_key(global: &GlobalArgs) -> Result<String> {
    global
        .client_key
        .clone()
        .context("no client key: pass --client-key or set CNHCHECK_CLIENT_KEY")
}

/// `-` reads the image from stdin; anything else is a path or base64 text.
fn image_arg(arg: &str) -> Result<ImageInput> {
    if arg == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read image from stdin")?;
        return Ok(ImageInput::Bytes(buf));
    }
    Ok(ImageInput::Text(arg.to_string()))
}

fn load_record(path: &Path) -> Result<ExtractedIdentityRecord> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a record", path.display()))
}

fn save_record(path: &Path, record: &ExtractedIdentityRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

fn write_image(path: &Path, base64: &str) -> Result<()> {
    let bytes = decode_base64(base64).context("frontal image is not valid base64")?;
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

fn emit<T: Card + Serialize>(
    global: &GlobalArgs,
    outcome: &StepOutcome<T>,
) -> Result<StepStatus> {
    if global.json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        print!("{}", display::render(outcome));
    }
    Ok(outcome.status)
}

fn exit_code(status: StepStatus) -> ExitCode {
    match status {
        StepStatus::Success => ExitCode::SUCCESS,
        StepStatus::Warning => ExitCode::from(2),
        StepStatus::Error => ExitCode::FAILURE,
    }
}

mod display;
mod session;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use casetrack_core::MarkerRecord;
use casetrack_geo::{FallbackConfig, Geocoder, KakaoGeocoder, OfflineGeocoder, PathBuilder};
use casetrack_monitor::{JobMonitor, MonitorConfig, TransientPolicy};
use casetrack_sync::{AnalysisRequest, CaseClient, DEFAULT_BASE_URL, NewMarker};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use session::{CaseView, WatchOutcome};

#[derive(Parser)]
#[command(name = "casetrack", version, about = "Track suspect movement across CCTV analysis results")]
struct Cli {
    /// API root of the case backend.
    #[arg(long, env = "CASETRACK_API_URL", default_value = DEFAULT_BASE_URL, global = true)]
    api_url: String,

    /// Bearer token for the case backend.
    #[arg(long, env = "CASETRACK_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Kakao REST API key; without it every address falls back near the map centre.
    #[arg(long, env = "KAKAO_REST_API_KEY", hide_env_values = true, global = true)]
    kakao_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List a case's markers in tracking order with rank and class.
    Markers {
        case: String,
        /// Highlight one marker.
        #[arg(long)]
        select: Option<String>,
    },
    /// Resolve marker positions and print the movement path.
    Path {
        case: String,
        #[arg(long)]
        select: Option<String>,
    },
    /// Follow a running analysis job, then print the updated path. Ctrl-C cancels.
    Watch {
        case: String,
        job: String,
        #[command(flatten)]
        poll: PollArgs,
    },
    /// Upload CCTV footage for analysis and follow the job.
    Analyze {
        case: String,
        /// Video file to upload.
        #[arg(long)]
        video: PathBuf,
        /// Where the footage was recorded.
        #[arg(long)]
        location: String,
        /// RFC 3339 timestamp of the incident.
        #[arg(long)]
        incident_time: DateTime<Utc>,
        #[arg(long, default_value = "")]
        description: String,
        #[command(flatten)]
        poll: PollArgs,
    },
    /// Place a marker by hand.
    AddMarker {
        case: String,
        #[arg(long)]
        location: String,
        /// RFC 3339 timestamp of the sighting.
        #[arg(long)]
        detected_at: DateTime<Utc>,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long, default_value_t = 1.0)]
        confidence: f32,
        #[arg(long)]
        unconfirmed: bool,
        #[arg(long)]
        excluded: bool,
        #[arg(long, requires = "lng")]
        lat: Option<f64>,
        #[arg(long, requires = "lat")]
        lng: Option<f64>,
        /// Photo of the suspect at this location.
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Check the backend's AI services.
    Health,
}

#[derive(Args)]
struct PollArgs {
    /// Seconds between status checks.
    #[arg(long, env = "CASETRACK_POLL_INTERVAL_SECS", default_value_t = 3)]
    poll_interval: u64,
    /// Status checks before giving up.
    #[arg(long, env = "CASETRACK_MAX_ATTEMPTS", default_value_t = 100)]
    max_attempts: u32,
    /// Keep polling through network errors instead of stopping.
    #[arg(long)]
    retry_transient: bool,
}

impl PollArgs {
    fn to_config(&self) -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_secs(self.poll_interval.max(1)),
            max_attempts: self.max_attempts.max(1),
            transient: if self.retry_transient {
                TransientPolicy::Retry
            } else {
                TransientPolicy::Fatal
            },
            ..MonitorConfig::default()
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    info!("casetrack v{}", env!("CARGO_PKG_VERSION"));

    let mut client = CaseClient::new(cli.api_url.clone());
    if let Some(token) = &cli.token {
        client = client.with_token(token.clone());
    }
    let client = Arc::new(client);

    match cli.command {
        Command::Markers { ref case, ref select } => {
            let mut view = CaseView::new(client.clone(), case, path_builder(&cli));
            let mut states = view.reload().await?;
            if let Some(id) = select {
                states = view.select(id);
            }
            print!("{}", display::marker_table(view.markers(), &states));
            println!();
            println!("{}", display::stats_line(&view.stats()));
        }
        Command::Path { ref case, ref select } => {
            let mut view = CaseView::new(client.clone(), case, path_builder(&cli));
            let mut states = view.reload().await?;
            if let Some(id) = select {
                states = view.select(id);
            }
            print!("{}", display::marker_table(view.markers(), &states));
            println!();
            print_path(&mut view).await;
        }
        Command::Watch {
            ref case,
            ref job,
            ref poll,
        } => {
            let monitor = JobMonitor::new(client.clone(), poll.to_config());
            let mut view = CaseView::new(client.clone(), case, path_builder(&cli));
            follow_job(&mut view, &monitor, job).await?;
        }
        Command::Analyze {
            ref case,
            ref video,
            ref location,
            incident_time,
            ref description,
            ref poll,
        } => {
            let request = AnalysisRequest {
                location_name: location.clone(),
                incident_time,
                suspect_description: description.clone(),
                video: video.clone(),
            };
            let job = client
                .submit_analysis(case, request)
                .await
                .context("submitting footage for analysis")?;
            println!("analysis started: {job}");

            let monitor = JobMonitor::new(client.clone(), poll.to_config());
            let mut view = CaseView::new(client.clone(), case, path_builder(&cli));
            follow_job(&mut view, &monitor, &job).await?;
        }
        Command::AddMarker {
            ref case,
            ref location,
            detected_at,
            ref comment,
            confidence,
            unconfirmed,
            excluded,
            lat,
            lng,
            ref image,
        } => {
            let mut marker = NewMarker::new(location.clone(), detected_at);
            marker.police_comment = comment.clone();
            marker.confidence_score = confidence.clamp(0.0, 1.0);
            marker.is_confirmed = !unconfirmed;
            marker.is_excluded = excluded;
            marker.latitude = lat;
            marker.longitude = lng;
            marker.suspect_image = image.clone();

            let record: MarkerRecord = client
                .create_marker(case, marker)
                .await
                .context("creating marker")?;
            println!("marker {} created at {}", record.id, record.location_name);
        }
        Command::Health => {
            let health = client.ai_health().await.context("checking AI services")?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
    }

    Ok(())
}

fn path_builder(cli: &Cli) -> PathBuilder {
    let geocoder: Arc<dyn Geocoder> = match &cli.kakao_key {
        Some(key) if !key.trim().is_empty() => Arc::new(KakaoGeocoder::new(key.trim())),
        _ => {
            info!("no Kakao key; markers without coordinates use fallback positions");
            Arc::new(OfflineGeocoder)
        }
    };
    PathBuilder::new(geocoder, FallbackConfig::default())
}

async fn print_path(view: &mut CaseView) {
    println!("Resolving positions...");
    let render = view
        .build_path(|point| println!("{}", display::point_line(point)))
        .await;
    if let Some(render) = render {
        println!();
        print!("{}", display::path_card(render));
    }
}

async fn follow_job(view: &mut CaseView, monitor: &JobMonitor, job: &str) -> anyhow::Result<()> {
    match view.watch(monitor, job).await {
        WatchOutcome::Completed(results) => {
            print!("{}", display::results_summary(&results));
            println!();
            let states = view.reload().await?;
            print!("{}", display::marker_table(view.markers(), &states));
            println!();
            print_path(view).await;
            Ok(())
        }
        WatchOutcome::Failed(e) => Err(e).with_context(|| format!("analysis job {job}")),
        WatchOutcome::Cancelled => {
            println!("monitoring of {job} cancelled");
            Ok(())
        }
    }
}

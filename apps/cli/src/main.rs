use std::{path::PathBuf, sync::Arc, time::Instant};

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use console::style;
use tracing::debug;
use tracing_subscriber::{EnvFilter, prelude::*};
use vidreport_core::{
    AnalysisRequest, Pipeline, PipelineConfig, PipelineDeps, Provider, ReportService,
    format_report_readable,
    services::{
        ChatModel, FsTextStorage, MemoryJobStore, ProgressSink, TranscriptProvider,
        VidcapTranscripts, YtDlpMetadata, YtDlpTranscripts,
    },
};

use crate::progress::{FanOut, SpinnerProgress, format_duration};

mod progress;

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Grok,
    Openai,
    Gemini,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Grok => Provider::Grok,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Gemini => Provider::Gemini,
        }
    }
}

#[derive(Clone, Default, ValueEnum)]
enum TranscriptSource {
    /// Subtitles downloaded with yt-dlp
    #[default]
    YtDlp,
    /// Hosted caption API (needs VIDCAP_API_KEY)
    Vidcap,
}

#[derive(Parser)]
#[command(name = "vidreport")]
#[command(about = "Turn a video transcript into an illustrated, AI-generated report")]
struct Cli {
    /// Video URL
    url: String,

    /// AI provider for summaries and report structure
    #[arg(short, long, default_value = "grok")]
    provider: CliProvider,

    /// Where transcripts come from
    #[arg(short, long, value_enum, default_value = "yt-dlp")]
    transcripts: TranscriptSource,

    /// Transcript language
    #[arg(short, long, default_value = "en")]
    lang: String,

    /// Owner of the job; reports are stored under this id
    #[arg(short, long, default_value = "local")]
    user: String,

    /// Also write the final report JSON to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the report as JSON instead of Markdown
    #[arg(long)]
    json: bool,

    /// Force re-downloading subtitles even if cached
    #[arg(short, long)]
    force: bool,

    /// Show pipeline logs
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "vidreport=debug,vidreport_core=debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter),
        )
        .init();
}

fn transcript_provider(cli: &Cli) -> Result<Arc<dyn TranscriptProvider>> {
    let provider: Arc<dyn TranscriptProvider> = match cli.transcripts {
        TranscriptSource::YtDlp => Arc::new(YtDlpTranscripts::new(&cli.lang).force(cli.force)),
        TranscriptSource::Vidcap => Arc::new(VidcapTranscripts::from_env(&cli.lang)?),
    };
    Ok(provider)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let provider: Provider = cli.provider.clone().into();

    // Validate API keys early
    let model = match ChatModel::new(provider.clone()) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };
    let transcripts = match transcript_provider(&cli) {
        Ok(transcripts) => transcripts,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    let config = PipelineConfig::default();
    let storage = Arc::new(FsTextStorage::in_cache_dir());
    debug!(root = %storage.root().display(), "Using report storage");
    let jobs = Arc::new(MemoryJobStore::new());
    let sinks: Vec<Arc<dyn ProgressSink>> = vec![jobs.clone(), Arc::new(SpinnerProgress::new())];
    let progress: Arc<dyn ProgressSink> = Arc::new(FanOut(sinks));

    let pipeline = Pipeline::new(
        PipelineDeps {
            transcripts,
            storage: storage.clone(),
            model: Arc::new(model),
            progress,
        },
        config.clone(),
    );
    debug!(stages = ?pipeline.stage_names(), "Pipeline ready");
    let service = Arc::new(
        ReportService::new(Arc::new(pipeline), jobs, storage.clone(), config)
            .with_metadata(Arc::new(YtDlpMetadata)),
    );

    println!(
        "\n{}  {}\n",
        style("vidreport").cyan().bold(),
        style(format!("Video Report Generator ({})", provider.name())).dim()
    );
    println!("{}", style("─".repeat(60)).dim());

    let total_start = Instant::now();
    let submitted = service
        .submit(AnalysisRequest {
            source_url: cli.url.clone(),
            user_id: cli.user.clone(),
            include_audio: false,
        })
        .await?;
    let outcome = submitted
        .handle
        .await?
        .ok_or_else(|| anyhow!("job {} aborted", submitted.job_id))?;
    let record = service.status(&submitted.job_id).await?;

    println!(
        "\n{} {}  {} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold(),
        style("Job:").dim(),
        style(format!("{} ({})", record.job_id, record.status.as_str())).dim()
    );

    if let Some(key) = &record.report_key {
        println!(
            "{} {}",
            style("Saved:").dim(),
            style(storage.root().join(key).display()).cyan()
        );
    }
    if let Some(path) = &cli.output {
        tokio::fs::write(path, serde_json::to_string_pretty(&outcome.output)?).await?;
        println!("{} {}", style("Wrote:").dim(), style(path.display()).cyan());
    }
    println!("{}", style("─".repeat(60)).dim());

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome.output)?);
    } else {
        println!("{}", format_report_readable(&outcome.output));
    }

    if !outcome.output.success {
        std::process::exit(1);
    }
    Ok(())
}

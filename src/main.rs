use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use lyricsync::sources::{
    CommandTimedSource, FileReferenceProvider, FileTimedSource, HttpReferenceProvider,
    JsonFileStore, PassthroughRomanizer, PersistenceStore, ReferenceTextProvider, Romanizer,
};
use lyricsync::text::{classify_line, LineKind};
use lyricsync::{
    align_by_content, align_by_position, align_sequences, filter_reference_lines,
    read_reference_text, read_timed_lines, AlignmentOrchestrator, AlignmentResult,
    ContentAlignConfig, MachineOutput, OrchestratorConfig, SequenceAlignConfig, SubtitleDocument,
    TimedSegment,
};

#[derive(Parser)]
#[command(name = "lyricsync")]
#[command(author, version, about = "Align reference lyrics to timed captions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Strategy {
    /// DP, then content matching, then position
    Auto,
    Dp,
    Content,
    Position,
}

#[derive(Subcommand)]
enum Commands {
    /// Align one caption file against one lyric file
    Align {
        /// Timed lines (transcription JSON: {"segments": [...]})
        #[arg(short, long)]
        captions: PathBuf,

        /// Reference lyrics (plain text)
        #[arg(short, long)]
        lyrics: PathBuf,

        #[arg(long, value_enum, default_value = "auto")]
        strategy: Strategy,

        /// Output file for the machine-readable result (JSON); stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output file for human-readable subtitle blocks
        #[arg(long)]
        subtitles: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run the full fallback ladder for one identifier
    Run {
        /// Track identifier
        #[arg(long)]
        id: String,

        /// Directory holding `<id>.manual.json`, `<id>.auto.json`, `<id>.alternate.json` and `<id>.txt`
        #[arg(long)]
        data_dir: PathBuf,

        /// Forced transcription command; its stdout must be a transcription document
        #[arg(long)]
        transcribe_program: Option<String>,

        /// Argument for the transcription command (repeatable, `{id}` is substituted)
        #[arg(long = "transcribe-arg", allow_hyphen_values = true)]
        transcribe_args: Vec<String>,

        /// Fetch lyrics from this URL template (`{id}` is substituted) instead of the data directory
        #[arg(long)]
        lyrics_url: Option<String>,

        /// Persist accepted alignments as JSON under this directory
        #[arg(long)]
        store_dir: Option<PathBuf>,

        /// Reuse a stored alignment younger than this many hours
        #[arg(long, requires = "store_dir")]
        reuse_hours: Option<i64>,

        /// Try the alternate source as a last resort
        #[arg(long)]
        enable_alternate: bool,

        /// Return the best rejected result instead of failing
        #[arg(long)]
        accept_low_confidence: bool,

        /// Per-step timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Output file for the machine-readable outcome (JSON); stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output file for human-readable subtitle blocks
        #[arg(long)]
        subtitles: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show which lines of a lyric file survive filtering
    Filter {
        /// Reference lyrics (plain text)
        #[arg(short, long)]
        lyrics: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Align {
            captions,
            lyrics,
            strategy,
            output,
            subtitles,
            verbose,
        } => {
            setup_logging(verbose);
            align_files(captions, lyrics, strategy, output, subtitles)
        }
        Commands::Run {
            id,
            data_dir,
            transcribe_program,
            transcribe_args,
            lyrics_url,
            store_dir,
            reuse_hours,
            enable_alternate,
            accept_low_confidence,
            timeout_secs,
            output,
            subtitles,
            verbose,
        } => {
            setup_logging(verbose);
            let mut config = OrchestratorConfig::from_env()?;
            if let Some(secs) = timeout_secs {
                config.step_timeout = Duration::from_secs(secs);
            }
            config.enable_alternate_source |= enable_alternate;
            config.accept_low_confidence |= accept_low_confidence;

            let options = RunOptions {
                id,
                data_dir,
                transcribe_program,
                transcribe_args,
                lyrics_url,
                store_dir,
                reuse_hours,
            };
            run_ladder(options, config, output, subtitles).await
        }
        Commands::Filter { lyrics, verbose } => {
            setup_logging(verbose);
            filter_lyrics(lyrics)
        }
    }
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn align_files(
    captions: PathBuf,
    lyrics: PathBuf,
    strategy: Strategy,
    output: Option<PathBuf>,
    subtitles: Option<PathBuf>,
) -> Result<()> {
    info!("Loading captions from {:?}", captions);
    let cues = read_timed_lines(&captions).context("Failed to load captions")?;
    let raw = read_reference_text(&lyrics).context("Failed to load lyrics")?;
    let reference = filter_reference_lines(&raw);
    info!("Loaded {} cues, {} lyric lines", cues.len(), reference.len());

    let mut romanizer = PassthroughRomanizer::new();
    romanizer.initialize()?;

    let sequence = SequenceAlignConfig::default();
    let content = ContentAlignConfig::default();

    let result = match strategy {
        Strategy::Dp => align_sequences(&cues, &reference, &sequence),
        Strategy::Content => align_by_content(&cues, &reference, &romanizer, &content),
        Strategy::Position => align_by_position(&cues, &reference),
        Strategy::Auto => {
            let dp = align_sequences(&cues, &reference, &sequence);
            if dp.ok {
                dp
            } else {
                info!("DP alignment rejected, trying content matching");
                let by_content = align_by_content(&cues, &reference, &romanizer, &content);
                if by_content.ok {
                    by_content
                } else {
                    info!("Content matching rejected, using position fallback");
                    align_by_position(&cues, &reference)
                }
            }
        }
    };

    report(&result);
    let machine = MachineOutput::from_result(result, cues.len(), reference.len());
    write_outputs(&machine, output, subtitles)
}

struct RunOptions {
    id: String,
    data_dir: PathBuf,
    transcribe_program: Option<String>,
    transcribe_args: Vec<String>,
    lyrics_url: Option<String>,
    store_dir: Option<PathBuf>,
    reuse_hours: Option<i64>,
}

async fn run_ladder(
    options: RunOptions,
    config: OrchestratorConfig,
    output: Option<PathBuf>,
    subtitles: Option<PathBuf>,
) -> Result<()> {
    let store = options.store_dir.as_ref().map(JsonFileStore::new);

    if let (Some(store), Some(hours)) = (&store, options.reuse_hours) {
        if let Some(stored) = store.load(&options.id).await? {
            if stored.is_fresh(chrono::Duration::hours(hours)) {
                info!(
                    "Reusing alignment stored at {} ({} segments)",
                    stored.stored_at,
                    stored.segments.len()
                );
                let result = AlignmentResult::accepted(
                    stored.method,
                    stored.segments,
                    stored.confidence,
                    stored.coverage,
                );
                let machine = MachineOutput::from_result(result, 0, 0);
                return write_outputs(&machine, output, subtitles);
            }
        }
    }

    let reference: Box<dyn ReferenceTextProvider> = match &options.lyrics_url {
        Some(url) => Box::new(HttpReferenceProvider::new(url.clone())),
        None => Box::new(FileReferenceProvider::new(&options.data_dir)),
    };

    let mut orchestrator =
        AlignmentOrchestrator::new(reference, Box::new(PassthroughRomanizer::new()), config)
            .with_manual(Box::new(FileTimedSource::new(&options.data_dir, "manual")))
            .with_automatic(Box::new(FileTimedSource::new(&options.data_dir, "auto")))
            .with_alternate(Box::new(FileTimedSource::new(
                &options.data_dir,
                "alternate",
            )));

    if let Some(program) = options.transcribe_program {
        orchestrator = orchestrator.with_transcription(Box::new(CommandTimedSource::new(
            program,
            options.transcribe_args,
        )));
    }
    if let Some(store) = store {
        let store: Arc<dyn PersistenceStore> = Arc::new(store);
        orchestrator = orchestrator.with_store(store);
    }
    if let Err(e) = orchestrator.initialize() {
        warn!("Romanizer unavailable, content matching disabled: {}", e);
    }

    let outcome = orchestrator.run(&options.id).await?;
    info!(
        "{}: {} via {} ({} attempts)",
        outcome.identifier,
        outcome.step,
        outcome.result.method,
        outcome.attempts.len()
    );
    report(&outcome.result);

    let machine = MachineOutput::from_outcome(outcome);
    write_outputs(&machine, output, subtitles)
}

fn report(result: &AlignmentResult) {
    if result.ok {
        info!(
            "Alignment accepted: {} segments via {}, confidence {:.2}, coverage {:.2}",
            result.segment_count(),
            result.method,
            result.confidence,
            result.coverage
        );
    } else {
        warn!(
            "Alignment rejected ({}): confidence {:.2}, coverage {:.2}",
            result.reason.map_or("unknown", |r| r.as_str()),
            result.confidence,
            result.coverage
        );
    }
}

fn write_outputs(
    machine: &MachineOutput,
    output: Option<PathBuf>,
    subtitles: Option<PathBuf>,
) -> Result<()> {
    match output {
        Some(path) => {
            machine.write_json(&path)?;
            info!("Output written to {:?}", path);
        }
        None => println!("{}", serde_json::to_string_pretty(machine)?),
    }

    if let Some(path) = subtitles {
        let segments: &[TimedSegment] = machine.result.segments.as_deref().unwrap_or(&[]);
        SubtitleDocument::new(segments).write_file(&path)?;
        info!("Subtitles written to {:?}", path);
    }

    Ok(())
}

fn filter_lyrics(lyrics: PathBuf) -> Result<()> {
    info!("Filtering lyrics from {:?}", lyrics);
    let raw = read_reference_text(&lyrics)?;

    let mut kept = Vec::new();
    let mut empty = 0;
    let mut headers = 0;
    let mut markers = 0;
    let mut annotations = 0;

    for line in raw.lines() {
        match classify_line(line) {
            LineKind::Lyric => kept.push(line.trim()),
            LineKind::Empty => empty += 1,
            LineKind::MetadataHeader => headers += 1,
            LineKind::SectionMarker => markers += 1,
            LineKind::QuotedAnnotation => annotations += 1,
        }
    }

    println!("Lyric Lines");
    println!("===========");
    for (i, line) in kept.iter().enumerate() {
        println!("{:4}  {}", i, line);
    }
    println!();
    println!("Kept: {}", kept.len());
    println!("Empty lines: {}", empty);
    println!("Metadata headers: {}", headers);
    println!("Section markers: {}", markers);
    println!("Quoted annotations: {}", annotations);

    Ok(())
}

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use actagen::io::{corrected_path, minutes_path, project_dir, save_text, write_unified_transcript};
use actagen::{
    combine_parts, correct_file, extract_fields, find_part_files, generate_minutes, load_parts,
    project_name, ArtifactStore, CorrectorConfig, GeminiClient, GeminiConfig, MeetingInfo,
    SpeakerRegistry,
};

#[derive(Parser)]
#[command(name = "actagen")]
#[command(author, version, about = "Committee-minutes pipeline for multi-part meeting transcripts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Combine per-segment transcripts into one speaker-unified document
    Combine {
        /// Directory holding *_parte_<N>_transcripcion.txt files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Base directory for the combined transcript
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Speaker registry file (hablantes.json)
        #[arg(long)]
        registry: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Correct a transcript chunk by chunk through the text backend
    Correct {
        /// Transcript file to correct
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (defaults to <input>_corregida.txt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Gemini model override
        #[arg(long)]
        model: Option<String>,

        /// Words per chunk
        #[arg(long)]
        chunk: Option<usize>,

        /// Overlap words between consecutive chunks
        #[arg(long)]
        overlap: Option<usize>,

        /// Correction prompt template with a {texto} placeholder
        #[arg(long)]
        prompt_template: Option<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Draft committee minutes from one or two transcript files
    Generate {
        /// Transcript file(s), second part optional
        #[arg(required = true, num_args = 1..=2)]
        parts: Vec<PathBuf>,

        /// Base directory for generated minutes
        #[arg(short, long, default_value = "actas_gemini")]
        out_dir: PathBuf,

        /// Write as the final version instead of a dated draft
        #[arg(long)]
        finalize: bool,

        /// Meeting date override
        #[arg(long)]
        fecha: Option<String>,

        /// Academic program override
        #[arg(long)]
        programa: Option<String>,

        /// File number override
        #[arg(long)]
        ficha: Option<String>,

        /// Trainee name override
        #[arg(long)]
        aprendiz: Option<String>,

        /// Artifact store file to record outputs in
        #[arg(long)]
        store: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Combine {
            input_dir,
            out_dir,
            registry,
            verbose,
        } => {
            setup_logging(verbose);
            combine_transcripts(input_dir, out_dir, registry)
        }
        Commands::Correct {
            input,
            output,
            model,
            chunk,
            overlap,
            prompt_template,
            verbose,
        } => {
            setup_logging(verbose);
            correct_transcript(input, output, model, chunk, overlap, prompt_template).await
        }
        Commands::Generate {
            parts,
            out_dir,
            finalize,
            fecha,
            programa,
            ficha,
            aprendiz,
            store,
            verbose,
        } => {
            setup_logging(verbose);
            generate_document(
                parts, out_dir, finalize, fecha, programa, ficha, aprendiz, store,
            )
            .await
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn combine_transcripts(
    input_dir: PathBuf,
    out_dir: PathBuf,
    registry: Option<PathBuf>,
) -> Result<()> {
    let files = find_part_files(&input_dir)?;
    if files.is_empty() {
        anyhow::bail!("no part transcripts (*_parte_<N>_transcripcion.txt) in {:?}", input_dir);
    }

    info!("found {} transcript parts", files.len());
    let parts = load_parts(&files)?;
    let document = combine_parts(&parts);

    let project = files
        .first()
        .and_then(|path| path.file_name())
        .and_then(|name| name.to_str())
        .map(project_name)
        .unwrap_or_else(|| "transcripcion".to_string());

    let path = write_unified_transcript(&out_dir, &project, &document.full_text)?;
    info!("speakers detected: {}", document.speaker_labels());

    if let Some(registry_path) = registry {
        let registry = SpeakerRegistry::load(&registry_path)?;
        if registry.all_registered(&document.speaker_ids) {
            info!("all speakers registered; rendering may proceed");
        } else {
            warn!("unregistered speakers present; document rendering should wait");
        }
    }

    println!("Transcripción combinada: {}", path.display());
    println!("Hablantes: {}", document.speaker_labels());

    Ok(())
}

async fn correct_transcript(
    input: PathBuf,
    output: Option<PathBuf>,
    model: Option<String>,
    chunk: Option<usize>,
    overlap: Option<usize>,
    prompt_template: Option<String>,
) -> Result<()> {
    let mut api_config = GeminiConfig::from_env()?;
    if let Some(model) = model {
        api_config.model = model;
    }
    let client = GeminiClient::new(api_config);

    let mut config = CorrectorConfig::from_env(client.max_output_tokens());
    if let Some(chunk) = chunk {
        config.chunk_words = chunk;
    }
    if let Some(overlap) = overlap {
        config.overlap_words = overlap;
    }
    if let Some(template) = prompt_template {
        config.prompt_template = template;
    }

    let output = output.unwrap_or_else(|| corrected_path(&input));
    let outcome = correct_file(&client, &input, &output, &config, None).await?;
    let report = &outcome.report;

    if !report.failed_chunks.is_empty() {
        let failed: Vec<String> = report.failed_chunks.iter().map(|i| i.to_string()).collect();
        anyhow::bail!(
            "{} de {} segmentos no se corrigieron: {}",
            report.failed_chunks.len(),
            report.total,
            failed.join(", ")
        );
    }
    if !outcome.saved {
        anyhow::bail!("no se pudo guardar la transcripción corregida");
    }

    println!(
        "Transcripción corregida guardada en: {}",
        outcome.output_path.display()
    );
    Ok(())
}

async fn generate_document(
    parts: Vec<PathBuf>,
    out_dir: PathBuf,
    finalize: bool,
    fecha: Option<String>,
    programa: Option<String>,
    ficha: Option<String>,
    aprendiz: Option<String>,
    store: Option<PathBuf>,
) -> Result<()> {
    let mut texts = Vec::new();
    for path in &parts {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read transcript: {:?}", path))?;
        texts.push(text);
    }
    let transcript = texts.join("\n\n");

    let file_name = parts[0]
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("acta_comite");
    let mut info = MeetingInfo::detect(&project_name(file_name), &transcript);
    if let Some(fecha) = fecha {
        info.meeting_date = fecha;
    }
    if programa.is_some() {
        info.program = programa;
    }
    if ficha.is_some() {
        info.file_number = ficha;
    }
    if aprendiz.is_some() {
        info.trainee = aprendiz;
    }

    let api_config = GeminiConfig::from_env()?;
    let client = GeminiClient::new(api_config);

    let minutes = generate_minutes(&client, &transcript, &info).await?;
    let fields = extract_fields(&minutes);

    let dir = project_dir(&out_dir, &info.project_name, finalize);
    let path = minutes_path(&dir, &info.project_name, finalize);
    if !save_text(&path, &minutes) {
        anyhow::bail!("no se pudo guardar el acta generada");
    }

    info!("minutes written to {:?} ({} characters)", path, minutes.len());
    if fields.conclusions.is_none() {
        warn!("generated minutes have no conclusions section");
    }

    if let Some(store_path) = store {
        let store = ArtifactStore::open(&store_path, &out_dir)?;
        let mut artifact_paths = HashMap::new();
        artifact_paths.insert("md".to_string(), path.display().to_string());
        let id = store.insert(&info.project_name, artifact_paths)?;
        info!("artifact recorded as {}", id);
    }

    println!("Acta generada en: {}", path.display());
    println!(
        "Participantes extraídos: {}",
        if fields.participants.is_empty() {
            "ninguno".to_string()
        } else {
            fields.participants.join(" | ")
        }
    );

    Ok(())
}

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::info;

use quill::config::Config;
use quill::models::bootstrap::{bootstrap, trainers};
use quill::models::{ArtifactKind, ArtifactStore, Trainer, TrainingReport};
use quill::text::{normalize_with, NormalizeMethod};
use quill::web::AppState;

/// Quill: sentiment, similarity, topic grouping and text cleaning over HTTP.
///
/// Models are trained on first start if their artifacts are missing, then
/// served from memory.
#[derive(Parser)]
#[command(name = "quill", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train any missing artifacts, load them and start the HTTP server
    Serve {
        /// Port to listen on (default: 8001)
        #[arg(long, default_value = "8001")]
        port: u16,

        /// Address to bind (default: 0.0.0.0)
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
    },

    /// Train artifacts, replacing any that already exist
    Train {
        /// Only train this artifact (default: all three)
        #[arg(long, value_enum)]
        artifact: Option<ArtifactArg>,
    },

    /// Show which artifacts are trained and which backends are configured
    Status,

    /// Print the normalized tokens for a text
    Preprocess {
        text: String,

        #[arg(long, value_enum, default_value = "nltk")]
        method: MethodArg,
    },

    /// Download the ONNX model used by /predict
    DownloadModel,
}

#[derive(Clone, Copy, ValueEnum)]
enum ArtifactArg {
    Classifier,
    Embeddings,
    Topics,
}

impl From<ArtifactArg> for ArtifactKind {
    fn from(arg: ArtifactArg) -> Self {
        match arg {
            ArtifactArg::Classifier => ArtifactKind::Classifier,
            ArtifactArg::Embeddings => ArtifactKind::Embeddings,
            ArtifactArg::Topics => ArtifactKind::Topics,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Nltk,
    Spacy,
}

impl From<MethodArg> for NormalizeMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Nltk => NormalizeMethod::Nltk,
            MethodArg::Spacy => NormalizeMethod::Spacy,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quill=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, bind } => {
            let config = Config::load()?;

            let models = {
                let config = config.clone();
                tokio::task::spawn_blocking(move || bootstrap(&config)).await??
            };
            info!("All artifacts loaded");

            let state = AppState::from_models(config, models)?;
            quill::web::run_server(state, port, &bind).await?;
        }

        Commands::Train { artifact } => {
            let config = Config::load()?;
            let wanted: Vec<ArtifactKind> = match artifact {
                Some(a) => vec![a.into()],
                None => ArtifactKind::ALL.to_vec(),
            };
            for kind in &wanted {
                match kind {
                    ArtifactKind::Classifier => config.require_sentiment_corpus()?,
                    ArtifactKind::Embeddings | ArtifactKind::Topics => config.require_newsgroups()?,
                }
            }

            let store = ArtifactStore::new(&config.artifact_dir);
            let reports = tokio::task::spawn_blocking(move || -> Result<Vec<TrainingReport>> {
                let mut reports = Vec::new();
                for trainer in trainers(&config) {
                    if wanted.contains(&trainer.kind()) {
                        // writes are atomic, so the old artifact survives a failed run
                        reports.push(trainer.train(&store)?);
                    }
                }
                Ok(reports)
            })
            .await??;

            for report in reports {
                let metric = report
                    .metric
                    .map(|m| format!(", {} {:.4}", m.name, m.value))
                    .unwrap_or_default();
                println!(
                    "{} {} on {} documents{}",
                    "Trained".green(),
                    report.kind,
                    report.documents,
                    metric
                );
            }
        }

        Commands::Status => {
            let config = Config::load()?;
            quill::output::display_status(&config);
        }

        Commands::Preprocess { text, method } => {
            let tokens = normalize_with(&text, method.into());
            quill::output::display_tokens(&tokens);
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            println!("Downloading ONNX predict model...");
            quill::predict::download::download_model(&config.predict_model_url, &config.model_path)
                .await?;
            println!(
                "\n{}",
                format!("Model ready in {}", config.model_dir().display()).green()
            );
        }
    }

    Ok(())
}

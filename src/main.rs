use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use song_wizard::core::config::Config;
use song_wizard::core::error::GenerationError;
use song_wizard::core::io::{NativeStorage, Storage};
use song_wizard::services::assets::{create_text_source, Placeholders};
use song_wizard::services::documents::{render_about, render_manual, render_tos};
use song_wizard::services::image::{create_image_client, ImageClient};
use song_wizard::services::llm::{create_llm, LlmClient};
use song_wizard::services::workflow::{LyricsMode, SongWorkflow, StepOutcome};

#[derive(Parser)]
#[command(name = "song-wizard", version, about = "Guided song creation with Gemini and Imagen")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "config.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Walk through every step of the wizard.
    Run,
    /// Expand the stored topic into a story premise.
    Expand,
    /// Generate the title, the lyrics or both.
    Lyrics {
        #[arg(long, value_enum, default_value_t = Part::All)]
        part: Part,
    },
    /// Write the song report as markdown.
    Report {
        /// Regenerate the introduction even if it is up to date.
        #[arg(long)]
        force: bool,
    },
    /// Generate cover art.
    Covers,
    /// Write the collection archive.
    Bundle,
    /// Print one of the static documents as HTML.
    Docs {
        #[arg(value_enum)]
        page: DocPage,
    },
    /// Forget the current song.
    Reset,
}

#[derive(Clone, Copy, ValueEnum)]
enum Part {
    All,
    Title,
    Lyrics,
}

impl From<Part> for LyricsMode {
    fn from(part: Part) -> Self {
        match part {
            Part::All => LyricsMode::All,
            Part::Title => LyricsMode::Title,
            Part::Lyrics => LyricsMode::Lyrics,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DocPage {
    About,
    Manual,
    Tos,
}

fn optional_client<T: ?Sized>(client: Result<Box<T>, GenerationError>, what: &str) -> Option<Box<T>> {
    match client {
        Ok(client) => Some(client),
        Err(e) => {
            log::warn!("{} disabled: {}", what, e);
            None
        }
    }
}

fn step_error(e: GenerationError) -> anyhow::Error {
    anyhow!(e.user_message())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {:#}", e);
            eprintln!("Please ensure '{}' is valid YAML.", cli.config.display());
            return Err(e);
        }
    };
    config.ensure_directories()?;

    let source = create_text_source(&config)?;
    let command = cli.command.unwrap_or(Command::Run);

    if let Command::Docs { page } = &command {
        let placeholders = Placeholders::today();
        match page {
            DocPage::About => {
                for (heading, html) in render_about(source.as_ref(), &placeholders).await.sections() {
                    println!("<!-- {} -->\n{}\n", heading, html);
                }
            }
            DocPage::Manual => println!("{}", render_manual(source.as_ref()).await),
            DocPage::Tos => println!("{}", render_tos(source.as_ref(), &placeholders).await),
        }
        return Ok(());
    }

    let llm: Option<Box<dyn LlmClient>> = optional_client(create_llm(&config), "Text generation");
    let images: Option<Box<dyn ImageClient>> = optional_client(create_image_client(&config), "Image generation");
    let storage: Arc<dyn Storage> = Arc::new(NativeStorage::new("."));

    let mut workflow = SongWorkflow::new(config, llm, images, source, storage).await?;

    match command {
        Command::Run => workflow.run().await?,
        Command::Expand => {
            workflow.expand_topic().await.map_err(step_error)?;
            println!("{}", workflow.state().topic);
        }
        Command::Lyrics { part } => {
            workflow.write_song(part.into()).await.map_err(step_error)?;
            println!("{}\n\n{}", workflow.state().title, workflow.state().lyrics);
        }
        Command::Report { force } => {
            if force {
                workflow.refresh_report(true).await;
            }
            println!("Report saved to {}", workflow.download_report().await?);
        }
        Command::Covers => {
            let mut outcome = workflow.generate_initial_covers().await.map_err(step_error)?;
            if outcome == StepOutcome::Unchanged {
                outcome = workflow.generate_cover().await.map_err(step_error)?;
            }
            match outcome {
                StepOutcome::ImageSkipped(message) => println!("{}", message),
                _ => println!("{} cover(s) generated", workflow.state().cover_image_urls().len()),
            }
        }
        Command::Bundle => println!("Collection saved to {}", workflow.download_bundle().await?),
        Command::Reset => {
            workflow.reset().await?;
            println!("Song reset.");
            return Ok(());
        }
        Command::Docs { .. } => return Ok(()),
    }

    workflow.save_state().await?;
    Ok(())
}

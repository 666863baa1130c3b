use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use log::{debug, info};
use slidesmith_ai::OpenAiProvider;
use slidesmith_core::reference::agentic_ai_deck;
use slidesmith_core::{
    write_pptx, GenerationMode, GenerationRequest, Pipeline, PromptBuilder, ProviderConfig, Rgb, SlidesmithConfig,
};
use slidesmith_web::SlidesmithServer;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Deck parameters shared by `generate` and `prompt`.
#[derive(clap::Args)]
struct DeckArgs {
    /// Number of slides
    #[arg(short, long, default_value_t = 5)]
    slides: u8,

    /// Background color as #RRGGBB
    #[arg(short, long, default_value = "#FFFFFF")]
    color: Rgb,

    /// What the presentation should be about
    #[arg(short, long)]
    description: String,

    /// Generation mode (structured or script); defaults to SLIDESMITH_MODE
    #[arg(long)]
    mode: Option<GenerationMode>,
}

impl DeckArgs {
    fn to_request(&self) -> GenerationRequest {
        let request = GenerationRequest::new(self.slides, self.description.clone()).with_color(self.color);
        match self.mode {
            Some(mode) => request.with_mode(mode),
            None => request,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the web form and JSON API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: IpAddr,

        /// Port to listen on
        #[arg(short, long, default_value_t = 8000)]
        port: u16,
    },

    /// Generate a presentation from the command line
    Generate {
        #[command(flatten)]
        deck: DeckArgs,

        /// OpenAI API key (falls back to OPENAI_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// Model name (falls back to SLIDESMITH_MODEL)
        #[arg(short, long)]
        model: Option<String>,

        /// Enable self-healing (retry with validation feedback)
        #[arg(long)]
        heal: bool,

        /// Output file path
        #[arg(short, long, default_value = "generated_presentation.pptx")]
        output: PathBuf,
    },

    /// Write the built-in reference presentation
    Example {
        /// Output file path
        #[arg(short, long, default_value = "output.pptx")]
        output: PathBuf,
    },

    /// Print the prompts a request would send, without calling the model
    Prompt {
        #[command(flatten)]
        deck: DeckArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenv().ok();

    let cli = Cli::parse();

    // The server logs through tracing; one-shot commands use env_logger.
    if matches!(cli.command, Commands::Serve { .. }) {
        slidesmith_web::init_tracing();
    } else {
        env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    }

    let config = SlidesmithConfig::from_env().context("Invalid SLIDESMITH_* configuration")?;

    match cli.command {
        Commands::Serve { bind, port } => {
            let provider = OpenAiProvider::from_env()?;
            info!("Using model {} in {:?} mode", provider.config().model, config.mode);
            if config.fallback_api_key.is_none() {
                info!("OPENAI_API_KEY not set; users must enter a key in the form");
            }

            let pipeline = Pipeline::new(provider, config)?;
            SlidesmithServer::new(pipeline)
                .start(SocketAddr::new(bind, port))
                .await
                .context("Server failed")?;
        }

        Commands::Generate {
            deck,
            api_key,
            model,
            heal,
            output,
        } => {
            let mut provider_config = ProviderConfig::from_env();
            if let Some(m) = model {
                provider_config.model = m;
            }
            let provider = OpenAiProvider::new(provider_config)?;

            let config = if heal { config.with_healing(true) } else { config };
            let pipeline = Pipeline::new(provider, config)?;

            let mut request = deck.to_request();
            request.api_key = api_key;

            info!("Generating {} slides...", request.slide_count);
            let artifact = pipeline.run(request).await.context("Generation failed")?;

            tokio::fs::write(&output, &artifact.bytes)
                .await
                .with_context(|| format!("Failed to write {:?}", output))?;
            info!("Saved {} bytes to {:?}", artifact.bytes.len(), output);
        }

        Commands::Example { output } => {
            let deck = agentic_ai_deck();
            write_pptx(&deck, &output)
                .await
                .with_context(|| format!("Failed to write {:?}", output))?;
            info!("Reference presentation ({} slides) saved to {:?}", deck.len(), output);
        }

        Commands::Prompt { deck } => {
            let request = deck.to_request();
            request.validate(config.max_slides)?;

            let mode = request.mode.unwrap_or(config.mode);
            debug!("Building {:?} prompt", mode);
            let prompt = PromptBuilder::from_config(&config)?.build(mode, &request)?;

            println!("--- system ---\n{}\n\n--- user ---\n{}", prompt.system, prompt.user);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "slidesmith",
            "generate",
            "--slides",
            "3",
            "--color",
            "#112233",
            "--description",
            "Intro to cats",
            "--mode",
            "script",
        ])
        .unwrap();

        match cli.command {
            Commands::Generate { deck, output, .. } => {
                let request = deck.to_request();
                assert_eq!(request.slide_count, 3);
                assert_eq!(request.background_color.to_string(), "#112233");
                assert_eq!(request.mode, Some(GenerationMode::Script));
                assert_eq!(output, PathBuf::from("generated_presentation.pptx"));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_rejects_bad_color() {
        assert!(Cli::try_parse_from(["slidesmith", "prompt", "--color", "blue", "--description", "x"]).is_err());
    }
}

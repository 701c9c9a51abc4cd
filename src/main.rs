use anyhow::Context;
use clap::{Parser, Subcommand};
use shot_align::algorithms::SaliencyModel;
use shot_align::config::load_config_or_default;
use shot_align::data::load_image;
use shot_align::logging::init_logging;
use shot_align::server::DetectionServer;
use shot_align::visualization::{print_landmark, print_result};
use shot_align::{AlignmentAnalyzer, Config, ImageHandle};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "align")]
#[command(about = "Compare a captured photo with a reference shot and suggest how to reframe it")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a captured photo against a reference photo
    Analyze {
        /// Path or file:// URI of the captured photo
        #[arg(short = 'c', long)]
        captured: String,

        /// Path or file:// URI of the reference photo
        #[arg(short, long)]
        reference: String,

        /// Write the result as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Locate the alignment landmark of a single image
    Landmark {
        /// Path or file:// URI of the image
        #[arg(short, long)]
        image: String,
    },

    /// Run the HTTP detection service
    Serve {
        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config_or_default(cli.config.as_deref());
    let _log_guard = init_logging(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Analyze { captured, reference, output } => {
            handle_analyze(&config, captured, reference, output).await?;
        }
        Commands::Landmark { image } => {
            handle_landmark(&config, image).await?;
        }
        Commands::Serve { port } => {
            handle_serve(config, port).await?;
        }
    }

    Ok(())
}

async fn handle_analyze(
    config: &Config,
    captured: String,
    reference: String,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let analyzer = AlignmentAnalyzer::from_config(config)?;
    let result = analyzer
        .analyze(&ImageHandle::new(captured), &ImageHandle::new(reference))
        .await?;

    print_result(&result);

    if let Some(output_path) = output {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(&output_path, json)
            .with_context(|| format!("writing {}", output_path.display()))?;
        println!("Result saved to {}", output_path.display());
    }

    Ok(())
}

async fn handle_landmark(config: &Config, image: String) -> anyhow::Result<()> {
    let handle = ImageHandle::new(image);
    let model = SaliencyModel::new(config.extractor.local.clone())?;
    let limits = config.image.clone();

    let label = handle.to_string();
    let landmark = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let gray = load_image(&handle, &limits)?;
        Ok(model.locate(&gray))
    })
    .await??;

    print_landmark(&label, landmark.as_ref());
    Ok(())
}

async fn handle_serve(mut config: Config, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    let server = DetectionServer::new(&config)?;
    server.run().await
}

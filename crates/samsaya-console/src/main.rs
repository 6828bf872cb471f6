use std::path::PathBuf;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use clap::{Parser, Subcommand};
use colored::Colorize;
use samsaya_core::ChatOptions;
use samsaya_llm::ModelClient;
use tokio::sync::mpsc;

use samsaya_console::actions::MessageActions;
use samsaya_console::attachments::{mime_for_path, AttachmentManager};
use samsaya_console::capabilities::{Notifier, SpeechDecoder};
use samsaya_console::logging::init_logging;
use samsaya_console::platform::{
    ArboardClipboard, NoNativeShare, Pcm16Decoder, TerminalNotifier, WavFilePlayer,
};
use samsaya_console::render::TerminalRenderer;
use samsaya_console::repl::{print_syllabus, Repl};
use samsaya_console::{Config, ConversationController, SubmitOutcome};

#[derive(Parser)]
#[command(name = "samsaya")]
#[command(about = "Research console for Indian epistemology, backed by Gemini")]
#[command(version)]
struct Cli {
    /// Use the deep reasoning model
    #[arg(long, global = true)]
    thinking: bool,

    /// Ground answers with web search
    #[arg(long, global = true)]
    search: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    debug: bool,

    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, global = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start interactive chat
    Chat,
    /// Ask a single question and print the answer
    Ask {
        message: String,
        /// Files to attach
        #[arg(long = "attach", short)]
        attach: Vec<PathBuf>,
    },
    /// Print the syllabus
    Syllabus,
    /// Transcribe a recorded audio clip
    Transcribe { file: PathBuf },
    /// Synthesize speech into a WAV file
    Speak {
        text: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let mut config = Config::load();
    if let Some(key) = cli.api_key.clone().filter(|k| !k.trim().is_empty()) {
        config.api_key = Some(key);
    }
    if let Some(base) = cli.api_base.clone() {
        config.api_base = Some(base);
    }

    let options = ChatOptions {
        thinking: cli.thinking,
        search: cli.search,
    };
    log::debug!("Options: {:?}", options);

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Syllabus => {
            print_syllabus(samsaya_core::syllabus());
            Ok(())
        }
        Commands::Chat => {
            let client: Arc<dyn ModelClient> = Arc::new(config.build_client()?);
            run_chat(client, &config, options).await
        }
        Commands::Ask { message, attach } => {
            let client: Arc<dyn ModelClient> = Arc::new(config.build_client()?);
            ask(client, &message, &attach, options).await
        }
        Commands::Transcribe { file } => {
            let client = config.build_client()?;
            let bytes = tokio::fs::read(&file).await?;
            let audio = general_purpose::STANDARD.encode(&bytes);
            let text = client.transcribe(&audio, mime_for_path(&file)).await?;
            println!("{}", text);
            Ok(())
        }
        Commands::Speak { text, out } => {
            let client = config.build_client()?;
            let bytes = client.synthesize_speech(&text).await?;
            let buffer = Pcm16Decoder.decode(&bytes)?;
            let out = out.unwrap_or_else(|| config.output_dir().join("speech.wav"));
            WavFilePlayer::new(config.output_dir()).write_to(&out, &buffer)?;
            println!(
                "{}",
                format!("♪ {:.1}s of speech saved to {}", buffer.duration_secs(), out.display())
                    .green()
            );
            Ok(())
        }
    }
}

async fn run_chat(
    client: Arc<dyn ModelClient>,
    config: &Config,
    options: ChatOptions,
) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let controller = ConversationController::new(client.clone()).with_events(tx);
    let notifier: Arc<dyn Notifier> = Arc::new(TerminalNotifier);

    let actions = MessageActions::new(
        client,
        Arc::new(ArboardClipboard),
        Arc::new(NoNativeShare),
        Arc::new(Pcm16Decoder),
        Arc::new(WavFilePlayer::new(config.output_dir())),
        notifier.clone(),
    );

    Repl::new(controller, rx, actions, notifier, options).run().await
}

async fn ask(
    client: Arc<dyn ModelClient>,
    message: &str,
    attach: &[PathBuf],
    options: ChatOptions,
) -> anyhow::Result<()> {
    let mut pending = AttachmentManager::new();
    for path in attach {
        pending.add_file(path).await?;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let controller = ConversationController::new(client).with_events(tx);

    let printer = tokio::spawn(async move {
        let mut renderer = TerminalRenderer::stdout();
        while let Some(event) = rx.recv().await {
            if let Err(e) = renderer.handle(&event) {
                log::warn!("Failed to render event: {}", e);
            }
        }
    });

    let outcome = controller
        .submit_with(message, pending.take(), options)
        .await;
    drop(controller);
    printer.await?;

    match outcome {
        SubmitOutcome::Completed { .. } => Ok(()),
        SubmitOutcome::Failed { error, .. } => Err(anyhow::anyhow!(error)),
        SubmitOutcome::Rejected(reason) => Err(anyhow::anyhow!("Message rejected: {:?}", reason)),
    }
}

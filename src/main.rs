use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use realtime_voice::credential::CredentialSource;
use realtime_voice::session::{
    HttpNegotiationEndpoint, Microphone, RtcConnector, RtpPlayback,
};
use realtime_voice::{
    Collaborators, Config, Negotiator, TokenEndpointClient, Transcript, UpstreamCredentialProvider,
};
use tokio::sync::watch;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

/// Talk to a real-time voice model and follow the conversation as text.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Token service endpoint that issues ephemeral credentials.
    #[arg(long)]
    token_url: Option<String>,

    /// Mint the credential directly with OPENAI_API_KEY instead of asking the token service.
    #[arg(long)]
    direct: bool,

    /// Instructions sent with the session configuration.
    #[arg(long)]
    instructions: Option<String>,

    #[arg(long)]
    model: Option<String>,

    /// Input device name. Uses the default input when omitted.
    #[arg(long)]
    device: Option<String>,

    /// Give up on the offer/answer exchange after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// List input devices and exit.
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    let cli = Cli::parse();

    if cli.list_devices {
        let devices = realtime_voice::utils::device::get_available_inputs()
            .context("Failed to list input devices")?;
        println!("{}", devices);
        return Ok(());
    }

    let mut builder = Config::builder();
    if let Some(url) = &cli.token_url {
        builder = builder.with_token_url(url);
    }
    if let Some(instructions) = &cli.instructions {
        builder = builder.with_instructions(instructions);
    }
    if let Some(model) = &cli.model {
        builder = builder.with_model(model);
    }
    if let Some(secs) = cli.timeout_secs {
        builder = builder.with_negotiation_timeout(Duration::from_secs(secs));
    }
    let config = builder.build();

    let credentials: Arc<dyn CredentialSource> = if cli.direct {
        Arc::new(UpstreamCredentialProvider::new(&config))
    } else {
        Arc::new(TokenEndpointClient::from_config(&config))
    };

    let (playback, mut frames) = RtpPlayback::new(config.capacity());
    // Remote audio arrives Opus-encoded and is not decoded or played here.
    tokio::spawn(async move {
        if let Some(frame) = frames.recv().await {
            tracing::info!(
                "remote audio on track {} is received but not played (no decoder)",
                frame.track_id
            );
        }
        while frames.recv().await.is_some() {}
    });

    let collaborators = Collaborators {
        credentials,
        media: Arc::new(Microphone::new(cli.device.clone())),
        connector: Arc::new(RtcConnector::new()),
        endpoint: Arc::new(HttpNegotiationEndpoint::new(&config)),
        sink: Arc::new(playback),
    };

    let mut session = Negotiator::new(config, collaborators);
    tokio::spawn(print_transcript(session.subscribe()));

    session.start().await.context("Failed to start the session")?;
    tracing::info!("session negotiated, press Ctrl-C to stop");

    tokio::select! {
        _ = session.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, closing session");
        }
    }
    session.close().await;
    tracing::info!("session ended: {:?}", session.state());

    let stats = session.stats();
    tracing::info!(
        "responses: {}, total_tokens: {}, input_tokens: {}, output_tokens: {}",
        stats.responses(),
        stats.total_tokens(),
        stats.input_tokens(),
        stats.output_tokens()
    );
    Ok(())
}

/// Prints each turn once it completes.
async fn print_transcript(mut updates: watch::Receiver<Transcript>) {
    let mut printed = 0;
    while updates.changed().await.is_ok() {
        let transcript = updates.borrow_and_update().clone();
        let turns = transcript.turns();
        while printed < turns.len() && turns[printed].is_complete() {
            let turn = &turns[printed];
            println!("{:>9}: {}", turn.role(), turn.text());
            printed += 1;
        }
        if let Some(open) = turns.get(printed) {
            tracing::debug!("{} (partial): {}", open.role(), open.text());
        }
    }
}

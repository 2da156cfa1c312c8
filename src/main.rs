use std::future::IntoFuture as _;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser as _;

use shelfbot::bot::poller::Poller;
use shelfbot::bot::{AdminGuard, ConversationEngine};
use shelfbot::config::Settings;
use shelfbot::notify::AdminNotifier;
use shelfbot::objects::ObjectStore;
use shelfbot::sink::DocumentSink;
use shelfbot::store::{ContentStore, StoreLimits};
use shelfbot::telegram::TelegramClient;

/// Telegram bot that curates a comic catalog stored in a pinned channel message.
#[derive(Debug, clap::Parser)]
#[command(author, version, about)]
struct AppArgs {
    /// Address for the read-only HTTP API.
    #[arg(long, default_value = "0.0.0.0:5000")]
    addr: SocketAddr,

    /// Run the bot without the HTTP API.
    #[arg(long)]
    no_web: bool,

    /// Long-polling timeout passed to getUpdates.
    #[arg(long, default_value_t = 30)]
    poll_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    shelfbot::logging::init().context("init logging")?;

    let args = AppArgs::parse();
    tracing::debug!(?args, "parsed cli");

    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        return Err(err).context("load .env");
    }
    let settings = Settings::from_env().context("load settings")?;
    tracing::info!(?settings, "starting shelfbot");

    let client = Arc::new(TelegramClient::new(&settings)?);
    let store = Arc::new(
        ContentStore::load(
            Arc::clone(&client) as Arc<dyn DocumentSink>,
            Arc::clone(&client) as Arc<dyn AdminNotifier>,
            StoreLimits::default(),
        )
        .await,
    );
    let engine = Arc::new(ConversationEngine::new(
        AdminGuard::new(settings.admin_id),
        Arc::clone(&store),
        Arc::clone(&client) as Arc<dyn ObjectStore>,
    ));
    let poller = Poller::new(Arc::clone(&client), engine, args.poll_timeout_secs);

    if args.no_web {
        tokio::select! {
            res = poller.run() => res.context("bot poller"),
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                Ok(())
            }
        }
    } else {
        let app = shelfbot::web::router(store, client);
        let listener = tokio::net::TcpListener::bind(args.addr)
            .await
            .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
        tracing::info!(addr = %args.addr, "listening");

        tokio::select! {
            res = poller.run() => res.context("bot poller"),
            res = axum::serve(listener, app).into_future() => res.context("http server"),
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                Ok(())
            }
        }
    }
}

use std::error::Error;
use std::sync::Arc;

use anon_chat::auth::{AuthProvider, LocalAuth};
use anon_chat::client::{ChatClient, ClientOptions};
use anon_chat::config;
use anon_chat::links::{DeepLink, invite_link};
use anon_chat::storage::{ChatStore, SqliteStore};
use anon_chat::ui::ChatApp;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use eframe::egui;
use tokio::sync::mpsc;
use url::Url;

#[derive(Parser)]
#[command(name = "anon_chat", version, about = "Anonymous private and group chat")]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Auth session database; lets a second identity share the same chat store
    #[arg(long, value_name = "FILE")]
    session: Option<String>,
    /// Deep link to open on start, e.g. an invite link
    #[arg(long, value_name = "URL")]
    link: Option<String>,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Print the signed-in user's invite link and exit
    InviteLink,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut app_config = config::load_config(&cli.config);
    if let Some(session) = cli.session {
        app_config.session_path = session;
    }
    let invite_base = app_config.invite_base()?;
    let auth = Arc::new(LocalAuth::open(&app_config.session_path)?);

    if cli.mode == Some(Mode::InviteLink) {
        return print_invite_link(auth.as_ref(), &invite_base);
    }

    let store = Arc::new(SqliteStore::open(&app_config.database_path)?);
    let launch_link = match cli.link.as_deref().map(DeepLink::parse).transpose() {
        Ok(link) => link,
        Err(err) => {
            log::warn!("Ignoring launch link: {err}");
            None
        }
    };

    let options = ClientOptions {
        invite_base,
        poll_interval: app_config.poll_interval(),
        launch_link,
    };
    run_full_client(store, auth, options).await?;
    Ok(())
}

fn print_invite_link(
    auth: &dyn AuthProvider,
    invite_base: &Url,
) -> Result<(), Box<dyn Error>> {
    let user = auth
        .current_user()
        .ok_or("not signed in; start the app and pick a display name first")?;
    println!("{}", invite_link(invite_base, &user.uid));
    Ok(())
}

async fn run_full_client(
    store: Arc<dyn ChatStore>,
    auth: Arc<dyn AuthProvider>,
    options: ClientOptions,
) -> Result<(), eframe::Error> {
    // UI -> client
    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    // client -> UI
    let (event_tx, event_rx) = mpsc::channel(100);

    tokio::spawn(async move {
        ChatClient::new(event_tx, cmd_rx, store, auth, options)
            .run()
            .await;
    });

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([960.0, 640.0]),
        ..Default::default()
    };
    let mut event_rx = Some(event_rx);

    eframe::run_native(
        "Anonymous Chat",
        native_options,
        Box::new(move |cc| {
            let event_receiver = event_rx
                .take()
                .expect("ChatApp should only be initialized once");
            log::info!("UI started");
            Ok(Box::new(ChatApp::new(cc, cmd_tx.clone(), event_receiver)))
        }),
    )
}

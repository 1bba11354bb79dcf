//! Shop notifier binary.
//!
//! Start it with:
//! ```bash
//! TELEGRAM_TOKEN=xxx SHEET_ID=yyy BOT_PASSWORD=zzz cargo run -p notifier-telegram
//! ```

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use notifier_runtime::{Dispatcher, Runtime, Sources};
use notifier_store::{
    MongoStore, OrderStore, ProductStore, RecipientDirectory, ServiceAccountKey, SheetDirectory,
    SheetsClient,
};
use notifier_telegram::{
    create_router, register_webhook, webhook_url, AppState, Args, Registrar, ServiceStatus,
    TelegramMessenger,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env files must be loaded before clap reads the environment
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());

    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(args.log_filter()))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    args.validate()?;

    let credentials = match args.google_credentials.as_deref() {
        Some(json) => match ServiceAccountKey::from_json(json) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(error = %e, "Unusable GOOGLE_CREDENTIALS, spreadsheet access will fail");
                None
            }
        },
        None => {
            warn!("GOOGLE_CREDENTIALS not set, spreadsheet access will fail");
            None
        }
    };

    let sheets = Arc::new(SheetsClient::new(&args.sheet_id, credentials)?);
    let directory: Arc<dyn RecipientDirectory> =
        Arc::new(SheetDirectory::new(sheets.table(&args.user_sheet_name)));
    let mongo = args.db_url.as_deref().map(|url| Arc::new(MongoStore::new(url)));
    let messenger = Arc::new(TelegramMessenger::new(&args.telegram_token));

    info!(
        sheet_id = %args.sheet_id,
        product_table = %args.sheet_name,
        user_table = %args.user_sheet_name,
        orders = mongo.is_some(),
        "Starting shop notifier"
    );

    let sources = Sources {
        directory: Arc::clone(&directory),
        sheet: Arc::new(sheets.table(&args.sheet_name)),
        orders: mongo.clone().map(|store| store as Arc<dyn OrderStore>),
        products: mongo.clone().map(|store| store as Arc<dyn ProductStore>),
        messenger: messenger.clone(),
    };
    let mut runtime = Runtime::new(args.runtime_config(), sources);
    runtime.start()?;

    match args.public_url() {
        Some(base) => match webhook_url(base, &args.telegram_token) {
            Ok(url) => {
                if let Err(e) = register_webhook(messenger.bot(), url).await {
                    warn!(error = %e, "Webhook registration failed");
                }
            }
            Err(e) => warn!(error = %e, "Skipping webhook registration"),
        },
        None => warn!("SERVER_URL not set, skipping webhook registration"),
    }

    let status = ServiceStatus {
        sheet_id: args.sheet_id.clone(),
        product_table: args.sheet_name.clone(),
        user_table: args.user_sheet_name.clone(),
        public_url: args.public_url().map(str::to_string),
        telegram_configured: true,
        monitoring_orders: mongo.is_some(),
    };
    let registrar = Registrar::new(directory, Dispatcher::new(messenger), &args.bot_password);
    let app = create_router(AppState::new(registrar, &args.telegram_token, status));

    let listener = TcpListener::bind(("0.0.0.0", args.port)).await?;
    info!(port = args.port, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    runtime.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

use std::{future::IntoFuture, process, sync::Arc, time::Duration};

use postboard::{
    application::{
        error::AppError,
        groups::{CreateGroupCommand, GroupService},
        repos::{GroupsRepo, GroupsWriteRepo, HealthRepo},
    },
    cache::{CacheConfig, CacheState},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, HttpState},
        telemetry,
    },
};
use tokio::{signal, sync::watch, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::CreateGroup(args) => run_create_group(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;

    let cache = CacheState::new(CacheConfig::from(&settings.cache));
    let http_state =
        HttpState::from_repositories(repositories.clone(), cache.clone(), settings.auth.clone());
    let health: Arc<dyn HealthRepo> = repositories;
    let admin_state = AdminState { health, cache };

    serve_http(&settings, http_state, admin_state).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let database_url = database_url(&settings)?;
    let pool = PostgresRepositories::connect(database_url, 1)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(target = "postboard::migrate", "schema is up to date");
    pool.close().await;
    Ok(())
}

async fn run_create_group(
    settings: config::Settings,
    args: config::CreateGroupArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let reader: Arc<dyn GroupsRepo> = repositories.clone();
    let writer: Arc<dyn GroupsWriteRepo> = repositories.clone();
    let service = GroupService::new(reader, writer);

    let group = service
        .create(CreateGroupCommand {
            title: args.title,
            slug: args.slug,
            description: args.description,
        })
        .await?;

    println!("/group/{}/", group.slug);
    repositories.pool().close().await;
    Ok(())
}

fn database_url(settings: &config::Settings) -> Result<&str, AppError> {
    settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = database_url(settings)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_router(http_state);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "postboard::server",
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "listeners bound"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()))
        .into_future();
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()))
        .into_future();

    let servers = async { try_join!(public_server, admin_server) };
    let deadline = shutdown_deadline(shutdown_rx, settings.server.graceful_shutdown);

    tokio::select! {
        result = servers => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
            info!(target = "postboard::server", "listeners stopped");
        }
        _ = deadline => {
            warn!(
                target = "postboard::server",
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
        }
    }

    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopping| *stopping).await;
}

async fn shutdown_deadline(rx: watch::Receiver<bool>, grace: Duration) {
    wait_for_shutdown(rx).await;
    tokio::time::sleep(grace).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!(target = "postboard::server", "received Ctrl+C, shutting down"),
            Err(err) => {
                error!(error = %err, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!(target = "postboard::server", "received SIGTERM, shutting down");
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

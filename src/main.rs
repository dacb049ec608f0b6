use std::{process, sync::Arc};

use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use vista::{
    application::{error::AppError, resolver::candidate_paths},
    config::{self, CandidatesArgs, Command, ServeArgs, Settings},
    domain::types::type_path,
    infra::{
        error::InfraError,
        http::{RenderState, build_router},
        telemetry,
    },
    presentation::pages::load_static_pages,
};

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
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        Command::Serve(_) => run_serve(settings).await,
        Command::Candidates(args) => {
            print_candidates(&settings, &args);
            Ok(())
        }
    }
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let registry = load_static_pages(&settings.server.resource_dir)?;
    let state = RenderState::new(Arc::new(registry), settings.views);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(
        addr = %settings.server.addr,
        resource_dir = %settings.server.resource_dir.display(),
        "serving pages"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn print_candidates(settings: &Settings, args: &CandidatesArgs) {
    let views = &settings.views;
    for type_name in &args.types {
        println!("{type_name}");
        for path in candidate_paths(
            &views.view_prefixes,
            &views.view_suffixes,
            &type_path(type_name),
            &args.view,
        ) {
            println!("  {path}");
        }
    }
}

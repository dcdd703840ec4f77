use std::{
    io::{self, Read},
    process,
    sync::Arc,
};

use gitreader::{
    application::{
        account::AccountService,
        checkout::CheckoutService,
        error::AppError,
        readme::ReadmeService,
        render::{
            RenderPipelineConfig, RenderRequest, RenderService, configure_render_service,
            render_service, stylesheet,
        },
        search::{SearchError, SearchService},
        suggestions::SuggestionService,
    },
    config,
    infra::{
        checkout::checkout_gateway,
        error::InfraError,
        github::GitHubClient,
        http::{self, ApiState, PageState, RouterState},
        identity::identity_provider,
        telemetry,
    },
};
use tokio::sync::Notify;
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
    configure_render_service(RenderPipelineConfig::from(&settings.render))
        .map_err(|err| AppError::unexpected(err.to_string()))?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(args).await,
        config::Command::Search(args) => run_search(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let github = Arc::new(GitHubClient::new(&settings.github)?);
    let renderer: Arc<dyn RenderService> = render_service();

    let search = Arc::new(SearchService::new(
        github.clone(),
        settings.github.per_page.get(),
    ));
    let suggestions = Arc::new(SuggestionService::new(github.clone()));
    let readme = Arc::new(ReadmeService::new(
        github,
        renderer,
        settings.render.cache_capacity,
    ));
    let identity = identity_provider(&settings.identity)?;
    let account = Arc::new(AccountService::new(identity.clone()));
    let checkout = Arc::new(CheckoutService::new(
        settings.checkout.catalog.clone(),
        identity,
        checkout_gateway(&settings.checkout)?,
        settings.checkout.success_url.as_str(),
        settings.checkout.cancel_url.as_str(),
    ));

    let pages = PageState {
        products: checkout
            .catalog()
            .products()
            .iter()
            .map(|product| product.view())
            .collect(),
        checkout_enabled: settings.checkout.endpoint.is_some(),
        sign_in_enabled: settings.identity.userinfo_url.is_some(),
    };
    let state = RouterState {
        api: ApiState {
            search,
            suggestions,
            readme,
            checkout,
            account,
        },
        pages,
    };

    serve_http(&settings, http::build_router(state)).await
}

async fn serve_http(settings: &config::Settings, router: axum::Router) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        addr = %settings.server.addr,
        checkout = settings.checkout.endpoint.is_some(),
        sign_in = settings.identity.userinfo_url.is_some(),
        "gitreader listening"
    );

    let stopping = Arc::new(Notify::new());
    let signalled = Arc::clone(&stopping);
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            shutdown_signal().await;
            signalled.notify_one();
        },
    );

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server => result
            .map_err(|err| AppError::unexpected(format!("server error: {err}"))),
        _ = async {
            stopping.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                grace_secs = grace.as_secs(),
                "graceful shutdown timed out, dropping open connections"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
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
    info!("shutdown signal received");
}

async fn run_render(args: config::RenderArgs) -> Result<(), AppError> {
    let markdown = if args.file.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|err| AppError::from(InfraError::from(err)))?;
        buffer
    } else {
        tokio::fs::read_to_string(&args.file)
            .await
            .map_err(|err| AppError::from(InfraError::from(err)))?
    };

    let mut request = RenderRequest::new(markdown, args.theme);
    if let Some(base_url) = args.base_url {
        request = request.with_base_url(base_url);
    }

    let document = render_service().render_request(&request);
    if document.degraded {
        warn!(
            file = %args.file.display(),
            "document could not be parsed, rendered as raw text"
        );
    }

    if args.standalone {
        println!("<style>\n{}</style>", stylesheet(args.theme));
    }
    print!("{}", document.html);
    Ok(())
}

async fn run_search(settings: config::Settings, args: config::SearchArgs) -> Result<(), AppError> {
    let github = Arc::new(GitHubClient::new(&settings.github)?);
    let search = SearchService::new(github, settings.github.per_page.get());

    let query = args.query.join(" ");
    let response = search
        .search(&query, args.page, None)
        .await
        .map_err(|err| match err {
            SearchError::Domain(err) => AppError::from(err),
            SearchError::Provider(err) => AppError::from(InfraError::upstream("github", err.to_string())),
        })?;

    for repository in &response.items {
        println!(
            "{:<48} {:>8}★  {}",
            repository.full_name,
            repository.stargazers_count,
            repository.description.as_deref().unwrap_or("")
        );
    }
    println!(
        "page {}/{} · {} repositories{}",
        response.pagination.current_page,
        response.pagination.total_pages,
        response.total_count,
        if response.truncated {
            " (only the first 1000 are reachable)"
        } else {
            ""
        }
    );
    Ok(())
}

use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use kidsteps::config::AppConfig;
use kidsteps::notify::build_notifier;
use kidsteps::openapi::ApiDoc;
use kidsteps::rate_limit::RateLimiterFacade;
use kidsteps::repo::JsonFileRepo;
use kidsteps::storage::build_media_store;
use kidsteps::{routes, AppState, SecurityHeaders};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env automatically only in debug builds; production sets the environment externally.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("invalid configuration: {e:#}");
            std::process::exit(1);
        }
    };
    info!("Bootstrapping KidSteps server");
    info!("Data directory: {}", cfg.data_dir.display());
    info!("Frontend URL: {}", cfg.frontend_url.as_deref().unwrap_or("(not set)"));

    let repo = JsonFileRepo::open(&cfg.data_dir);
    let media = match build_media_store(&cfg).await {
        Ok(m) => m,
        Err(e) => {
            error!("media store unavailable: {e:#}");
            std::process::exit(1);
        }
    };
    let state = AppState {
        repo: Arc::new(repo),
        media,
        notifier: build_notifier(&cfg),
        rate_limiter: Some(RateLimiterFacade::from_env()),
    };

    let openapi = ApiDoc::openapi();
    let frontend = cfg.frontend_url.clone();
    let security = SecurityHeaders::from_env();

    let server = HttpServer::new(move || {
        let cors = {
            let mut c = Cors::default()
                // local dev servers (Vite and CRA defaults)
                .allowed_origin("http://localhost:5173")
                .allowed_origin("http://127.0.0.1:5173")
                .allowed_origin("http://localhost:3001")
                .allowed_origin("http://127.0.0.1:3001")
                .allow_any_header()
                .allowed_methods(["GET", "POST", "OPTIONS"])
                .supports_credentials()
                .max_age(3600);
            if let Some(front) = &frontend {
                c = c.allowed_origin(front);
            }
            c
        };

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(security.clone())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(routes::config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
            .default_service(web::route().to(routes::not_found))
    })
    .bind((cfg.bind.as_str(), cfg.port))?;

    info!("Listening on http://{}:{}", cfg.bind, cfg.port);

    server.run().await
}

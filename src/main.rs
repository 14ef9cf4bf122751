use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::web::{scope, Data};
use actix_web::{App, HttpServer};
use dotenv::dotenv;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use bugvault::api::{self, ApiDoc};
use bugvault::auth::{AuthMiddleware, JwtVerifier};
use bugvault::configuration::get_configuration;
use bugvault::db::{init_db, migrate};
use bugvault::telemetry::{get_subscriber, init_subscriber};
use bugvault::util::{LogDispatcher, NotificationDispatcher, WebhookDispatcher};
use bugvault::workflow::{spawn_scheduler, AccessPolicy, BugWorkflow};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let subscriber = get_subscriber(
        "bugvault".into(),
        "info,sqlx=warn".into(),
        std::io::stdout,
    );
    init_subscriber(subscriber)?;

    info!("starting bugvault");

    let settings = get_configuration()?;

    let db = init_db(&settings.database_url).await?;
    migrate(&db).await?;

    let dispatcher: Arc<dyn NotificationDispatcher> = match &settings.notification_webhook_url {
        Some(url) => {
            info!(webhook = %url, "notifications go to webhook");
            Arc::new(WebhookDispatcher::new(url.clone()))
        }
        None => {
            info!("no notification webhook configured, logging notifications only");
            Arc::new(LogDispatcher)
        }
    };

    let policy = AccessPolicy::from_settings(&settings.workflow);
    let workflow = Arc::new(BugWorkflow::new(
        db,
        dispatcher,
        policy,
        settings.workflow.clone(),
    ));

    let scheduler = spawn_scheduler(workflow.clone(), settings.workflow.sweep_interval);

    let workflow_data = Data::from(workflow);
    let verifier = JwtVerifier::new(&settings.jwt_secret);
    let openapi = ApiDoc::openapi();

    info!(host = %settings.host, port = settings.port, "starting http server");
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(workflow_data.clone())
            .service(api::health_check)
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()))
            .service(
                scope("/api")
                    .wrap(AuthMiddleware::new(verifier.clone()))
                    .configure(api::configure),
            )
    })
    .bind((settings.host.as_str(), settings.port))?
    .run()
    .await?;

    scheduler.abort();
    Ok(())
}

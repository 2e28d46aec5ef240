use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::{error, info};
use sitesmith::config::Config;
use sitesmith::deploy::RestDeployer;
use sitesmith::job_controller::state::{start_job_updater, JobsState};
use sitesmith::services::{self, AppState};
use sitesmith::store::Store;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;
    let store = Store::open(config.database_path()).map_err(|e| {
        error!("Could not open {}: {}", config.database_path().display(), e);
        io::Error::other(e)
    })?;

    let state = AppState {
        store,
        layout: config.layout(),
        media_root: config.media_root(),
        upload_limit_bytes: config.upload_limit_bytes,
        deployer: Arc::new(RestDeployer::new(
            config.github_token.clone(),
            config.vercel_token.clone(),
        )),
    };

    // Initialize job controller state
    let (jobs_state, rx) = JobsState::new(100);
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        start_job_updater(updater_state, rx).await;
    });

    let url = config.url();
    if config.open_browser {
        let url = url.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(500));
            let _ = webbrowser::open(&url);
        });
    }

    info!(
        "Serving templates from {} and previews from {}",
        state.layout.templates_root.display(),
        state.layout.previews_root.display()
    );
    info!("Server running at {}", url);

    let upload_limit = config.upload_limit_bytes;
    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(upload_limit))
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(jobs_state.clone()))
            .configure(services::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

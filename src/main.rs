use task_manager::app::{self, StartupError};
use task_manager::config::Settings;

#[actix_web::main]
async fn main() -> Result<(), StartupError> {
    let settings = Settings::load()?;

    let default_level = if settings.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    log::info!("starting {}", settings.project_name);
    app::launch(settings).await
}

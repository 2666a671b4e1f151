use std::error::Error;

use api::AppConfig;
use tracing::info;

mod telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Optional .env; real environment variables take precedence.
    let dotenv = dotenvy::dotenv().ok();

    telemetry::init()?;
    if let Some(path) = dotenv {
        info!(path = %path.display(), "loaded .env");
    }

    let config = AppConfig::from_env()?;
    api::start(config).await?;

    Ok(())
}

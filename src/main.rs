use {
    std::panic,
    crate::{
        prelude::*,
        seen::SeenRaces,
    },
};

mod config;
mod export;
mod league;
mod prelude;
mod seen;
mod sheets;
mod time;

/// How often to poll the league API for newly scheduled races.
const POLL_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error(transparent)] Config(#[from] config::Error),
    #[error(transparent)] Reqwest(#[from] reqwest::Error),
    #[error(transparent)] Seen(#[from] seen::Error),
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging to systemd journal via stderr
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    let default_panic_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        log::error!("Thread panic: {info:?}");
        default_panic_hook(info)
    }));
    let config = Config::load().await?;
    let http_client = reqwest::Client::builder()
        .user_agent(concat!("LeagueSheets/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .use_rustls_tls()
        .hickory_dns(true)
        .https_only(true)
        .build()?;
    // The seen-set file is read once at startup; cycles only ever append to the
    // in-memory set and write it back through.
    let mut seen = SeenRaces::load(config.state_path.clone()).await?;
    let mut interval = tokio::time::interval(POLL_INTERVAL);
    loop {
        // First tick completes immediately, so the first cycle runs at startup.
        interval.tick().await;
        if let Err(e) = export::run_cycle(&http_client, &config, &mut seen).await {
            log::error!("export cycle failed: {e}");
        }
    }
}

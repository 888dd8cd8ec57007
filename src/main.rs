use std::sync::Arc;

use anyhow::Result;
use reqwest::Client;

use comic_cache::{
    ComicService,
    config::Config,
    jobs::DownloadJobTracker,
    resolver::{PageScrapeResolver, USER_AGENT},
    router,
    settings::SettingsStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .format_target(false)
        .init();

    let config = Config::parse();
    let port = config.port();

    let settings = SettingsStore::open(config.settings_file());
    let folder = config.cache_folder(&settings.snapshot()?.folder_path);
    log::info!("Caching strips in {}", folder.display());

    let client = Client::builder().user_agent(USER_AGENT).build()?;
    let resolver = Arc::new(PageScrapeResolver::new(
        client.clone(),
        config.page_template(),
    ));
    let tracker = DownloadJobTracker::new(resolver, client, config.limit());
    let service = ComicService::new(settings, folder, tracker)?;

    let app = router(service);

    let addr = format!("0.0.0.0:{}", port);
    log::info!("Server started: http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

use anyhow::{bail, Context, Result};
use skimmer_api::processor::DispatchProcessor;
use skimmer_api::state::AppState;
use skimmer_api::build_router;
use skimmer_cache::{Cache, RedisCache, ShardedCache};
use skimmer_config::{AppConfig, CacheType, SearchEngine};
use skimmer_extract::{
    Dispatcher, PdfAdapter, RedditAdapter, TwitterAdapter, WebpageAdapter, YoutubeAdapter,
};
use skimmer_fetch::build_http_client;
use skimmer_headless::BrowserPool;
use skimmer_search::{SearchClient, SearchProvider, SearxngProvider, SerperProvider};
use skimmer_workers::WorkerPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chromiumoxide=warn,hyper=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("loading configuration")?;
    tracing::info!(
        port = config.port,
        http_workers = config.http_worker_pool_size,
        browsers = config.browser_pool_size,
        "starting skimmer"
    );

    let http_client = build_http_client()?;

    let cache: Arc<dyn Cache> = match config.cache_type {
        CacheType::Memory => {
            let cache = ShardedCache::new();
            cache.spawn_sweepers();
            cache
        }
        CacheType::Redis => {
            let url = config.redis_connection_url();
            Arc::new(
                RedisCache::connect(&url)
                    .await
                    .context("connecting to redis")?,
            )
        }
    };

    let primary = build_search_provider(config.main_search_engine, &config, &http_client)?;
    let fallback = match config.fallback_search_engine {
        Some(engine) => match build_search_provider(engine, &config, &http_client) {
            Ok(provider) => Some(provider),
            Err(e) => {
                tracing::warn!(error = %e, "fallback search engine misconfigured, continuing without it");
                None
            }
        },
        None => None,
    };
    let search = Arc::new(SearchClient::new(primary, fallback));

    let browsers = Arc::new(
        BrowserPool::new(config.browser_pool_size)
            .await
            .context("launching browser pool")?,
    );

    let dispatcher = Arc::new(Dispatcher {
        pdf: PdfAdapter::new(http_client.clone()),
        webpage: WebpageAdapter::new(http_client.clone(), Arc::clone(&browsers)),
        reddit: RedditAdapter::new(
            http_client.clone(),
            config.reddit_client_id.clone(),
            config.reddit_client_secret.clone(),
            config.reddit_user_agent.clone(),
        ),
        youtube: YoutubeAdapter::new(
            http_client.clone(),
            config.youtube_api_key.clone(),
            config.youtube_transcript_order.clone(),
            config.transcript_service_url.clone(),
        ),
        twitter: TwitterAdapter::new(
            Arc::clone(&browsers),
            config.twitter_username.clone(),
            config.twitter_password.clone(),
            config.twitter_cookie_file.clone(),
        ),
    });

    let processor = Arc::new(DispatchProcessor::new(dispatcher));
    let http_pool = Arc::new(WorkerPool::start(
        "http",
        config.http_worker_pool_size,
        processor.clone(),
    ));
    let browser_pool = Arc::new(WorkerPool::start(
        "browser",
        config.browser_pool_size,
        processor,
    ));

    let state = AppState::new(
        cache,
        search,
        http_pool,
        browser_pool,
        config.search_cache_ttl,
        config.content_cache_ttl,
    );

    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    tracing::info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    tracing::info!("server stopped, closing browsers");
    browsers.shutdown().await;

    Ok(())
}

fn build_search_provider(
    engine: SearchEngine,
    config: &AppConfig,
    client: &reqwest::Client,
) -> Result<Arc<dyn SearchProvider>> {
    match engine {
        SearchEngine::Searxng => {
            let Some(base_url) = &config.searxng_url else {
                bail!("SEARXNG_URL is required for the searxng engine");
            };
            Ok(Arc::new(SearxngProvider::new(
                base_url.clone(),
                client.clone(),
            )))
        }
        SearchEngine::Serper => {
            let Some(api_key) = &config.serper_api_key else {
                bail!("SERPER_API_KEY is required for the serper engine");
            };
            Ok(Arc::new(SerperProvider::new(
                api_key.clone(),
                config.serper_api_url.clone(),
                client.clone(),
            )))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
    }
    tracing::info!("shutdown signal received");
}

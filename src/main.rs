use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use gloss_catalog::Catalog;
use gloss_types::{AnnotateConfig, DictionaryMode};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use termgloss::{
    AppState, Annotator, DEFAULT_DICTIONARY_ENDPOINT, DefinitionCache, DefinitionSource,
    HttpDefinitionSource, LookupThrottle, PlainTextExtractor, Resolver, Session, router,
};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_LOOKUP_RPS: u32 = 5;
const DEFAULT_LOOKUP_BURST: u32 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config();
    info!("binding to {}:{}", config.host, config.port);
    info!("dictionary endpoint {}", config.dictionary_endpoint);
    info!(
        "lookup timeout {} ms, throttle {} req/s (burst {})",
        config.lookup_timeout.as_millis(),
        config.lookup_rps,
        config.lookup_burst
    );
    info!(
        "default mode {} (simple english: {})",
        config.defaults.dictionary_mode, config.defaults.simple_english
    );

    let start = Instant::now();
    let catalog = match &config.catalog_dir {
        Some(dir) => {
            info!("loading extra catalog terms from {}", dir.display());
            Catalog::load(dir)?
        }
        None => Catalog::builtin(),
    };
    info!(
        "catalog ready in {} ms ({} combined terms)",
        start.elapsed().as_millis(),
        catalog.term_count(DictionaryMode::Combined)
    );

    let source: Arc<dyn DefinitionSource> = Arc::new(
        HttpDefinitionSource::new(&config.dictionary_endpoint, config.lookup_timeout)
            .context("building dictionary client")?,
    );
    let resolver = Resolver::new(source, Arc::new(DefinitionCache::new()))
        .with_timeout(config.lookup_timeout)
        .with_throttle(LookupThrottle::new(config.lookup_rps, config.lookup_burst));

    let state = AppState {
        annotator: Arc::new(Annotator::new(Arc::new(catalog), Arc::new(resolver))),
        session: Arc::new(Session::new()),
        extractor: Arc::new(PlainTextExtractor),
        defaults: config.defaults,
    };

    let app = router(state).layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Clone)]
struct Config {
    host: String,
    port: u16,
    dictionary_endpoint: String,
    lookup_timeout: Duration,
    lookup_rps: u32,
    lookup_burst: u32,
    catalog_dir: Option<PathBuf>,
    defaults: AnnotateConfig,
}

fn load_config() -> Config {
    let mut simple_english = false;
    let mut cli_catalog_dir: Option<PathBuf> = None;
    let mut cli_mode: Option<DictionaryMode> = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--simple-english" => simple_english = true,
            "--catalog-dir" => {
                if let Some(path) = args.next() {
                    cli_catalog_dir = Some(PathBuf::from(path));
                }
            }
            _ => {
                if let Some(path) = arg.strip_prefix("--catalog-dir=") {
                    cli_catalog_dir = Some(PathBuf::from(path));
                } else if let Some(mode) = arg.strip_prefix("--dictionary-mode=") {
                    cli_mode = DictionaryMode::from_name(mode);
                }
            }
        }
    }

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let dictionary_endpoint = env::var("DICTIONARY_ENDPOINT")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DICTIONARY_ENDPOINT.to_string());
    let lookup_timeout_ms = env::var("LOOKUP_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_LOOKUP_TIMEOUT_MS);
    let lookup_rps = env::var("LOOKUP_RPS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_LOOKUP_RPS);
    let lookup_burst = env::var("LOOKUP_BURST")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_LOOKUP_BURST);
    let catalog_dir = cli_catalog_dir.or_else(|| env::var("CATALOG_DIR").ok().map(PathBuf::from));
    let dictionary_mode = cli_mode
        .or_else(|| {
            env::var("DICTIONARY_MODE")
                .ok()
                .as_deref()
                .and_then(DictionaryMode::from_name)
        })
        .unwrap_or_default();

    Config {
        host,
        port,
        dictionary_endpoint,
        lookup_timeout: Duration::from_millis(lookup_timeout_ms),
        lookup_rps,
        lookup_burst,
        catalog_dir,
        defaults: AnnotateConfig {
            dictionary_mode,
            simple_english,
            ..AnnotateConfig::default()
        },
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = filter_max_level(&env_filter);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .init();
}

/// Most verbose level `filter` can enable, so the fmt cap never hides it.
fn filter_max_level(filter: &EnvFilter) -> Level {
    filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_level_follows_the_filter() {
        assert_eq!(filter_max_level(&EnvFilter::new("debug")), Level::DEBUG);
        assert_eq!(filter_max_level(&EnvFilter::new("warn")), Level::WARN);
        assert_eq!(filter_max_level(&EnvFilter::new("info,termgloss=trace")), Level::TRACE);
    }

    #[test]
    fn subscriber_honours_the_filter_level() {
        let filter = EnvFilter::new("debug");
        let max_level = filter_max_level(&filter);
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_max_level(max_level)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(Level::DEBUG));
        });

        let filter = EnvFilter::new("warn");
        let max_level = filter_max_level(&filter);
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_max_level(max_level)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            assert!(!tracing::enabled!(Level::INFO));
        });
    }
}

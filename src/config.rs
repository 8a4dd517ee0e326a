use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config::from_env()
});

#[derive(Debug, Clone)]
pub struct Config {
    /// `custom` runs the search/scrape/chunk/rank pipeline, `disabled` turns web context off.
    pub web_rag_provider: String,
    pub web_search_provider: String,
    pub serper_api_key: String,
    /// JSON array of pages served by the `static` search backend.
    pub web_search_fixture: Option<String>,
    pub web_scraper_provider: String,
    pub web_chunker_provider: String,
    pub web_ranking_provider: String,
    pub enable_chunking: bool,

    pub max_concurrent_fetches: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub local_k: usize,
    pub global_k: usize,
    pub max_results: usize,

    pub fetch_connect_timeout: Duration,
    pub fetch_timeout: Duration,
    pub search_timeout: Duration,
    /// Overall retrieval deadline; `None` disables it.
    pub pipeline_deadline: Option<Duration>,

    pub listen_addr: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            web_rag_provider: "custom".to_string(),
            web_search_provider: "serper".to_string(),
            serper_api_key: String::new(),
            web_search_fixture: None,
            web_scraper_provider: "http".to_string(),
            web_chunker_provider: "recursive".to_string(),
            web_ranking_provider: "bm25".to_string(),
            enable_chunking: true,
            max_concurrent_fetches: 10,
            chunk_size: 500,
            chunk_overlap: 0,
            local_k: 10,
            global_k: 20,
            max_results: 10,
            fetch_connect_timeout: Duration::from_millis(3_000),
            fetch_timeout: Duration::from_millis(10_000),
            search_timeout: Duration::from_millis(10_000),
            pipeline_deadline: Some(Duration::from_millis(20_000)),
            listen_addr: "127.0.0.1:8080".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Config {
        let d = Config::default();
        let deadline_ms = get_env_parsed_or("WEB_PIPELINE_DEADLINE_MS", 20_000u64);
        Config {
            web_rag_provider: get_env_or_default("WEB_RAG_PROVIDER", &d.web_rag_provider),
            web_search_provider: get_env_or_default("WEB_SEARCH_PROVIDER", &d.web_search_provider),
            serper_api_key: get_env_or_default("SERPER_API_KEY", ""),
            web_search_fixture: env::var("WEB_SEARCH_FIXTURE").ok().filter(|s| !s.is_empty()),
            web_scraper_provider: get_env_or_default(
                "WEB_SCRAPER_PROVIDER",
                &d.web_scraper_provider,
            ),
            web_chunker_provider: get_env_or_default(
                "WEB_CHUNKER_PROVIDER",
                &d.web_chunker_provider,
            ),
            web_ranking_provider: get_env_or_default(
                "WEB_RANKING_PROVIDER",
                &d.web_ranking_provider,
            ),
            enable_chunking: get_env_parsed_or("ENABLE_CHUNKING", d.enable_chunking),
            max_concurrent_fetches: get_env_parsed_or(
                "WEB_SCRAPE_MAX_CONCURRENT_URLS",
                d.max_concurrent_fetches,
            ),
            chunk_size: get_env_parsed_or("WEB_CHUNK_SIZE", d.chunk_size),
            chunk_overlap: get_env_parsed_or("WEB_CHUNK_OVERLAP", d.chunk_overlap),
            local_k: get_env_parsed_or("RANKER_LOCAL_TOP_K", d.local_k),
            global_k: get_env_parsed_or("RANKER_GLOBAL_TOP_K", d.global_k),
            max_results: get_env_parsed_or("WEB_MAX_RESULTS", d.max_results),
            fetch_connect_timeout: Duration::from_millis(get_env_parsed_or(
                "WEB_FETCH_CONNECT_TIMEOUT_MS",
                3_000u64,
            )),
            fetch_timeout: Duration::from_millis(get_env_parsed_or(
                "WEB_FETCH_TIMEOUT_MS",
                10_000u64,
            )),
            search_timeout: Duration::from_millis(get_env_parsed_or(
                "WEB_SEARCH_TIMEOUT_MS",
                10_000u64,
            )),
            pipeline_deadline: (deadline_ms > 0).then(|| Duration::from_millis(deadline_ms)),
            listen_addr: get_env_or_default("LISTEN_ADDR", &d.listen_addr),
            log_level: get_env_or_default("LOG_LEVEL", &d.log_level),
        }
    }
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_parsed_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    parse_or(key, env::var(key).ok(), default)
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("could not parse {key}={raw:?}, falling back to {default}");
            default
        }),
        None => default,
    }
}

/// Reads `LOG_LEVEL` straight from the environment. Call it before the
/// subscriber is installed and before anything touches [`CONFIG`], otherwise
/// warnings from parsing the rest of the config go nowhere.
pub fn log_level_from_env() -> tracing::Level {
    dotenv().ok();
    parse_log_level(env::var("LOG_LEVEL").ok().as_deref())
}

fn parse_log_level(raw: Option<&str>) -> tracing::Level {
    raw.and_then(|l| tracing::Level::from_str(l.trim()).ok())
        .unwrap_or(tracing::Level::INFO)
}

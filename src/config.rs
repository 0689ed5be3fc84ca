use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub api_key: String,
    pub bucket_id: String,
    pub video_bucket_id: String,
    pub request_timeout: Duration,
    pub bind_addr: String,
    pub project_id: String,
    pub cache_capacity: u64,
    pub cache_ttl: Duration,
}

const DEFAULT_BUCKET_ID: &str = "dbp-prod";
const DEFAULT_VIDEO_BUCKET_ID: &str = "dbp-vid";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_CACHE_CAPACITY: u64 = 10_000;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn load() -> Self {
        let api_base_url = std::env::var("BASE_API_ROUTE").unwrap_or_default();
        let api_key = std::env::var("DBP_API_KEY").unwrap_or_default();
        let bucket_id = std::env::var("DBP_BUCKET_ID").unwrap_or(DEFAULT_BUCKET_ID.into());
        let video_bucket_id =
            std::env::var("DBP_VIDEO_BUCKET_ID").unwrap_or(DEFAULT_VIDEO_BUCKET_ID.into());
        let timeout_secs = env_u64("DBP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or(DEFAULT_BIND_ADDR.into());
        let project_id = std::env::var("DBP_PROJECT_ID").unwrap_or_default();
        let cache_capacity = env_u64("DBP_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY);
        let cache_ttl_secs = env_u64("DBP_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS);
        Config {
            api_base_url,
            api_key,
            bucket_id,
            video_bucket_id,
            request_timeout: Duration::from_secs(timeout_secs),
            bind_addr,
            project_id,
            cache_capacity,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.is_empty() {
            return Err("DBP_API_KEY is missing".into());
        }
        if self.api_base_url.is_empty() {
            return Err("BASE_API_ROUTE is missing".into());
        }
        if self.request_timeout.is_zero() {
            return Err("DBP_TIMEOUT_SECS must be greater than zero".into());
        }
        if self.cache_capacity == 0 || self.cache_ttl.is_zero() {
            return Err("DBP_CACHE_CAPACITY and DBP_CACHE_TTL_SECS must be greater than zero".into());
        }
        Ok(())
    }
}

use reqwest::header::HeaderMap;
use reqwest::Method;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
    pub cached_at: Instant,
}

impl Bucket {
    pub fn resets_at(&self) -> Instant {
        self.cached_at + self.reset_after
    }
}

/// Tracks Discord's per-route rate limit buckets from response headers and
/// holds requests back while a bucket is exhausted.
#[derive(Debug, Default)]
pub struct RateLimiter {
    bucket_map: Mutex<HashMap<(String, Method), String>>,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_response_bucket(&self, endpoint: &str, method: &Method, headers: &HeaderMap) {
        let Some(bucket_id) = header_str(headers, "x-ratelimit-bucket") else {
            return;
        };

        let bucket = Bucket {
            limit: header_parse(headers, "x-ratelimit-limit").unwrap_or(1),
            remaining: header_parse(headers, "x-ratelimit-remaining").unwrap_or(1),
            reset_after: header_parse::<f64>(headers, "x-ratelimit-reset-after")
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .unwrap_or_default(),
            cached_at: Instant::now(),
        };

        tracing::debug!(
            "Bucket {} for {} {}: {}/{} remaining, resets in {:?}",
            bucket_id,
            method,
            endpoint,
            bucket.remaining,
            bucket.limit,
            bucket.reset_after
        );

        if let Ok(mut map) = self.bucket_map.lock() {
            map.insert((endpoint.to_string(), method.clone()), bucket_id.to_string());
        }
        if let Ok(mut buckets) = self.buckets.lock() {
            buckets.insert(bucket_id.to_string(), bucket);
        }
    }

    pub fn bucket_for(&self, endpoint: &str, method: &Method) -> Option<Bucket> {
        let bucket_id = self
            .bucket_map
            .lock()
            .ok()?
            .get(&(endpoint.to_string(), method.clone()))
            .cloned()?;
        self.buckets.lock().ok()?.get(&bucket_id).cloned()
    }

    pub async fn wait_until_not_ratelimited(&self, endpoint: &str, method: &Method) {
        let Some(bucket) = self.bucket_for(endpoint, method) else {
            return;
        };

        if bucket.remaining > 0 {
            return;
        }

        let now = Instant::now();
        let resets_at = bucket.resets_at();
        if resets_at > now {
            tracing::warn!(
                "{} {} is rate limited, waiting {:?}",
                method,
                endpoint,
                resets_at - now
            );
            tokio::time::sleep_until(resets_at).await;
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn header_parse<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    header_str(headers, name).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(bucket: &str, remaining: &str, reset_after: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert("x-ratelimit-bucket", HeaderValue::from_str(bucket).unwrap());
        h.insert("x-ratelimit-limit", HeaderValue::from_static("5"));
        h.insert("x-ratelimit-remaining", HeaderValue::from_str(remaining).unwrap());
        h.insert("x-ratelimit-reset-after", HeaderValue::from_str(reset_after).unwrap());
        h
    }

    #[test]
    fn test_ignores_responses_without_bucket() {
        let limiter = RateLimiter::new();
        limiter.save_response_bucket("channels/1", &Method::GET, &HeaderMap::new());
        assert!(limiter.bucket_for("channels/1", &Method::GET).is_none());
    }

    #[test]
    fn test_saves_bucket_per_route_and_method() {
        let limiter = RateLimiter::new();
        limiter.save_response_bucket("channels/1", &Method::GET, &headers("abcd", "4", "1.5"));

        let bucket = limiter.bucket_for("channels/1", &Method::GET).unwrap();
        assert_eq!(bucket.limit, 5);
        assert_eq!(bucket.remaining, 4);
        assert_eq!(bucket.reset_after, Duration::from_millis(1500));
        assert!(limiter.bucket_for("channels/1", &Method::PATCH).is_none());
    }

    #[test]
    fn test_unusable_reset_after_is_zero() {
        let limiter = RateLimiter::new();
        limiter.save_response_bucket("channels/1", &Method::GET, &headers("abcd", "0", "-3"));
        limiter.save_response_bucket("channels/2", &Method::GET, &headers("efgh", "0", "NaN"));
        limiter.save_response_bucket("channels/3", &Method::GET, &headers("ijkl", "0", "1e300"));

        for route in ["channels/1", "channels/2", "channels/3"] {
            let bucket = limiter.bucket_for(route, &Method::GET).unwrap();
            assert_eq!(bucket.reset_after, Duration::ZERO);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_exhausted_bucket() {
        let limiter = RateLimiter::new();
        limiter.save_response_bucket("channels/1", &Method::GET, &headers("abcd", "0", "2"));

        let start = Instant::now();
        limiter.wait_until_not_ratelimited("channels/1", &Method::GET).await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_wait_with_remaining_requests() {
        let limiter = RateLimiter::new();
        limiter.save_response_bucket("channels/1", &Method::GET, &headers("abcd", "3", "2"));

        let start = Instant::now();
        limiter.wait_until_not_ratelimited("channels/1", &Method::GET).await;
        assert!(start.elapsed() < Duration::from_millis(10));
    }
}

//! ApiClient - data fetching on top of the resilience layer.
//!
//! Ties the pieces together for call sites:
//! - GET responses are served from the API cache when present
//! - Offline with nothing cached fails fast without touching the network
//! - Each request uses the connection monitor's timeout recommendation
//! - Requests go through the retrying fetch, with the session token attached
//! - Bodies are decoded through the response envelope

use crate::cache::{ApiCache, CachedResponse};
use crate::envelope;
use crate::network::{ConnectionMonitor, FetchOptions, OfflineMonitor, RetryingFetch};
use crate::session::AuthSessionReader;
use crate::{MoverlyError, Result};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Backend client shared by feature code.
pub struct ApiClient {
    base: Url,
    fetch: RetryingFetch,
    cache: Arc<dyn ApiCache>,
    offline: Arc<OfflineMonitor>,
    connection: Arc<ConnectionMonitor>,
    session: AuthSessionReader,
}

impl ApiClient {
    pub fn new(
        base: Url,
        fetch: RetryingFetch,
        cache: Arc<dyn ApiCache>,
        offline: Arc<OfflineMonitor>,
        connection: Arc<ConnectionMonitor>,
        session: AuthSessionReader,
    ) -> Self {
        Self {
            base,
            fetch,
            cache,
            offline,
            connection,
            session,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve a backend path against the base URL.
    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    /// GET a path and decode its `data` payload.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_json_with(path, FetchOptions::default()).await
    }

    pub async fn get_json_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: FetchOptions,
    ) -> Result<T> {
        let url = self.url(path)?;
        let key = url.to_string();

        if let Some(cached) = self.cache.get(&key) {
            debug!("Serving {} from API cache", key);
            return envelope::decode_data(&cached.body, cached.status);
        }

        self.ensure_online(&key)?;

        let request = self.request(Method::GET, url);
        let (status, body) = self.send(request, options).await?;

        if (200..300).contains(&status) {
            let data = envelope::decode_data(&body, status)?;
            self.cache.insert(&key, CachedResponse::new(status, body));
            Ok(data)
        } else {
            Err(Self::client_error(status, &body))
        }
    }

    /// POST a JSON body and decode the `data` payload. Never cached.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post_json_with(path, body, FetchOptions::default()).await
    }

    pub async fn post_json_with<B, T>(
        &self,
        path: &str,
        body: &B,
        options: FetchOptions,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        self.ensure_online(url.as_str())?;

        let request = self.request(Method::POST, url).json(body);
        let (status, body) = self.send(request, options).await?;

        if (200..300).contains(&status) {
            envelope::decode_data(&body, status)
        } else {
            Err(Self::client_error(status, &body))
        }
    }

    /// Drop the cached response for a path.
    pub fn invalidate(&self, path: &str) -> Result<()> {
        let url = self.url(path)?;
        self.cache.invalidate(url.as_str());
        Ok(())
    }

    /// Drop every cached response. Cache keys ignore the bearer token, so
    /// this runs whenever the signed-in identity changes.
    pub fn clear_cache(&self) {
        self.cache.force_clear();
    }

    fn ensure_online(&self, key: &str) -> Result<()> {
        if self.offline.online_status() {
            Ok(())
        } else {
            Err(MoverlyError::Offline {
                key: key.to_string(),
            })
        }
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.fetch.client().request(method, url);
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(
        &self,
        request: RequestBuilder,
        mut options: FetchOptions,
    ) -> Result<(u16, Vec<u8>)> {
        if options.timeout.is_none() {
            options.timeout = Some(self.connection.api_timeout());
        }
        let response = self.fetch.fetch_with(request.build()?, options).await?;
        Self::read_body(response).await
    }

    async fn read_body(response: Response) -> Result<(u16, Vec<u8>)> {
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok((status, body.to_vec()))
    }

    /// Build the error for a non-2xx, non-5xx response.
    fn client_error(status: u16, body: &[u8]) -> MoverlyError {
        match envelope::decode::<serde_json::Value>(body) {
            Ok(envelope::Envelope::Failure { error, message }) => MoverlyError::Api {
                status,
                message: message.unwrap_or(error),
            },
            _ => MoverlyError::Api {
                status,
                message: reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("request failed")
                    .to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryApiCache;
    use crate::network::{ConnectionConfig, RetryConfig};
    use crate::session::MemoryTokenStorage;

    fn client(base: &str) -> (Arc<MemoryApiCache>, Arc<OfflineMonitor>, ApiClient) {
        let cache = Arc::new(MemoryApiCache::default());
        let offline = Arc::new(OfflineMonitor::new(cache.clone()));
        let connection = Arc::new(ConnectionMonitor::new(ConnectionConfig::default()).unwrap());
        let api = ApiClient::new(
            Url::parse(base).unwrap(),
            RetryingFetch::new(RetryConfig::default()).unwrap(),
            cache.clone(),
            offline.clone(),
            connection,
            AuthSessionReader::new(Arc::new(MemoryTokenStorage::new())),
        );
        (cache, offline, api)
    }

    #[test]
    fn test_url_joins_relative_and_absolute_paths() {
        let (_, _, api) = client("https://api.moverly.test/v1/");
        assert_eq!(
            api.url("blog/posts").unwrap().as_str(),
            "https://api.moverly.test/v1/blog/posts"
        );
        assert_eq!(
            api.url("/locations").unwrap().as_str(),
            "https://api.moverly.test/v1/locations"
        );
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let (cache, offline, api) = client("http://127.0.0.1:9/");
        cache.insert(
            "http://127.0.0.1:9/supplies",
            CachedResponse::new(200, br#"{"data":["boxes","tape"]}"#.to_vec()),
        );
        offline.handle_status(true);

        let supplies: Vec<String> = api.get_json("supplies").await.unwrap();
        assert_eq!(supplies, vec!["boxes", "tape"]);
    }

    #[tokio::test]
    async fn test_offline_without_cache_fails_fast() {
        let (_, offline, api) = client("http://127.0.0.1:9/");
        offline.handle_status(false);

        let err = api.get_json::<serde_json::Value>("testimonials").await.unwrap_err();
        assert!(matches!(err, MoverlyError::Offline { .. }));

        let err = api
            .post_json::<_, serde_json::Value>("quotes", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, MoverlyError::Offline { .. }));
    }

    #[test]
    fn test_client_error_from_envelope_and_fallback() {
        let err = ApiClient::client_error(404, br#"{"error":"not_found","message":"No such post"}"#);
        assert!(matches!(err, MoverlyError::Api { status: 404, ref message } if message == "No such post"));

        let err = ApiClient::client_error(403, b"<html>nope</html>");
        assert!(matches!(err, MoverlyError::Api { status: 403, ref message } if message == "Forbidden"));
    }
}

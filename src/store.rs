use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::time::Duration;
use tracing::info;

use crate::model::{ClubLogo, LogoMap};

pub const TABLE: &str = "club_logos";

/// Where the remote `club_logos` table lives.
#[derive(Clone)]
pub struct StoreConfig {
    url: String,
    key: String,
}

// The access key stays out of logs.
impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("key", &"***")
            .finish()
    }
}

impl StoreConfig {
    pub fn new(url: Option<String>, key: Option<String>) -> Result<Self> {
        let url = url.map(|s| s.trim().to_string()).unwrap_or_default();
        let key = key.map(|s| s.trim().to_string()).unwrap_or_default();
        match (url.is_empty(), key.is_empty()) {
            (false, false) => Ok(Self { url, key }),
            (true, true) => bail!("SUPABASE_URL and SUPABASE_KEY must be set to upload"),
            (true, false) => bail!("SUPABASE_URL must be set to upload"),
            (false, true) => bail!("SUPABASE_KEY must be set to upload"),
        }
    }
}

/// PostgREST table receiving one bulk insert per run.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteStore {
    pub fn new(config: StoreConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(&config.key).context("invalid SUPABASE_KEY")?;
        key.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.key))
            .context("invalid SUPABASE_KEY")?;
        bearer.set_sensitive(true);
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("prefer", HeaderValue::from_static("return=minimal"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{TABLE}", config.url.trim_end_matches('/')),
        })
    }

    /// Insert every club as one batch. Returns the number of rows sent.
    pub async fn insert_all(&self, logos: &LogoMap) -> Result<usize> {
        if logos.is_empty() {
            info!("nothing to upload");
            return Ok(0);
        }

        let rows: Vec<&ClubLogo> = logos.iter().collect();
        let res = self
            .client
            .post(&self.endpoint)
            .json(&rows)
            .send()
            .await
            .with_context(|| format!("POST {}", self.endpoint))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            bail!("upload to {TABLE} failed with {status}: {body}");
        }

        info!(table = TABLE, rows = rows.len(), "uploaded club logos");
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn config(url: &str) -> StoreConfig {
        StoreConfig::new(Some(url.to_string()), Some("secret-key".to_string())).unwrap()
    }

    #[test]
    fn config_should_require_both_values() {
        let err = StoreConfig::new(None, Some("k".to_string())).unwrap_err();
        assert_eq!(err.to_string(), "SUPABASE_URL must be set to upload");
        let err = StoreConfig::new(Some("http://db".to_string()), Some("  ".to_string()))
            .unwrap_err();
        assert_eq!(err.to_string(), "SUPABASE_KEY must be set to upload");
        assert!(StoreConfig::new(None, None).is_err());
    }

    #[test]
    fn config_debug_should_hide_key() {
        let text = format!("{:?}", config("http://db"));
        assert!(!text.contains("secret-key"));
    }

    #[tokio::test]
    async fn insert_all_should_post_one_batch() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/club_logos")
            .match_header("apikey", "secret-key")
            .match_header("authorization", "Bearer secret-key")
            .match_header("prefer", "return=minimal")
            .match_body(Matcher::Json(serde_json::json!([
                {"club_name": "CLUB A", "logo_url": "http://x/a.png"},
                {"club_name": "CLUB B", "logo_url": ""},
            ])))
            .with_status(201)
            .expect(1)
            .create_async()
            .await;
        let store = RemoteStore::new(config(&format!("{}/", server.url()))).unwrap();
        let mut logos = LogoMap::new();
        logos.insert("CLUB A", "http://x/a.png");
        logos.insert("CLUB B", "");

        assert_eq!(store.insert_all(&logos).await.unwrap(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn insert_all_should_fail_on_rejection() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/rest/v1/club_logos")
            .with_status(401)
            .with_body(r#"{"message":"Invalid API key"}"#)
            .create_async()
            .await;
        let store = RemoteStore::new(config(&server.url())).unwrap();
        let mut logos = LogoMap::new();
        logos.insert("CLUB A", "http://x/a.png");

        let err = store.insert_all(&logos).await.unwrap_err();
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[tokio::test]
    async fn insert_all_should_skip_empty_map() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let store = RemoteStore::new(config(&server.url())).unwrap();

        assert_eq!(store.insert_all(&LogoMap::new()).await.unwrap(), 0);
        mock.assert_async().await;
    }
}

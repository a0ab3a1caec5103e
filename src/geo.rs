use anyhow::{Context, Result};
use derive_builder::Builder;
use serde::Deserialize;
use std::{collections::HashSet, time::Duration};
use tracing::{info, warn};

pub const GEO_API_URL: &str = "https://geo.api.gouv.fr";
pub const DEFAULT_DEPARTMENT: &str = "38";

/// Postal codes of every commune of a department, from the public geo API.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct ZipCodeSource {
    #[builder(default = "GEO_API_URL.to_string()")]
    base_url: String,
    #[builder(default = "DEFAULT_DEPARTMENT.to_string()")]
    department: String,
    #[builder(default = "Duration::from_secs(30)")]
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct Commune {
    #[serde(rename = "codesPostaux", default)]
    postal_codes: Option<Vec<String>>,
}

impl ZipCodeSource {
    /// Fetch the postal codes, or nothing at all when the API can't be used.
    pub async fn fetch(&self) -> Vec<String> {
        match self.try_fetch().await {
            Ok(codes) => {
                info!(department = %self.department, count = codes.len(), "fetched postal codes");
                codes
            }
            Err(e) => {
                warn!(department = %self.department, "failed to fetch postal codes: {e:#}");
                vec![]
            }
        }
    }

    async fn try_fetch(&self) -> Result<Vec<String>> {
        let url = self.url();
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;
        let communes = client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()?
            .json::<Vec<Commune>>()
            .await
            .context("decoding communes")?;

        Ok(flatten_postal_codes(communes))
    }

    fn url(&self) -> String {
        format!(
            "{}/departements/{}/communes/",
            self.base_url.trim_end_matches('/'),
            self.department
        )
    }
}

fn flatten_postal_codes(communes: Vec<Commune>) -> Vec<String> {
    let mut seen = HashSet::new();
    communes
        .into_iter()
        .flat_map(|commune| commune.postal_codes.unwrap_or_default())
        .filter(|code| seen.insert(code.clone()))
        .collect()
}

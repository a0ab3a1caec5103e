use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{fs, path::PathBuf, time::Duration};

use crate::browser::{BrowserConfig, BrowserConfigBuilder, SITE_URL, WEBDRIVER_URL};
use crate::geo::{ZipCodeSourceBuilder, DEFAULT_DEPARTMENT, GEO_API_URL};
use crate::model::QueryKind;
use crate::output::{KeyOrder, OutputWriter, DEFAULT_OUTPUT};
use crate::scrape::{ScrapeOptions, ScrapeOptionsBuilder};
use crate::store::StoreConfig;

/// Collect football club logos from the district club directory.
#[derive(Debug, Parser)]
#[command(name = "club-logos", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON file receiving club name to logo URL
    #[arg(short, long, global = true, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Key order of the JSON file
    #[arg(long, global = true, value_enum, default_value_t = KeyOrder::Insertion)]
    pub order: KeyOrder,

    /// WebDriver server to drive Chrome through
    #[arg(long, global = true, env = "WEBDRIVER_URL", default_value = WEBDRIVER_URL)]
    pub webdriver: String,

    /// Club directory page
    #[arg(long, global = true, default_value = SITE_URL)]
    pub site_url: String,

    /// Show the browser window
    #[arg(long, global = true)]
    pub headed: bool,

    /// Seconds to wait for the page before giving up on a key
    #[arg(long, global = true, default_value_t = 10)]
    pub timeout: u64,

    /// Seconds to pause after each key
    #[arg(long, global = true, default_value_t = 0)]
    pub settle: u64,

    /// Also insert the results into the remote club_logos table
    #[arg(long, global = true)]
    pub upload: bool,

    #[arg(long, global = true, env = "SUPABASE_URL", hide_env_values = true)]
    pub supabase_url: Option<String>,

    #[arg(long, global = true, env = "SUPABASE_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search clubs by name
    Names {
        /// Club names to search
        clubs: Vec<String>,
        /// File with one club name per line, `#` starts a comment line
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Search every postal code of a department
    Postal {
        /// Department code
        #[arg(short, long, default_value = DEFAULT_DEPARTMENT)]
        department: String,
        /// Base URL of the geo API
        #[arg(long, default_value = GEO_API_URL)]
        geo_api: String,
    },
}

impl Cli {
    /// Remote store settings, `None` unless uploading. Missing credentials
    /// are an error.
    pub fn store_config(&self) -> Result<Option<StoreConfig>> {
        if !self.upload {
            return Ok(None);
        }
        StoreConfig::new(self.supabase_url.clone(), self.supabase_key.clone()).map(Some)
    }

    pub fn browser_config(&self) -> Result<BrowserConfig> {
        Ok(BrowserConfigBuilder::default()
            .webdriver_url(self.webdriver.clone())
            .site_url(self.site_url.clone())
            .headless(!self.headed)
            .timeout(Duration::from_secs(self.timeout))
            .build()?)
    }

    pub fn scrape_options(&self) -> Result<ScrapeOptions> {
        Ok(ScrapeOptionsBuilder::default()
            .kind(self.command.kind())
            .settle(Duration::from_secs(self.settle))
            .build()?)
    }

    pub fn output_writer(&self) -> OutputWriter {
        OutputWriter::new(&self.output, self.order)
    }

    /// The keys to search, in order.
    pub async fn resolve_keys(&self) -> Result<Vec<String>> {
        match &self.command {
            Command::Names { clubs, file } => {
                let mut names: Vec<String> = clubs
                    .iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if let Some(path) = file {
                    let content = fs::read_to_string(path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    names.extend(parse_name_list(&content));
                }
                Ok(names)
            }
            Command::Postal {
                department,
                geo_api,
            } => {
                let source = ZipCodeSourceBuilder::default()
                    .base_url(geo_api.clone())
                    .department(department.clone())
                    .build()?;
                Ok(source.fetch().await)
            }
        }
    }
}

impl Command {
    pub fn kind(&self) -> QueryKind {
        match self {
            Command::Names { .. } => QueryKind::ClubName,
            Command::Postal { .. } => QueryKind::PostalCode,
        }
    }
}

fn parse_name_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

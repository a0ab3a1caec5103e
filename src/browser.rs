use anyhow::{Context, Result};
use async_trait::async_trait;
use derive_builder::Builder;
use reqwest::Url;
use std::time::Duration;
use tokio::time::Instant;
use thirtyfour::{prelude::*, ChromeCapabilities};
use tracing::{info, warn};

use crate::extract::{parse_results, SearchOutcome, SEARCH_RESULTS};
use crate::scrape::{SearchSession, SessionLauncher};

pub const SITE_URL: &str = "https://isere.fff.fr/les-clubs/";
pub const WEBDRIVER_URL: &str = "http://localhost:9515";

const CONSENT_BUTTON: &str = "didomi-notice-agree-button";
const SEARCH_INPUT: &str = r#"input[placeholder="Recherchez un club par nom, ville ou CP"]"#;
const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Either way the site answers a search.
const ANSWER: &str = ".no_result_club, .search-club-list";

#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct BrowserConfig {
    #[builder(default = "WEBDRIVER_URL.to_string()")]
    webdriver_url: String,
    #[builder(default = "SITE_URL.to_string()")]
    site_url: String,
    #[builder(default = "true")]
    headless: bool,
    /// Upper bound of every explicit wait.
    #[builder(default = "Duration::from_secs(10)")]
    timeout: Duration,
}

/// Starts Chrome through a running WebDriver server.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    config: BrowserConfig,
}

/// The club directory, consent accepted, search box at hand.
pub struct ClubDirectory {
    driver: WebDriver,
    input: WebElement,
    base: Url,
    timeout: Duration,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    fn capabilities(&self) -> Result<ChromeCapabilities> {
        let mut caps = DesiredCapabilities::chrome();
        if self.config.headless {
            caps.set_headless()?;
        }
        caps.set_no_sandbox()?;
        caps.set_disable_dev_shm_usage()?;
        caps.add_chrome_arg("--window-size=1920,1080")?;
        Ok(caps)
    }
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    type Session = ClubDirectory;

    async fn launch(&self) -> Result<ClubDirectory> {
        let base = Url::parse(&self.config.site_url)
            .with_context(|| format!("invalid site url {}", self.config.site_url))?;
        let driver = WebDriver::new(&self.config.webdriver_url, self.capabilities()?)
            .await
            .with_context(|| format!("connecting to webdriver at {}", self.config.webdriver_url))?;

        match open_directory(&driver, &base, self.config.timeout).await {
            Ok(input) => {
                info!(site = %base, "club directory ready");
                Ok(ClubDirectory {
                    driver,
                    input,
                    base,
                    timeout: self.config.timeout,
                })
            }
            Err(e) => {
                if let Err(quit) = driver.quit().await {
                    warn!("failed to quit browser: {quit}");
                }
                Err(e)
            }
        }
    }
}

async fn open_directory(driver: &WebDriver, base: &Url, timeout: Duration) -> Result<WebElement> {
    driver
        .goto(base.as_str())
        .await
        .with_context(|| format!("opening {base}"))?;

    match accept_consent(driver, timeout).await {
        Ok(()) => info!("consent accepted"),
        Err(e) => warn!("consent banner not handled: {e}"),
    }

    driver
        .query(By::Css(SEARCH_INPUT))
        .wait(timeout, POLL_INTERVAL)
        .first()
        .await
        .context("search input not found")
}

async fn accept_consent(driver: &WebDriver, timeout: Duration) -> WebDriverResult<()> {
    let button = driver
        .query(By::Id(CONSENT_BUTTON))
        .wait(timeout, POLL_INTERVAL)
        .first()
        .await?;
    button.wait_until().clickable().await?;
    button.click().await
}

/// What the page showed before a search was submitted.
struct Answer {
    element: WebElement,
    html: String,
}

impl ClubDirectory {
    /// The answer currently on screen, if any.
    async fn answer(&self) -> WebDriverResult<Option<Answer>> {
        let shown = self.driver.find_all(By::Css(ANSWER)).await?;
        let Some(element) = shown.into_iter().next() else {
            return Ok(None);
        };
        let html = self.region_html().await?;
        Ok(Some(Answer { element, html }))
    }

    async fn region_html(&self) -> WebDriverResult<String> {
        match self.driver.find(By::Css(SEARCH_RESULTS)).await {
            Ok(region) => region.outer_html().await,
            Err(_) => self.driver.source().await,
        }
    }

    /// Wait until the site answers the search just submitted, then read it.
    ///
    /// An answer left over from the previous key does not count: the old
    /// element has to be gone or the region has to have changed.
    async fn read_results(&self, previous: Option<Answer>) -> WebDriverResult<SearchOutcome> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let previous_stale = match &previous {
                Some(answer) => !answer.element.is_present().await.unwrap_or(false),
                None => true,
            };
            let shown = self.driver.find_all(By::Css(ANSWER)).await?;
            if !shown.is_empty() {
                let html = self.region_html().await?;
                let before = previous.as_ref().map(|answer| answer.html.as_str());
                if is_fresh(before, &html, previous_stale) {
                    return Ok(parse_results(&html, &self.base));
                }
            }

            if Instant::now() >= deadline {
                return Ok(SearchOutcome::Failed(format!(
                    "no answer within {}s",
                    self.timeout.as_secs()
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// Whether the results region on screen answers the latest search.
fn is_fresh(previous: Option<&str>, current: &str, previous_stale: bool) -> bool {
    previous_stale || previous.map_or(true, |before| before != current)
}

#[async_trait]
impl SearchSession for ClubDirectory {
    async fn search(&mut self, key: &str) -> Result<SearchOutcome> {
        let previous = self.answer().await.unwrap_or_default();
        self.input.clear().await.context("clearing search input")?;
        self.input
            .send_keys(key)
            .await
            .with_context(|| format!("typing {key}"))?;
        self.input
            .send_keys(Key::Enter + "")
            .await
            .context("submitting search")?;

        Ok(match self.read_results(previous).await {
            Ok(outcome) => outcome,
            Err(e) => SearchOutcome::Failed(e.to_string()),
        })
    }

    async fn close(self) -> Result<()> {
        self.driver.quit().await.context("quitting browser")?;
        info!("browser closed");
        Ok(())
    }
}

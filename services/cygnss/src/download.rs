//! Sequential granule downloads from the PO.DAAC HTTP archive.
//!
//! Protected archive URLs redirect through Earthdata Login before landing on
//! the file. Redirects are followed by hand so the basic credentials are
//! sent to the login host only, and the session cookie it sets is replayed
//! on the way back.
//!
//! Files stream to `<name>.partial` and are renamed once complete, so a
//! granule present under its final name is always whole.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use futures::StreamExt;
use reqwest::{header, redirect, Client, Response, StatusCode, Url};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use cygnss_l1::archive::{date_range, SPACECRAFT_COUNT};
use cygnss_l1::{granule_file_name, DownloadConfig, LocalArchive, ProductLevel};

/// Host that receives Earthdata credentials.
pub const EARTHDATA_LOGIN_HOST: &str = "urs.earthdata.nasa.gov";

/// Retry and timeout policy.
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    /// Maximum number of retry attempts per granule
    pub max_retries: u32,
    /// Initial retry delay (doubles each retry)
    pub initial_retry_delay: Duration,
    pub max_retry_delay: Duration,
    pub request_timeout: Duration,
    pub max_redirects: usize,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_retry_delay: Duration::from_secs(2),
            max_retry_delay: Duration::from_secs(120),
            request_timeout: Duration::from_secs(600), // granules run to ~100 MB
            max_redirects: 10,
        }
    }
}

/// Earthdata Login account.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// One granule to fetch and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedGranule {
    pub url: String,
    pub path: PathBuf,
}

/// Every spacecraft's daily granule for each date in `start..=end`, laid out
/// under `dest_root` the way [`LocalArchive`] reads them.
pub fn plan_downloads(
    config: &DownloadConfig,
    dest_root: &Path,
    level: ProductLevel,
    version: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<PlannedGranule>> {
    if start > end {
        return Err(anyhow!("Start date {} is after end date {}", start, end));
    }

    let archive = LocalArchive::new(dest_root, level, version);
    let collection = config.collection_name(level.as_str(), version);
    let base = config.http_base_url.trim_end_matches('/');

    let mut plan = Vec::new();
    for date in date_range(start, end) {
        let dir = archive.daily_dir(date);
        for spacecraft in 1..=SPACECRAFT_COUNT {
            let name = granule_file_name(spacecraft, date, version)?;
            plan.push(PlannedGranule {
                url: format!("{}/{}/{}", base, collection, name),
                path: dir.join(&name),
            });
        }
    }
    Ok(plan)
}

/// Result of one granule download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded { bytes: u64 },
    AlreadyPresent,
    /// The archive has no such granule (spacecraft off, or not yet processed).
    NotAvailable,
}

/// Totals over a whole plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub downloaded: usize,
    pub already_present: usize,
    pub not_available: usize,
    pub failed: usize,
    pub bytes: u64,
}

impl DownloadSummary {
    pub fn record(&mut self, outcome: DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded { bytes } => {
                self.downloaded += 1;
                self.bytes += bytes;
            }
            DownloadOutcome::AlreadyPresent => self.already_present += 1,
            DownloadOutcome::NotAvailable => self.not_available += 1,
        }
    }
}

/// The archive refused the credentials; retrying will not help.
#[derive(Debug, Error)]
#[error("Archive rejected credentials ({0}); check EARTHDATA_USERNAME and EARTHDATA_PASSWORD")]
pub struct AuthRejected(StatusCode);

/// Downloads granules one at a time.
pub struct GranuleDownloader {
    client: Client,
    settings: DownloadSettings,
    credentials: Option<Credentials>,
}

impl GranuleDownloader {
    pub fn new(settings: DownloadSettings, credentials: Option<Credentials>) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(Duration::from_secs(30))
            .redirect(redirect::Policy::none())
            .cookie_store(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            settings,
            credentials,
        })
    }

    /// Download every planned granule in order. Failures are logged and
    /// counted; they never stop the rest of the plan.
    pub async fn run(&self, plan: &[PlannedGranule]) -> DownloadSummary {
        let mut summary = DownloadSummary::default();

        for granule in plan {
            match self.download(granule).await {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    warn!(url = %granule.url, error = %e, "Granule download failed");
                    summary.failed += 1;
                }
            }
        }

        info!(
            downloaded = summary.downloaded,
            already_present = summary.already_present,
            not_available = summary.not_available,
            failed = summary.failed,
            bytes = summary.bytes,
            "Download run complete"
        );
        summary
    }

    /// Download one granule with retry and exponential backoff.
    #[instrument(skip(self, granule), fields(url = %granule.url))]
    pub async fn download(&self, granule: &PlannedGranule) -> Result<DownloadOutcome> {
        if granule.path.exists() {
            debug!(path = %granule.path.display(), "Granule already present, skipping");
            return Ok(DownloadOutcome::AlreadyPresent);
        }
        if let Some(parent) = granule.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let partial = partial_path(&granule.path);
        let mut retry_count = 0;
        let mut delay = self.settings.initial_retry_delay;

        loop {
            match self.fetch_to(&granule.url, &partial).await {
                Ok(Some(bytes)) => {
                    fs::rename(&partial, &granule.path)
                        .await
                        .with_context(|| format!("Failed to move {}", partial.display()))?;
                    info!(path = %granule.path.display(), bytes = bytes, "Download completed");
                    return Ok(DownloadOutcome::Downloaded { bytes });
                }
                Ok(None) => {
                    info!("Granule not in archive");
                    return Ok(DownloadOutcome::NotAvailable);
                }
                Err(e) if e.downcast_ref::<AuthRejected>().is_some() => {
                    fs::remove_file(&partial).await.ok();
                    return Err(e);
                }
                Err(e) => {
                    retry_count += 1;
                    if retry_count > self.settings.max_retries {
                        fs::remove_file(&partial).await.ok();
                        return Err(anyhow!(
                            "Download failed after {} retries: {}",
                            self.settings.max_retries,
                            e
                        ));
                    }

                    warn!(
                        error = %e,
                        retry = retry_count,
                        max_retries = self.settings.max_retries,
                        delay_secs = delay.as_secs(),
                        "Download failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = next_delay(delay, self.settings.max_retry_delay);
                }
            }
        }
    }

    /// Fetch `url` into `path`. `Ok(None)` means the archive has no such file.
    async fn fetch_to(&self, url: &str, path: &Path) -> Result<Option<u64>> {
        let response = self.get_following_redirects(url).await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Ok(None),
            status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                return Err(AuthRejected(status).into())
            }
            status => return Err(anyhow!("HTTP error: {}", status)),
        }

        let expected = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let written = stream_to_file(response, path).await?;

        if let Some(expected) = expected {
            if written != expected {
                return Err(anyhow!(
                    "Download size mismatch: expected {} bytes, got {}",
                    expected,
                    written
                ));
            }
        }
        Ok(Some(written))
    }

    async fn get_following_redirects(&self, url: &str) -> Result<Response> {
        let mut current = Url::parse(url).with_context(|| format!("Invalid URL {}", url))?;

        for _ in 0..=self.settings.max_redirects {
            let mut request = self.client.get(current.clone());
            if let Some(credentials) = &self.credentials {
                if current.host_str() == Some(EARTHDATA_LOGIN_HOST) {
                    request = request.basic_auth(&credentials.username, Some(&credentials.password));
                }
            }

            let response = request.send().await.context("HTTP request failed")?;
            if !response.status().is_redirection() {
                return Ok(response);
            }

            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| anyhow!("Redirect from {} without a Location header", current))?;
            current = current
                .join(location)
                .with_context(|| format!("Invalid redirect target {}", location))?;
            debug!(host = current.host_str().unwrap_or_default(), "Following redirect");
        }

        Err(anyhow!("Too many redirects fetching {}", url))
    }
}

async fn stream_to_file(response: Response, path: &Path) -> Result<u64> {
    let mut file = fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Error reading response chunk")?;
        file.write_all(&chunk)
            .await
            .context("Error writing to file")?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

fn next_delay(delay: Duration, max: Duration) -> Duration {
    std::cmp::min(delay * 2, max)
}

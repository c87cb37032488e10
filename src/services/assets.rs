use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate};
use std::sync::Arc;
use url::Url;

use crate::core::config::Config;
use crate::core::io::{NativeStorage, Storage};

/// Fetches developer-provided text documents (about, manual, character files).
/// A missing document is an error, never empty content.
#[async_trait]
pub trait StaticTextSource: Send + Sync {
    async fn fetch_text(&self, path: &str) -> Result<String>;
}

pub struct StorageTextSource {
    storage: Arc<dyn Storage>,
}

impl StorageTextSource {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl StaticTextSource for StorageTextSource {
    async fn fetch_text(&self, path: &str) -> Result<String> {
        let bytes = self.storage.read(path).await?;
        String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", path))
    }
}

pub struct HttpTextSource {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpTextSource {
    pub fn new(base_url: &str) -> Result<Self> {
        // Without the trailing slash `join` would replace the last segment.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        Ok(Self {
            base_url: Url::parse(&normalized).with_context(|| format!("Invalid assets URL {}", base_url))?,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl StaticTextSource for HttpTextSource {
    async fn fetch_text(&self, path: &str) -> Result<String> {
        let url = self.base_url.join(path.trim_start_matches('/'))?;
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("Failed to fetch {}: {}", url, status));
        }
        Ok(resp.text().await?)
    }
}

pub fn create_text_source(config: &Config) -> Result<Arc<dyn StaticTextSource>> {
    match &config.assets_base_url {
        Some(base) => Ok(Arc::new(HttpTextSource::new(base)?)),
        None => Ok(Arc::new(StorageTextSource::new(Arc::new(NativeStorage::new(
            &config.assets_folder,
        ))))),
    }
}

const MIRANDA_BIRTH: (i32, u32, u32) = (2007, 1, 1);
const ANNELIES_BIRTH: (i32, u32, u32) = (2007, 3, 20);

/// Date-dependent `{...}` tokens used in the static documents.
#[derive(Clone, Copy, Debug)]
pub struct Placeholders {
    today: NaiveDate,
}

impl Placeholders {
    pub fn today() -> Self {
        Self::at(Local::now().date_naive())
    }

    pub fn at(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn expand(&self, text: &str) -> String {
        text.replace("{year}", &self.today.year().to_string())
            .replace("{day}", &self.today.day().to_string())
            .replace("{month}", &self.today.format("%B").to_string())
            .replace("{miranda-age}", &age_on(MIRANDA_BIRTH, self.today).to_string())
            .replace("{annelies-age}", &age_on(ANNELIES_BIRTH, self.today).to_string())
    }
}

/// Completed years between a `(year, month, day)` birth date and `today`.
pub fn age_on(birth: (i32, u32, u32), today: NaiveDate) -> i32 {
    let (year, month, day) = birth;
    let mut age = today.year() - year;
    if (today.month(), today.day()) < (month, day) {
        age -= 1;
    }
    age
}

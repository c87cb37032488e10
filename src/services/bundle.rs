use anyhow::{anyhow, bail, Context, Result};
use base64::Engine;
use futures_util::StreamExt;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::core::catalog::Catalog;
use crate::core::state::CreativeState;
use crate::services::assets::{Placeholders, StaticTextSource};
use crate::services::documents::about_text_or_fallback;
use crate::services::llm::LlmClient;
use crate::services::report::{
    build_report_markdown, bundle_file_name, render_report_html_document, style_and_instruments_line,
    ReportContext, ReportVariant,
};
use crate::services::staleness::{RegenerationPlan, ReportRefresh};

const MAX_CONCURRENT_IMAGE_FETCHES: usize = 4;

/// A finished archive plus the regenerated texts to store back.
#[derive(Debug)]
pub struct Bundle {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub state_update: ReportRefresh,
}

/// Collects every artifact of a song into one ZIP archive.
pub struct BundleAssembler<'a> {
    catalog: &'a Catalog,
    source: &'a dyn StaticTextSource,
    llm: Option<&'a dyn LlmClient>,
    model: &'a str,
    placeholders: Placeholders,
    http: reqwest::Client,
}

impl<'a> BundleAssembler<'a> {
    pub fn new(catalog: &'a Catalog, source: &'a dyn StaticTextSource) -> Self {
        Self {
            catalog,
            source,
            llm: None,
            model: "",
            placeholders: Placeholders::today(),
            http: reqwest::Client::new(),
        }
    }

    /// Without a client, stale introductions and translations are replaced
    /// by the no-key fallbacks.
    pub fn with_llm(mut self, llm: Option<&'a dyn LlmClient>, model: &'a str) -> Self {
        self.llm = llm;
        self.model = model;
        self
    }

    pub fn with_placeholders(mut self, placeholders: Placeholders) -> Self {
        self.placeholders = placeholders;
        self
    }

    /// Regenerates stale report texts and fetches the about text at the
    /// same time, then packs everything. Neither a failed generation nor a
    /// missing cover image fails the bundle.
    pub async fn assemble(&self, state: &CreativeState) -> Result<Bundle> {
        if !state.core_content_ready() {
            bail!("Cannot download collection, some assets are missing.");
        }
        log::info!("Preparing collection for \"{}\"", state.title);

        let plan = RegenerationPlan::evaluate(state, false);
        let (refresh, about) = futures_util::join!(
            plan.execute(self.llm, self.model, state),
            about_text_or_fallback(self.source, &self.placeholders),
        );

        let markdown = build_report_markdown(
            &ReportContext::new(state, self.catalog, &about).with_refresh(&refresh),
            ReportVariant::Export,
        );
        let html = render_report_html_document(&state.title, &markdown);

        let mut files: Vec<(String, Vec<u8>)> = vec![
            ("title.txt".to_string(), state.title.clone().into_bytes()),
            ("lyrics.txt".to_string(), state.lyrics.clone().into_bytes()),
            ("lyrics_plain.txt".to_string(), state.plain_lyrics().into_bytes()),
            (
                "style_and_instruments.txt".to_string(),
                style_and_instruments_line(state).into_bytes(),
            ),
            ("report.md".to_string(), markdown.into_bytes()),
            ("report.html".to_string(), html.into_bytes()),
        ];
        if !state.image_generation_skipped {
            files.extend(self.fetch_covers(state.cover_image_urls()).await);
        }

        let bytes = write_zip(&files).context("Failed to write collection archive")?;
        Ok(Bundle {
            file_name: bundle_file_name(&state.title),
            bytes,
            state_update: refresh,
        })
    }

    /// `cover-{n}.png` entries, numbered by position in the cover list.
    /// Images that cannot be fetched are left out.
    async fn fetch_covers(&self, urls: &[String]) -> Vec<(String, Vec<u8>)> {
        let results: Vec<(usize, Result<Vec<u8>>)> = futures_util::stream::iter(urls.iter().enumerate())
            .map(|(i, url)| async move { (i, self.fetch_image(url).await) })
            .buffer_unordered(MAX_CONCURRENT_IMAGE_FETCHES)
            .collect()
            .await;

        let mut covers: Vec<(usize, Vec<u8>)> = results
            .into_iter()
            .filter_map(|(i, result)| match result {
                Ok(bytes) => Some((i, bytes)),
                Err(e) => {
                    log::warn!("Skipping cover image {}: {:#}", i + 1, e);
                    None
                }
            })
            .collect();
        covers.sort_by_key(|(i, _)| *i);
        covers
            .into_iter()
            .map(|(i, bytes)| (format!("cover-{}.png", i + 1), bytes))
            .collect()
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        if url.starts_with("data:") {
            return decode_data_uri(url);
        }
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Bytes of a base64 `data:` URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let (header, data) = uri
        .split_once(',')
        .ok_or_else(|| anyhow!("Malformed data URI"))?;
    if !header.ends_with(";base64") {
        bail!("Only base64 data URIs are supported");
    }
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .context("Invalid base64 image data")
}

fn write_zip(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in files {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(bytes)?;
    }
    Ok(zip.finish()?.into_inner())
}

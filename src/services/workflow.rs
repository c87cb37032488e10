use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

use crate::core::catalog::Catalog;
use crate::core::config::Config;
use crate::core::error::GenerationError;
use crate::core::io::Storage;
use crate::core::state::{roster, CreativeState, QualityKey, SongRating};
use crate::services::assets::{Placeholders, StaticTextSource};
use crate::services::bundle::BundleAssembler;
use crate::services::characters::{get_character_descriptions, CharacterDescriptions};
use crate::services::documents::about_text_or_fallback;
use crate::services::image::ImageClient;
use crate::services::llm::{LlmClient, TextRequest};
use crate::services::prompt::{
    expand_topic_prompt, image_prompt_prompt, style_suggestion_prompt, title_and_lyrics_prompt,
    title_and_lyrics_schema,
};
use crate::services::report::{
    build_report_markdown, render_report_view_html, report_file_name, ReportContext, ReportVariant,
};
use crate::services::responses::{match_style_suggestion, normalize_text, parse_title_and_lyrics};
use crate::services::staleness::RegenerationPlan;

/// What a step did to the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Updated,
    Unchanged,
    /// Image quota is used up; the song can be finished without a cover.
    ImageSkipped(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LyricsMode {
    All,
    Title,
    Lyrics,
}

impl LyricsMode {
    pub fn thinking_message(&self) -> &'static str {
        match self {
            LyricsMode::All => "Crafting title and lyrics...",
            LyricsMode::Title => "Rethinking the title...",
            LyricsMode::Lyrics => "Rewriting the lyrics...",
        }
    }
}

/// The in-app report page: markdown plus its rendered HTML.
#[derive(Clone, Debug)]
pub struct ReportView {
    pub markdown: String,
    pub html: String,
}

/// Drives one song through the wizard steps. Every step reads the session
/// state, calls the generators and replaces the fields it produced.
pub struct SongWorkflow {
    config: Config,
    llm: Option<Box<dyn LlmClient>>,
    images: Option<Box<dyn ImageClient>>,
    source: Arc<dyn StaticTextSource>,
    storage: Arc<dyn Storage>,
    catalog: Catalog,
    state: CreativeState,
    placeholders: Placeholders,
}

impl SongWorkflow {
    pub async fn new(
        config: Config,
        llm: Option<Box<dyn LlmClient>>,
        images: Option<Box<dyn ImageClient>>,
        source: Arc<dyn StaticTextSource>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self> {
        let catalog = Catalog::load(source.as_ref()).await;
        let state = Self::load_state(&config.state_file, storage.as_ref()).await?;
        Ok(Self {
            config,
            llm,
            images,
            source,
            storage,
            catalog,
            state,
            placeholders: Placeholders::today(),
        })
    }

    pub fn with_placeholders(mut self, placeholders: Placeholders) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn state(&self) -> &CreativeState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CreativeState {
        &mut self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    async fn load_state(path: &str, storage: &dyn Storage) -> Result<CreativeState> {
        if storage.exists(path).await? {
            let bytes = storage.read(path).await?;
            let content = String::from_utf8(bytes)?;
            let mut state: CreativeState =
                serde_yaml_ng::from_str(&content).with_context(|| format!("Failed to parse {}", path))?;
            state.normalize();
            Ok(state)
        } else {
            Ok(CreativeState::default())
        }
    }

    pub async fn save_state(&self) -> Result<()> {
        let content = serde_yaml_ng::to_string(&self.state)?;
        self.storage.write(&self.config.state_file, content.as_bytes()).await
    }

    /// Discards the session, in memory and on disk.
    pub async fn reset(&mut self) -> Result<()> {
        self.state.reset();
        self.storage.delete(&self.config.state_file).await
    }

    fn require_llm(&self) -> Result<&dyn LlmClient, GenerationError> {
        self.llm.as_deref().ok_or(GenerationError::MissingApiKey)
    }

    async fn generate(&self, request: TextRequest) -> Result<String, GenerationError> {
        let llm = self.require_llm()?;
        llm.generate(&request).await.map_err(GenerationError::classify)
    }

    /// Replaces the topic with a richer story premise.
    pub async fn expand_topic(&mut self) -> Result<StepOutcome, GenerationError> {
        self.require_llm()?;
        if self.state.topic.trim().is_empty() {
            return Err(GenerationError::MissingInput("Please enter a topic first.".to_string()));
        }
        let prompt = expand_topic_prompt(&self.state.topic, &self.state.singers, self.state.rating);
        let expanded = self.generate(TextRequest::new(&self.config.text_model, prompt)).await?;
        self.state.topic = normalize_text(&expanded);
        log::info!("Topic expanded");
        Ok(StepOutcome::Updated)
    }

    /// Sets the style and preselects its default instruments.
    pub fn select_style(&mut self, style: &str) {
        self.state.set_style(Some(style.to_string()));
        self.state.instruments = self.catalog.default_instruments(style);
    }

    /// Optional enhancement: a failed or unusable answer leaves the style
    /// as it is.
    pub async fn suggest_style(&mut self) -> StepOutcome {
        if self.llm.is_none() {
            return StepOutcome::Unchanged;
        }
        let styles = self.catalog.style_names();
        if styles.is_empty() {
            return StepOutcome::Unchanged;
        }
        let mut request = TextRequest::new(
            &self.config.text_model,
            style_suggestion_prompt(&self.state, &styles),
        );
        request.temperature = Some(0.1);
        request.top_k = Some(1);

        match self.generate(request).await {
            Ok(raw) => match match_style_suggestion(&raw, &styles) {
                Some(style) => {
                    log::info!("AI suggested style: {}", style);
                    self.select_style(&style);
                    StepOutcome::Updated
                }
                None => StepOutcome::Unchanged,
            },
            Err(e) => {
                log::warn!("Style suggestion failed: {}", e);
                StepOutcome::Unchanged
            }
        }
    }

    /// Generates title and lyrics and keeps the parts `mode` asks for.
    pub async fn write_song(&mut self, mode: LyricsMode) -> Result<StepOutcome, GenerationError> {
        self.require_llm()?;
        if self.state.style.is_none() {
            return Err(GenerationError::MissingInput(
                "Please choose a music style first.".to_string(),
            ));
        }
        let mut request = TextRequest::new(&self.config.text_model, title_and_lyrics_prompt(&self.state));
        request.response_schema = Some(title_and_lyrics_schema(&self.state.language));

        let raw = self.generate(request).await?;
        let draft = parse_title_and_lyrics(&raw)?;
        if matches!(mode, LyricsMode::All | LyricsMode::Title) {
            self.state.title = draft.title;
        }
        if matches!(mode, LyricsMode::All | LyricsMode::Lyrics) {
            self.state.lyrics = draft.lyrics;
        }
        log::info!("Lyrics generation ({:?}) successful", mode);
        Ok(StepOutcome::Updated)
    }

    /// Regenerates stale report texts, stores what was generated and
    /// renders the report page.
    pub async fn refresh_report(&mut self, force: bool) -> ReportView {
        let plan = RegenerationPlan::evaluate(&self.state, force);
        let (refresh, about) = futures_util::join!(
            plan.execute(self.llm.as_deref(), &self.config.text_model, &self.state),
            about_text_or_fallback(self.source.as_ref(), &self.placeholders),
        );
        refresh.apply(&mut self.state);

        let ctx = ReportContext::new(&self.state, &self.catalog, &about).with_refresh(&refresh);
        let markdown = build_report_markdown(&ctx, ReportVariant::View);
        let html = render_report_view_html(&markdown);
        ReportView { markdown, html }
    }

    async fn generate_one_cover(
        &self,
        images: &dyn ImageClient,
        descriptions: &CharacterDescriptions,
    ) -> Result<(String, String), GenerationError> {
        let request_prompt = image_prompt_prompt(
            &self.state.topic,
            self.state.style.as_deref(),
            &self.state.singers,
            descriptions,
        );
        let prompt = normalize_text(
            &self
                .generate(TextRequest::new(&self.config.text_model, request_prompt))
                .await?,
        );
        let url = images
            .generate_image(&self.config.image_model, &prompt, self.config.cover_aspect_ratio)
            .await
            .map_err(GenerationError::classify)?;
        Ok((prompt, url))
    }

    fn cover_failure(&mut self, err: GenerationError) -> Result<StepOutcome, GenerationError> {
        if err.is_quota_exceeded() {
            log::warn!("Image quota exhausted: {}", err);
            self.state.image_generation_skipped = true;
            Ok(StepOutcome::ImageSkipped(err.user_message()))
        } else {
            Err(err)
        }
    }

    /// One more cover, appended and selected. Clears an earlier skip.
    pub async fn generate_cover(&mut self) -> Result<StepOutcome, GenerationError> {
        self.require_llm()?;
        if self.images.is_none() {
            return Err(GenerationError::MissingApiKey);
        }
        self.state.image_generation_skipped = false;
        let result = {
            let images = self.images.as_deref().ok_or(GenerationError::MissingApiKey)?;
            let descriptions = get_character_descriptions(self.source.as_ref()).await;
            self.generate_one_cover(images, &descriptions).await
        };
        match result {
            Ok((prompt, url)) => {
                self.state.add_cover_image(prompt, url);
                Ok(StepOutcome::Updated)
            }
            Err(e) => self.cover_failure(e),
        }
    }

    /// The first batch of covers, generated concurrently and stored in one
    /// update. Only runs for a written song with no covers yet.
    pub async fn generate_initial_covers(&mut self) -> Result<StepOutcome, GenerationError> {
        let Some(images) = self.images.as_deref() else {
            return Ok(StepOutcome::Unchanged);
        };
        if self.llm.is_none()
            || self.state.lyrics.is_empty()
            || !self.state.cover_image_urls().is_empty()
            || self.state.image_generation_skipped
        {
            return Ok(StepOutcome::Unchanged);
        }

        let descriptions = get_character_descriptions(self.source.as_ref()).await;
        let result = futures_util::future::try_join_all(
            (0..self.config.initial_cover_count).map(|_| self.generate_one_cover(images, &descriptions)),
        )
        .await;
        match result {
            Ok(covers) => {
                self.state.extend_cover_images(covers);
                Ok(StepOutcome::Updated)
            }
            Err(e) => self.cover_failure(e),
        }
    }

    pub fn skip_cover_image(&mut self) {
        self.state.image_generation_skipped = true;
    }

    /// Writes the collection archive to the output folder and returns its path.
    pub async fn download_bundle(&mut self) -> Result<String> {
        let bundle = BundleAssembler::new(&self.catalog, self.source.as_ref())
            .with_llm(self.llm.as_deref(), &self.config.text_model)
            .with_placeholders(self.placeholders)
            .assemble(&self.state)
            .await?;
        bundle.state_update.apply(&mut self.state);

        let path = format!("{}/{}", self.config.output_folder, bundle.file_name);
        self.storage.write(&path, &bundle.bytes).await?;
        Ok(path)
    }

    /// Writes the report page markdown to the output folder.
    pub async fn download_report(&mut self) -> Result<String> {
        let view = self.refresh_report(false).await;
        let path = format!(
            "{}/{}",
            self.config.output_folder,
            report_file_name(&self.state.title)
        );
        self.storage.write(&path, view.markdown.as_bytes()).await?;
        Ok(path)
    }

    /// The whole wizard, one prompt per step. In unattended mode the stored
    /// choices are used as they are.
    pub async fn run(&mut self) -> Result<()> {
        if !self.config.unattended {
            self.ask_topic()?;
        }
        if !self.config.unattended && confirm("Expand the topic with AI?", false)? {
            let pb = spinner("Expanding with AI...");
            let result = self.expand_topic().await;
            pb.finish_and_clear();
            report_failure("Failed to expand topic", result);
        }
        self.save_state().await?;

        if !self.config.unattended {
            self.ask_languages()?;
            self.ask_qualities()?;
        }

        let pb = spinner("Finding a matching style...");
        self.suggest_style().await;
        pb.finish_and_clear();
        if !self.config.unattended {
            self.ask_style()?;
            self.ask_instruments()?;
        } else if self.state.style.is_none() {
            if let Some(first) = self.catalog.style_names().first().cloned() {
                self.select_style(&first);
            }
        }
        self.save_state().await?;

        loop {
            let pb = spinner(LyricsMode::All.thinking_message());
            let result = self.write_song(LyricsMode::All).await;
            pb.finish_and_clear();
            match result {
                Ok(_) => break,
                Err(e) => {
                    println!("Failed to generate content: {}", e.user_message());
                    if self.config.unattended || !confirm("Try again?", true)? {
                        return Ok(());
                    }
                }
            }
        }
        println!("\n{}\n\n{}\n", self.state.title, self.state.lyrics);
        self.save_state().await?;

        let pb = spinner(&format!(
            "Generating {} image concepts...",
            self.config.initial_cover_count
        ));
        let result = self.generate_initial_covers().await;
        pb.finish_and_clear();
        self.handle_cover_result(result);
        if !self.config.unattended {
            self.ask_covers().await?;
        }
        self.save_state().await?;

        let pb = spinner("Generating report content...");
        let report = self.refresh_report(false).await;
        pb.finish_and_clear();
        if !self.config.unattended {
            println!("{}", report.markdown);
        }
        self.save_state().await?;

        if self.state.core_content_ready() {
            let pb = spinner("Preparing your collection...");
            let result = self.download_bundle().await;
            pb.finish_and_clear();
            match result {
                Ok(path) => println!("Collection saved to {}", path),
                Err(e) => println!("An error occurred while creating the ZIP file: {:#}", e),
            }
            self.save_state().await?;
        } else {
            println!("Cannot download collection, some assets are missing.");
        }
        Ok(())
    }

    fn handle_cover_result(&self, result: Result<StepOutcome, GenerationError>) {
        match result {
            Ok(StepOutcome::ImageSkipped(message)) => println!("{}", message),
            Ok(_) => {}
            Err(e) => println!("Failed to generate cover art: {}", e.user_message()),
        }
    }

    fn ask_topic(&mut self) -> Result<()> {
        let topic = inquire::Text::new("What is the song about?")
            .with_default(&self.state.topic)
            .prompt()?;
        self.state.topic = topic;

        let ratings = SongRating::ALL.to_vec();
        let cursor = ratings.iter().position(|r| *r == self.state.rating).unwrap_or(0);
        self.state.rating = inquire::Select::new("Rating:", ratings)
            .with_starting_cursor(cursor)
            .prompt()?;

        let all = roster();
        let names: Vec<String> = all.iter().map(|s| format!("{} ({})", s.name, s.voice)).collect();
        let selected: Vec<usize> = all
            .iter()
            .enumerate()
            .filter(|(_, s)| self.state.singers.iter().any(|c| c.name == s.name))
            .map(|(i, _)| i)
            .collect();
        let chosen = inquire::MultiSelect::new("Singers:", names.clone())
            .with_default(&selected)
            .prompt()?;
        let singers = all
            .into_iter()
            .zip(names)
            .filter(|(_, label)| chosen.contains(label))
            .map(|(singer, _)| singer)
            .collect();
        if let Err(e) = self.state.set_singers(singers) {
            println!("{}; keeping the current singers.", e);
        }
        Ok(())
    }

    fn ask_languages(&mut self) -> Result<()> {
        let languages = self.catalog.language_names();
        if languages.is_empty() {
            return Ok(());
        }
        let cursor = |current: &str| languages.iter().position(|l| l == current).unwrap_or(0);
        self.state.language = inquire::Select::new("Primary language:", languages.clone())
            .with_starting_cursor(cursor(&self.state.language))
            .prompt()?;
        self.state.language2 = inquire::Select::new("Secondary language:", languages.clone())
            .with_starting_cursor(cursor(&self.state.language2))
            .prompt()?;
        Ok(())
    }

    fn ask_qualities(&mut self) -> Result<()> {
        if !confirm("Tune optional qualities?", false)? {
            return Ok(());
        }
        const NONE: &str = "(none)";
        for key in QualityKey::ALL {
            let Some(group) = self.catalog.quality_groups.iter().find(|g| g.key == key) else {
                continue;
            };
            let mut options = vec![NONE.to_string()];
            options.extend(group.qualities.iter().map(|q| q.name.clone()));
            let cursor = self
                .state
                .quality(key)
                .and_then(|current| options.iter().position(|o| o == current))
                .unwrap_or(0);
            let answer = inquire::Select::new(&format!("{}:", group.group_name), options)
                .with_starting_cursor(cursor)
                .prompt()?;
            self.state
                .set_quality(key, (answer != NONE).then_some(answer));
        }
        Ok(())
    }

    fn ask_style(&mut self) -> Result<()> {
        let styles = self.catalog.style_names();
        if styles.is_empty() {
            return Ok(());
        }
        let cursor = self
            .state
            .style
            .as_deref()
            .and_then(|current| styles.iter().position(|s| s == current))
            .unwrap_or(0);
        let style = inquire::Select::new("Music style:", styles)
            .with_starting_cursor(cursor)
            .prompt()?;
        if self.state.style.as_deref() != Some(style.as_str()) {
            self.select_style(&style);
        }
        Ok(())
    }

    fn ask_instruments(&mut self) -> Result<()> {
        let Some(style) = self.state.style.as_deref().and_then(|s| self.catalog.style(s)) else {
            return Ok(());
        };
        let options: Vec<String> = style.instruments.iter().map(|i| i.name.clone()).collect();
        let selected: Vec<usize> = options
            .iter()
            .enumerate()
            .filter(|(_, name)| self.state.instruments.contains(name))
            .map(|(i, _)| i)
            .collect();
        self.state.instruments = inquire::MultiSelect::new("Instruments:", options)
            .with_default(&selected)
            .prompt()?;
        Ok(())
    }

    async fn ask_covers(&mut self) -> Result<()> {
        loop {
            let count = self.state.cover_image_urls().len();
            if count > 0 {
                let options: Vec<String> = (1..=count).map(|n| format!("Cover {}", n)).collect();
                let cursor = self.state.selected_cover_image_index().unwrap_or(0);
                let choice = inquire::Select::new("Selected cover:", options.clone())
                    .with_starting_cursor(cursor)
                    .prompt()?;
                let index = options.iter().position(|o| *o == choice);
                self.state.select_cover_image(index)?;
            }
            if self.state.image_generation_skipped || !confirm("Generate another cover?", false)? {
                return Ok(());
            }
            let pb = spinner("Generating new cover art...");
            let result = self.generate_cover().await;
            pb.finish_and_clear();
            self.handle_cover_result(result);
        }
    }
}

fn confirm(message: &str, default: bool) -> Result<bool> {
    Ok(inquire::Confirm::new(message).with_default(default).prompt()?)
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn report_failure(context: &str, result: Result<StepOutcome, GenerationError>) {
    if let Err(e) = result {
        println!("{}: {}", context, e.user_message());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::tests::{LANGUAGES, QUALITIES, STYLES};
    use crate::core::catalog::{LANGUAGES_PATH, QUALITIES_PATH, STYLES_PATH};
    use crate::core::io::NativeStorage;
    use crate::core::state::ANNELIES;
    use crate::services::assets::StorageTextSource;
    use crate::services::image::AspectRatio;
    use crate::services::staleness::tests::ScriptedLlm;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Default)]
    struct MockImages {
        quota_exceeded: bool,
        calls: Arc<Mutex<usize>>,
        aspects: Arc<Mutex<Vec<AspectRatio>>>,
    }

    #[async_trait]
    impl ImageClient for MockImages {
        async fn generate_image(&self, _model: &str, prompt: &str, aspect: AspectRatio) -> Result<String> {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            self.aspects.lock().unwrap().push(aspect);
            if self.quota_exceeded {
                return Err(anyhow!("Imagen API error: Quota exceeded for this project"));
            }
            Ok(format!("data:image/png;base64,{}-{}", prompt.len(), n))
        }
    }

    fn write_catalog(dir: &Path) -> Result<()> {
        std::fs::write(dir.join(STYLES_PATH), STYLES)?;
        std::fs::write(dir.join(QUALITIES_PATH), QUALITIES)?;
        std::fs::write(dir.join(LANGUAGES_PATH), LANGUAGES)?;
        Ok(())
    }

    async fn workflow(
        dir: &Path,
        llm: Option<ScriptedLlm>,
        images: Option<MockImages>,
    ) -> Result<SongWorkflow> {
        write_catalog(dir)?;
        let storage: Arc<dyn Storage> = Arc::new(NativeStorage::new(dir));
        let source: Arc<dyn StaticTextSource> = Arc::new(StorageTextSource::new(storage.clone()));
        let config = Config {
            unattended: true,
            ..Default::default()
        };
        SongWorkflow::new(
            config,
            llm.map(|l| Box::new(l) as Box<dyn LlmClient>),
            images.map(|i| Box::new(i) as Box<dyn ImageClient>),
            source,
            storage,
        )
        .await
    }

    fn song_json() -> &'static str {
        "```json\n{\"title\": \"Sea Glass\", \"lyrics\": \"[Verse]\\n[Miranda] Hello\"}\n```"
    }

    #[tokio::test]
    async fn test_steps_require_api_key() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut wf = workflow(dir.path(), None, None).await?;
        wf.state_mut().topic = "The sea".to_string();
        assert!(matches!(wf.expand_topic().await, Err(GenerationError::MissingApiKey)));
        assert!(matches!(
            wf.write_song(LyricsMode::All).await,
            Err(GenerationError::MissingApiKey)
        ));
        assert_eq!(wf.suggest_style().await, StepOutcome::Unchanged);
        Ok(())
    }

    #[tokio::test]
    async fn test_expand_topic_replaces_topic() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let llm = ScriptedLlm::replying("  Two friends build a lighthouse.  ", "");
        let mut wf = workflow(dir.path(), Some(llm.clone()), None).await?;

        assert!(matches!(wf.expand_topic().await, Err(GenerationError::MissingInput(_))));
        assert_eq!(llm.call_count(), 0);

        wf.state_mut().topic = "lighthouse".to_string();
        assert_eq!(wf.expand_topic().await?, StepOutcome::Updated);
        assert_eq!(wf.state().topic, "Two friends build a lighthouse.");
        assert!(llm.prompts.lock().unwrap()[0].contains("lighthouse"));
        Ok(())
    }

    #[tokio::test]
    async fn test_suggest_style_selects_defaults_or_keeps_state() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let llm = ScriptedLlm::replying("Synthwave", "");
        let mut wf = workflow(dir.path(), Some(llm), None).await?;
        assert_eq!(wf.suggest_style().await, StepOutcome::Updated);
        assert_eq!(wf.state().style.as_deref(), Some("Synthwave"));
        assert_eq!(wf.state().instruments, vec!["Analog Synth", "Drum Machine"]);

        let dir = tempfile::tempdir()?;
        let llm = ScriptedLlm::replying("Polka", "");
        let mut wf = workflow(dir.path(), Some(llm), None).await?;
        wf.select_style("Merfolk/Siren");
        let before = wf.state().clone();
        assert_eq!(wf.suggest_style().await, StepOutcome::Unchanged);
        assert_eq!(wf.state(), &before);
        Ok(())
    }

    #[tokio::test]
    async fn test_write_song_modes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let llm = ScriptedLlm::replying(song_json(), "");
        let mut wf = workflow(dir.path(), Some(llm), None).await?;
        assert!(matches!(
            wf.write_song(LyricsMode::All).await,
            Err(GenerationError::MissingInput(_))
        ));

        wf.select_style("Synthwave");
        wf.state_mut().lyrics = "old lyrics".to_string();
        wf.write_song(LyricsMode::Title).await?;
        assert_eq!(wf.state().title, "Sea Glass");
        assert_eq!(wf.state().lyrics, "old lyrics");

        wf.write_song(LyricsMode::All).await?;
        assert_eq!(wf.state().lyrics, "[Verse]\n[Miranda] Hello");
        Ok(())
    }

    #[tokio::test]
    async fn test_write_song_rejects_malformed_response() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let llm = ScriptedLlm::replying("Here are your lyrics!", "");
        let mut wf = workflow(dir.path(), Some(llm), None).await?;
        wf.select_style("Synthwave");
        let err = wf.write_song(LyricsMode::All).await.unwrap_err();
        assert!(matches!(err, GenerationError::MalformedGeneration { .. }));
        assert!(wf.state().title.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_initial_covers_are_stored_together() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let llm = ScriptedLlm::replying("A lighthouse at dusk", "");
        let images = MockImages::default();
        let mut wf = workflow(dir.path(), Some(llm), Some(images.clone())).await?;

        assert_eq!(wf.generate_initial_covers().await?, StepOutcome::Unchanged);
        wf.state_mut().lyrics = "[Verse]\nHello".to_string();

        assert_eq!(wf.generate_initial_covers().await?, StepOutcome::Updated);
        assert_eq!(wf.state().cover_image_urls().len(), 2);
        assert_eq!(wf.state().cover_image_prompts()[0], "A lighthouse at dusk");
        assert_eq!(wf.state().selected_cover_image_index(), Some(1));
        assert_eq!(*images.aspects.lock().unwrap(), vec![AspectRatio::Portrait9x16; 2]);

        // Covers exist, so nothing more is generated automatically.
        assert_eq!(wf.generate_initial_covers().await?, StepOutcome::Unchanged);
        assert_eq!(*images.calls.lock().unwrap(), 2);

        wf.generate_cover().await?;
        assert_eq!(wf.state().cover_image_urls().len(), 3);
        assert_eq!(wf.state().selected_cover_image_index(), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_quota_error_skips_images() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let llm = ScriptedLlm::replying("A prompt", "");
        let images = MockImages {
            quota_exceeded: true,
            ..Default::default()
        };
        let mut wf = workflow(dir.path(), Some(llm), Some(images)).await?;
        wf.state_mut().lyrics = "[Verse]\nHello".to_string();

        let outcome = wf.generate_initial_covers().await?;
        assert!(matches!(outcome, StepOutcome::ImageSkipped(_)));
        assert!(wf.state().image_generation_skipped);
        assert!(wf.state().cover_image_urls().is_empty());

        // An explicit request clears the skip before trying again.
        let outcome = wf.generate_cover().await?;
        assert!(matches!(outcome, StepOutcome::ImageSkipped(_)));
        assert!(wf.state().image_generation_skipped);
        Ok(())
    }

    #[tokio::test]
    async fn test_report_view_stores_generated_texts() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let llm = ScriptedLlm::replying("Their story.", "Hello there");
        let mut wf = workflow(dir.path(), Some(llm.clone()), None).await?;
        {
            let state = wf.state_mut();
            state.title = "Zee".to_string();
            state.lyrics = "[Dutch] [Miranda] Hallo".to_string();
            state.language = "Dutch".to_string();
            state.language2 = "Dutch".to_string();
        }

        let view = wf.refresh_report(false).await;
        assert_eq!(llm.call_count(), 2);
        assert_eq!(wf.state().report_introduction, "Their story.");
        assert_eq!(wf.state().translated_lyrics, "Hello there");
        assert_eq!(wf.state().report_lyrics_snapshot, wf.state().lyrics);
        assert!(view.markdown.contains("## Chapter 5: English Translation"));
        assert!(view.html.contains("<h1>Song Report: Zee</h1>"));

        wf.refresh_report(false).await;
        assert_eq!(llm.call_count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_downloads_and_state_persistence() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let llm = ScriptedLlm::replying("Intro.", "");
        let mut wf = workflow(dir.path(), Some(llm.clone()), None).await?;
        wf.select_style("Synthwave");
        wf.state_mut().title = "Sea Glass".to_string();
        wf.state_mut().lyrics = "[Verse]\nHello".to_string();

        let zip_path = wf.download_bundle().await?;
        assert_eq!(zip_path, "output/sea_glass.zip");
        assert!(dir.path().join("output/sea_glass.zip").exists());
        assert_eq!(wf.state().report_introduction, "Intro.");

        let md_path = wf.download_report().await?;
        assert_eq!(md_path, "output/sea_glass.md");
        assert_eq!(llm.call_count(), 1);

        wf.state_mut().set_singers(vec![roster()[1].clone()])?;
        wf.save_state().await?;
        let reloaded = workflow(dir.path(), None, None).await?;
        assert_eq!(reloaded.state().singers[0].name, ANNELIES);
        assert_eq!(reloaded.state().title, "Sea Glass");

        let mut reloaded = reloaded;
        reloaded.reset().await?;
        assert!(!dir.path().join("song.yml").exists());
        assert!(reloaded.state().title.is_empty());
        Ok(())
    }
}

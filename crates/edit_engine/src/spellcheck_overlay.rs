//! Debounced spell-check pipeline
//!
//! [`SpellcheckPipeline`] is the per-editor state machine
//! (`Idle -> Debouncing -> Checking -> Applying -> Idle`) and
//! [`SpellcheckService`] drives it on tokio against a shared engine. The
//! checker is awaited with no lock held, so typing continues while a check
//! is in flight; the response is only applied if the document text still
//! matches what was checked.

use crate::spellcheck_commands::{ApplyOverlays, IgnoreAll, RevertOverlays};
use crate::EditingEngine;
use doc_model::NodeType;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use text_check::{CheckError, CheckMatch, TextChecker};
use tokio::sync::{watch, Mutex, RwLock};

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellcheckConfig {
    /// Whether checking runs at all
    pub enabled: bool,
    /// Quiet period after the last change before checking (default: 1000)
    pub debounce_ms: u64,
    /// Number of checked texts whose results are remembered
    pub cache_capacity: usize,
}

impl Default for SpellcheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 1000,
            cache_capacity: 32,
        }
    }
}

impl SpellcheckConfig {
    pub fn with_debounce(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Create a config with checking switched off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Where the pipeline is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayState {
    Idle,
    Debouncing,
    Checking,
    Applying,
}

/// Checker results keyed by the exact text checked. Oldest entry goes first.
#[derive(Debug, Clone)]
pub struct CheckCache {
    capacity: usize,
    entries: VecDeque<(String, Vec<CheckMatch>)>,
}

impl CheckCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::new(),
        }
    }

    pub fn get(&self, text: &str) -> Option<&[CheckMatch]> {
        self.entries
            .iter()
            .find(|(key, _)| key == text)
            .map(|(_, matches)| matches.as_slice())
    }

    pub fn insert(&mut self, text: String, matches: Vec<CheckMatch>) {
        if self.capacity == 0 {
            return;
        }
        self.entries.retain(|(key, _)| *key != text);
        self.entries.push_back((text, matches));
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A check cycle in flight
#[derive(Debug, Clone)]
pub struct CheckRequest {
    /// Flattened document text sent to the checker
    pub text: String,
    /// Results already known for this text
    pub cached: Option<Vec<CheckMatch>>,
}

/// How a check cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Overlays were laid; the count may be zero
    Applied(usize),
    /// The document text changed while the checker ran
    Stale,
    /// A newer change restarted the debounce before the response arrived
    Superseded,
    /// The checker failed; any overlays were cleared
    Failed,
}

/// Per-editor overlay state machine
#[derive(Debug)]
pub struct SpellcheckPipeline {
    config: SpellcheckConfig,
    state: OverlayState,
    cache: CheckCache,
    /// Lowercase words dismissed with "ignore all"
    ignored: HashSet<String>,
}

impl SpellcheckPipeline {
    pub fn new(config: SpellcheckConfig) -> Self {
        Self {
            cache: CheckCache::new(config.cache_capacity),
            config,
            state: OverlayState::Idle,
            ignored: HashSet::new(),
        }
    }

    pub fn config(&self) -> &SpellcheckConfig {
        &self.config
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn cache(&self) -> &CheckCache {
        &self.cache
    }

    pub fn ignored_words(&self) -> &HashSet<String> {
        &self.ignored
    }

    /// The document changed: (re)start the quiet period
    pub fn on_change(&mut self) {
        if !self.config.enabled {
            return;
        }
        if self.state != OverlayState::Debouncing {
            tracing::debug!("Spellcheck {:?} -> Debouncing", self.state);
        }
        self.state = OverlayState::Debouncing;
    }

    /// The quiet period elapsed: snapshot the text to check
    pub fn begin_check(&mut self, engine: &EditingEngine) -> Option<CheckRequest> {
        if self.state != OverlayState::Debouncing {
            return None;
        }
        self.state = OverlayState::Checking;
        let text = engine.tree().text_content();
        let cached = self.cache.get(&text).map(<[CheckMatch]>::to_vec);
        tracing::debug!(
            "Spellcheck Debouncing -> Checking ({} chars, cached: {})",
            text.chars().count(),
            cached.is_some()
        );
        Some(CheckRequest { text, cached })
    }

    /// The checker answered: apply its matches if they still fit the document
    pub fn finish_check(
        &mut self,
        engine: &mut EditingEngine,
        request: CheckRequest,
        response: std::result::Result<Vec<CheckMatch>, CheckError>,
    ) -> CheckOutcome {
        let matches = match response {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!("Spellcheck failed: {}", e);
                engine.execute_transient(&RevertOverlays::new());
                if self.state == OverlayState::Checking {
                    self.state = OverlayState::Idle;
                }
                return CheckOutcome::Failed;
            }
        };
        if request.cached.is_none() {
            self.cache.insert(request.text.clone(), matches.clone());
        }

        if self.state != OverlayState::Checking {
            tracing::debug!("Spellcheck response superseded by a newer change");
            return CheckOutcome::Superseded;
        }
        if engine.tree().text_content() != request.text {
            tracing::debug!("Spellcheck response is stale, skipping");
            self.state = OverlayState::Idle;
            return CheckOutcome::Stale;
        }

        self.state = OverlayState::Applying;
        let command = ApplyOverlays::new(request.text, matches).with_ignored(self.ignored.clone());
        engine.execute_transient(&command);
        let applied = engine.tree().nodes_of_type(NodeType::OverlayMarker).len();
        self.state = OverlayState::Idle;
        tracing::debug!("Spellcheck Applying -> Idle ({} overlays)", applied);
        CheckOutcome::Applied(applied)
    }

    /// Dismiss every overlay of `word` and keep it unflagged for the session
    pub fn ignore_all(&mut self, engine: &mut EditingEngine, word: &str) {
        self.ignored.insert(word.to_lowercase());
        engine.execute_transient(&IgnoreAll::new(word));
    }
}

/// Runs a [`SpellcheckPipeline`] in the background for one editor
pub struct SpellcheckService<C> {
    engine: Arc<RwLock<EditingEngine>>,
    checker: Arc<C>,
    pipeline: Mutex<SpellcheckPipeline>,
    changes: watch::Sender<u64>,
}

impl<C> SpellcheckService<C>
where
    C: TextChecker + 'static,
{
    pub fn new(engine: Arc<RwLock<EditingEngine>>, checker: Arc<C>, config: SpellcheckConfig) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            engine,
            checker,
            pipeline: Mutex::new(SpellcheckPipeline::new(config)),
            changes,
        }
    }

    pub fn engine(&self) -> &Arc<RwLock<EditingEngine>> {
        &self.engine
    }

    pub async fn state(&self) -> OverlayState {
        self.pipeline.lock().await.state()
    }

    /// Tell the pipeline the user edited the document
    pub async fn notify_change(&self) {
        self.pipeline.lock().await.on_change();
        self.changes.send_modify(|generation| *generation += 1);
    }

    pub async fn ignore_all(&self, word: &str) {
        let mut engine = self.engine.write().await;
        self.pipeline.lock().await.ignore_all(&mut engine, word);
    }

    /// Run one check cycle now, skipping the quiet period
    pub async fn check_now(&self) -> Option<CheckOutcome> {
        self.pipeline.lock().await.on_change();
        self.run_check().await
    }

    async fn run_check(&self) -> Option<CheckOutcome> {
        let request = {
            let engine = self.engine.read().await;
            self.pipeline.lock().await.begin_check(&engine)
        }?;

        let response = match request.cached.clone() {
            Some(matches) => Ok(matches),
            None => self.checker.check(&request.text).await,
        };

        let mut engine = self.engine.write().await;
        let outcome = self
            .pipeline
            .lock()
            .await
            .finish_check(&mut engine, request, response);
        Some(outcome)
    }

    /// Start the background task. Each change restarts the quiet period;
    /// once it elapses the document is checked.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let mut changes = self.changes.subscribe();
        let service = self;

        tokio::spawn(async move {
            loop {
                if changes.changed().await.is_err() {
                    return;
                }
                let debounce = service.pipeline.lock().await.config().debounce();

                // Coalesce a burst of changes into one check
                loop {
                    match tokio::time::timeout(debounce, changes.changed()).await {
                        Ok(Ok(())) => continue,
                        Ok(Err(_)) => return,
                        Err(_) => break,
                    }
                }

                if let Some(outcome) = service.run_check().await {
                    tracing::debug!("Spellcheck cycle finished: {:?}", outcome);
                }
            }
        })
    }
}

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cache::{Clock, RequestCache, SystemClock, TtlCache};
use crate::config::EnhancerConfig;
use crate::diagnostics::DiagnosticsScorer;
use crate::entitlement::{EntitlementService, HttpEntitlementClient, UnlimitedEntitlements};
use crate::error::EnhanceError;
use crate::fallback::FallbackGenerator;
use crate::generation::{GenerationClient, GenerationError, TextGenerator};
use crate::history::{FileStore, HistoryStore, LocalHistoryRecord, GUEST_KEY};
use crate::prompts::PromptBuilder;
use crate::{ContentSource, EnhancementRequest, EnhancementResult, PlatformContent, UsageState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementPhase {
    CheckingEntitlement,
    CacheHit,
    Generating,
    FallbackGenerating,
    Scoring,
    Persisting,
    Done,
}

impl EnhancementPhase {
    pub fn label(self) -> &'static str {
        match self {
            EnhancementPhase::CheckingEntitlement => "checking_entitlement",
            EnhancementPhase::CacheHit => "cache_hit",
            EnhancementPhase::Generating => "generating",
            EnhancementPhase::FallbackGenerating => "fallback_generating",
            EnhancementPhase::Scoring => "scoring",
            EnhancementPhase::Persisting => "persisting",
            EnhancementPhase::Done => "done",
        }
    }
}

/// Who is asking. Identity resolution itself happens outside this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<String>,
    pub is_admin: bool,
}

impl Identity {
    pub fn guest() -> Self {
        Self::default()
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            is_admin: false,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            is_admin: true,
        }
    }

    pub fn key(&self) -> &str {
        self.user_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(GUEST_KEY)
    }
}

pub struct EnhancementOrchestrator {
    generator: Option<Arc<dyn TextGenerator>>,
    entitlements: Arc<dyn EntitlementService>,
    history: HistoryStore,
    fallback: FallbackGenerator,
    request_cache: RequestCache,
    usage_cache: TtlCache<UsageState>,
    clock: Arc<dyn Clock>,
    default_limit: i64,
    default_plan: String,
}

impl EnhancementOrchestrator {
    pub fn new(entitlements: Arc<dyn EntitlementService>, history: HistoryStore) -> Self {
        Self {
            generator: None,
            entitlements,
            history,
            fallback: FallbackGenerator::new(),
            request_cache: RequestCache::new(Duration::from_secs(300), 64),
            usage_cache: TtlCache::new(Duration::from_secs(60), 1024),
            clock: Arc::new(SystemClock),
            default_limit: 10,
            default_plan: "free".to_string(),
        }
    }

    /// Wires every collaborator from configuration. `offline` skips the
    /// remote generator entirely.
    pub fn from_config(config: &EnhancerConfig, offline: bool) -> Result<Self, String> {
        let entitlements: Arc<dyn EntitlementService> = match HttpEntitlementClient::from_config(config)? {
            Some(client) => Arc::new(client),
            None => Arc::new(UnlimitedEntitlements),
        };
        let history = HistoryStore::new(
            Arc::new(FileStore::new(config.history.dir.clone())),
            config.history.cap,
        );

        let mut orchestrator = Self::new(entitlements, history)
            .with_request_cache(RequestCache::new(
                Duration::from_secs(config.cache.ttl_secs),
                config.cache.max_entries,
            ))
            .with_usage_ttl(Duration::from_secs(config.usage.cache_ttl_secs))
            .with_usage_defaults(config.usage.default_limit, &config.usage.default_plan);

        if !offline {
            let client = GenerationClient::from_config(config);
            if !client.has_credential() {
                warn!(
                    "{} is not set; every remote attempt will fail over to local generation",
                    config.generation.api_key_env
                );
            }
            orchestrator = orchestrator.with_generator(Arc::new(client));
        }
        Ok(orchestrator)
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackGenerator) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_request_cache(mut self, cache: RequestCache) -> Self {
        self.request_cache = cache;
        self
    }

    pub fn with_usage_ttl(mut self, ttl: Duration) -> Self {
        self.usage_cache = TtlCache::new(ttl, 1024);
        self
    }

    pub fn with_usage_defaults(mut self, limit: i64, plan: &str) -> Self {
        self.default_limit = limit;
        self.default_plan = plan.to_string();
        self
    }

    pub async fn enhance(
        &self,
        identity: &Identity,
        request: &EnhancementRequest,
    ) -> Result<EnhancementResult, EnhanceError> {
        self.enhance_observed(identity, request, &|_: EnhancementPhase| {}).await
    }

    /// Runs one enhancement, reporting each phase transition to `observer`.
    pub async fn enhance_observed(
        &self,
        identity: &Identity,
        request: &EnhancementRequest,
        observer: &(dyn Fn(EnhancementPhase) + Send + Sync),
    ) -> Result<EnhancementResult, EnhanceError> {
        observer(EnhancementPhase::CheckingEntitlement);
        let usage = self.check_entitlement(identity).await;
        if !usage.can_use {
            info!(
                identity = identity.key(),
                current = usage.current_usage,
                limit = usage.monthly_limit,
                "usage limit reached"
            );
            return Err(EnhanceError::UsageLimitReached {
                current: usage.current_usage,
                limit: usage.monthly_limit,
                plan: usage.plan_name,
            });
        }

        let fingerprint = request.fingerprint();
        let cache_key = format!("{}:{}", identity.key(), fingerprint);
        if let Some(cached) = self.request_cache.get(&cache_key, self.clock.now()) {
            debug!(identity = identity.key(), fingerprint = %fingerprint, "serving enhancement from request cache");
            observer(EnhancementPhase::CacheHit);
            observer(EnhancementPhase::Done);
            return Ok(cached);
        }

        let remote = match self.generator.as_ref() {
            Some(generator) => {
                observer(EnhancementPhase::Generating);
                self.generate_remote(generator, request).await?
            }
            None => PlatformContent::new(),
        };

        let result = if remote.has_content() {
            observer(EnhancementPhase::Scoring);
            let diagnostics = DiagnosticsScorer::score(
                request.original_text(),
                request.category(),
                request.tone(),
                Some(&remote),
            );
            EnhancementResult {
                platform_content: remote,
                diagnostics,
                source: ContentSource::Remote,
            }
        } else {
            observer(EnhancementPhase::FallbackGenerating);
            let mut result =
                self.fallback
                    .generate(request.original_text(), request.category(), request.tone());
            result.platform_content.retain_slots(request.platforms());
            result
        };

        observer(EnhancementPhase::Persisting);
        self.persist(identity, request, &result, &usage).await;
        self.request_cache
            .insert(cache_key, result.clone(), self.clock.now());

        info!(
            identity = identity.key(),
            source = result.source.label(),
            score = result.diagnostics.virality_score,
            variants = result.platform_content.len(),
            "enhancement complete"
        );
        observer(EnhancementPhase::Done);
        Ok(result)
    }

    pub async fn history(&self, identity: &Identity) -> Vec<LocalHistoryRecord> {
        self.history.list(identity.key()).await
    }

    pub async fn clear_history(&self, identity: &Identity) -> Result<(), EnhanceError> {
        self.history
            .clear(identity.key())
            .await
            .map_err(EnhanceError::Storage)
    }

    /// Admins skip the collaborator; an unreachable collaborator yields a
    /// permissive default instead of blocking.
    pub async fn check_entitlement(&self, identity: &Identity) -> UsageState {
        if identity.is_admin {
            return UsageState::admin();
        }
        let key = identity.key();
        if let Some(cached) = self.usage_cache.get(key, self.clock.now()) {
            return cached;
        }
        match self.entitlements.check_usage_limit(key).await {
            Ok(state) => {
                self.usage_cache
                    .insert(key.to_string(), state.clone(), self.clock.now());
                state
            }
            Err(err) => {
                warn!(identity = key, "entitlement check failed, allowing: {}", err);
                UsageState::permissive(self.default_limit, &self.default_plan)
            }
        }
    }

    /// Every requested slot is attempted independently and concurrently;
    /// individual failures are absorbed.
    async fn generate_remote(
        &self,
        generator: &Arc<dyn TextGenerator>,
        request: &EnhancementRequest,
    ) -> Result<PlatformContent, EnhanceError> {
        let prompts = PromptBuilder::build_all(request)?;
        let mut tasks = JoinSet::new();
        for (slot, prompt) in prompts {
            let generator = Arc::clone(generator);
            tasks.spawn(async move {
                let outcome = generator.generate(&prompt, slot.key()).await;
                (slot, outcome)
            });
        }

        let mut content = PlatformContent::new();
        let mut failures: Vec<GenerationError> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, Ok(text))) => {
                    if !content.insert(slot, text) {
                        debug!(platform = slot.key(), "generation returned blank text");
                    }
                }
                Ok((slot, Err(err))) => {
                    debug!(platform = slot.key(), kind = err.kind.code(), "slot generation failed");
                    failures.push(err);
                }
                Err(err) => warn!("generation task aborted: {}", err),
            }
        }

        if !content.has_content() && !failures.is_empty() {
            let kinds: Vec<&str> = failures.iter().map(|err| err.kind.code()).collect();
            warn!(kinds = ?kinds, "all generation attempts failed, using local fallback");
        }
        Ok(content)
    }

    async fn persist(
        &self,
        identity: &Identity,
        request: &EnhancementRequest,
        result: &EnhancementResult,
        usage: &UsageState,
    ) {
        let key = identity.key();
        let record = LocalHistoryRecord::from_result(request, result);
        if let Err(err) = self.history.append(key, record).await {
            warn!(identity = key, "failed to persist history: {}", err);
        }

        if identity.is_admin || usage.is_admin {
            return;
        }
        if matches!(result.source, ContentSource::Remote) {
            if let Err(err) = self.entitlements.increment_usage(key).await {
                warn!(identity = key, "usage increment failed: {}", err);
            }
        }
        self.usage_cache.update(key, UsageState::record_use);
    }
}

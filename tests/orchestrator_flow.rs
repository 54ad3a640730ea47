use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use post_enhancer::cache::{ManualClock, RequestCache};
use post_enhancer::entitlement::EntitlementService;
use post_enhancer::error::ValidationError;
use post_enhancer::generation::{GenerationError, GenerationErrorKind, TextGenerator};
use post_enhancer::history::{FileStore, HistoryStore, KeyValueStore, LocalHistoryRecord, MemoryStore};
use post_enhancer::{
    Category, ContentSource, EnhanceError, EnhancementOrchestrator, EnhancementPhase, EnhancementRequest,
    FallbackGenerator, Identity, PlatformContent, PlatformSlot, Tone, UsageState,
};

const NO_SLOTS: [PlatformSlot; 0] = [];

/// Answers every slot the same way, optionally failing a chosen label.
struct ScriptedGenerator {
    reply: Result<String, GenerationErrorKind>,
    fail_label: Option<&'static str>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            fail_label: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(kind: GenerationErrorKind) -> Self {
        Self {
            reply: Err(kind),
            fail_label: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _instruction: &str, platform_label: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_label == Some(platform_label) {
            return Err(GenerationError::new(GenerationErrorKind::Server, "scripted outage"));
        }
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(kind) => Err(GenerationError::new(*kind, "scripted failure")),
        }
    }
}

struct CountingEntitlements {
    state: Mutex<Result<UsageState, String>>,
    checks: AtomicUsize,
    increments: AtomicUsize,
}

impl CountingEntitlements {
    fn with_state(state: UsageState) -> Self {
        Self {
            state: Mutex::new(Ok(state)),
            checks: AtomicUsize::new(0),
            increments: AtomicUsize::new(0),
        }
    }

    fn unreachable() -> Self {
        Self {
            state: Mutex::new(Err("connection refused".to_string())),
            checks: AtomicUsize::new(0),
            increments: AtomicUsize::new(0),
        }
    }

    fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    fn increments(&self) -> usize {
        self.increments.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntitlementService for CountingEntitlements {
    async fn check_usage_limit(&self, _user_id: &str) -> Result<UsageState, String> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.state.lock().unwrap().clone()
    }

    async fn increment_usage(&self, _user_id: &str) -> Result<(), String> {
        self.increments.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn free_plan(current: u32, limit: i64) -> UsageState {
    UsageState {
        current_usage: current,
        monthly_limit: limit,
        plan_name: "free".to_string(),
        can_use: i64::from(current) < limit,
        is_admin: false,
    }
}

fn orchestrator(entitlements: Arc<CountingEntitlements>) -> EnhancementOrchestrator {
    let history = HistoryStore::new(Arc::new(MemoryStore::new()), 50);
    EnhancementOrchestrator::new(entitlements, history).with_fallback(FallbackGenerator::seeded(1))
}

fn request(text: &str) -> EnhancementRequest {
    EnhancementRequest::new(text, Category::Business, Tone::Professional, NO_SLOTS).expect("request")
}

fn record(id: usize) -> LocalHistoryRecord {
    let mut content = PlatformContent::new();
    content.insert(PlatformSlot::Primary, format!("variant {}", id));
    LocalHistoryRecord {
        id: format!("record-{}", id),
        original_text: format!("post {}", id),
        platform_content: content,
        category: Category::General,
        tone: Tone::Conversational,
        virality_score: Some(60),
        insights: Vec::new(),
        view_reasons: Vec::new(),
        quick_wins: Vec::new(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn exhausted_quota_never_reaches_generation() {
    let entitlements = Arc::new(CountingEntitlements::with_state(free_plan(10, 10)));
    let generator = Arc::new(ScriptedGenerator::replying("unused"));
    let orchestrator = orchestrator(entitlements.clone()).with_generator(generator.clone());

    let err = orchestrator
        .enhance(&Identity::user("u1"), &request("We shipped a new feature."))
        .await
        .expect_err("limit reached");

    match err {
        EnhanceError::UsageLimitReached { current, limit, plan } => {
            assert_eq!(current, 10);
            assert_eq!(limit, 10);
            assert_eq!(plan, "free");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(generator.calls(), 0);
    assert!(orchestrator.history(&Identity::user("u1")).await.is_empty());
}

#[tokio::test]
async fn total_generation_failure_degrades_to_fallback() {
    let entitlements = Arc::new(CountingEntitlements::with_state(free_plan(0, 10)));
    let generator = Arc::new(ScriptedGenerator::failing(GenerationErrorKind::Server));
    let orchestrator = orchestrator(entitlements.clone()).with_generator(generator.clone());

    let result = orchestrator
        .enhance(&Identity::user("u1"), &request("We shipped a new feature."))
        .await
        .expect("fallback result");

    assert_eq!(result.source, ContentSource::Fallback);
    assert!(result.platform_content.has_content());
    assert_eq!(generator.calls(), 4);
    assert_eq!(entitlements.increments(), 0);
    assert_eq!(orchestrator.history(&Identity::user("u1")).await.len(), 1);
}

#[tokio::test]
async fn no_generation_failure_kind_reaches_the_caller() {
    let kinds = [
        GenerationErrorKind::BadRequest,
        GenerationErrorKind::Auth,
        GenerationErrorKind::AccessDenied,
        GenerationErrorKind::RateLimited,
        GenerationErrorKind::Server,
        GenerationErrorKind::Timeout,
        GenerationErrorKind::Network,
        GenerationErrorKind::NoContent,
        GenerationErrorKind::Unknown,
    ];
    for kind in kinds {
        let entitlements = Arc::new(CountingEntitlements::with_state(free_plan(0, 10)));
        let orchestrator =
            orchestrator(entitlements).with_generator(Arc::new(ScriptedGenerator::failing(kind)));

        let result = orchestrator
            .enhance(&Identity::user("u1"), &request("We shipped a new feature."))
            .await
            .unwrap_or_else(|err| panic!("{:?} surfaced as {}", kind, err.code()));
        assert_eq!(result.source, ContentSource::Fallback);
    }
}

#[test]
fn caller_visible_errors_have_stable_codes() {
    assert_eq!(EnhanceError::from(ValidationError::EmptyText).code(), "validation_error");
    let limit = EnhanceError::UsageLimitReached {
        current: 10,
        limit: 10,
        plan: "free".to_string(),
    };
    assert_eq!(limit.code(), "usage_limit_reached");
    assert_eq!(EnhanceError::Storage("disk full".to_string()).code(), "storage_error");
}

#[tokio::test]
async fn fallback_keeps_only_requested_slots() {
    let entitlements = Arc::new(CountingEntitlements::with_state(free_plan(0, 10)));
    let orchestrator = orchestrator(entitlements);
    let request = EnhancementRequest::new(
        "We shipped a new feature.",
        Category::Technology,
        Tone::Conversational,
        [PlatformSlot::Secondary],
    )
    .expect("request");

    let result = orchestrator.enhance(&Identity::guest(), &request).await.expect("result");

    assert_eq!(result.platform_content.len(), 1);
    assert!(result.platform_content.get(PlatformSlot::Secondary).is_some());
}

#[tokio::test]
async fn remote_success_is_scored_and_counted() {
    let entitlements = Arc::new(CountingEntitlements::with_state(free_plan(3, 10)));
    let generator = Arc::new(ScriptedGenerator::replying(
        "Here's what changed \u{2192} faster onboarding!\n\nWhat would you try? #growth #startups #saas",
    ));
    let orchestrator = orchestrator(entitlements.clone()).with_generator(generator.clone());
    let request = EnhancementRequest::new(
        "We shipped a new feature.",
        Category::Business,
        Tone::Professional,
        [PlatformSlot::Primary, PlatformSlot::Secondary],
    )
    .expect("request");

    let result = orchestrator.enhance(&Identity::user("u1"), &request).await.expect("result");

    assert_eq!(result.source, ContentSource::Remote);
    assert_eq!(result.platform_content.len(), 2);
    assert_eq!(generator.calls(), 2);
    assert_eq!(entitlements.increments(), 1);
    assert!(!result.diagnostics.highlights.is_empty());

    let history = orchestrator.history(&Identity::user("u1")).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].original_text, "We shipped a new feature.");
}

#[tokio::test]
async fn one_failed_slot_does_not_sink_the_others() {
    let entitlements = Arc::new(CountingEntitlements::with_state(free_plan(0, 10)));
    let generator = Arc::new(ScriptedGenerator {
        reply: Ok("Generated variant with a question for you?".to_string()),
        fail_label: Some("secondary"),
        calls: AtomicUsize::new(0),
    });
    let orchestrator = orchestrator(entitlements).with_generator(generator.clone());

    let result = orchestrator
        .enhance(&Identity::user("u1"), &request("We shipped a new feature."))
        .await
        .expect("result");

    assert_eq!(result.source, ContentSource::Remote);
    assert_eq!(result.platform_content.len(), 3);
    assert!(result.platform_content.get(PlatformSlot::Secondary).is_none());
}

#[tokio::test]
async fn admins_skip_entitlement_entirely() {
    let entitlements = Arc::new(CountingEntitlements::with_state(free_plan(10, 10)));
    let generator = Arc::new(ScriptedGenerator::replying("Admin copy, what do you think?"));
    let orchestrator = orchestrator(entitlements.clone()).with_generator(generator);

    let result = orchestrator
        .enhance(&Identity::admin("root"), &request("We shipped a new feature."))
        .await
        .expect("result");

    assert_eq!(result.source, ContentSource::Remote);
    assert_eq!(entitlements.checks(), 0);
    assert_eq!(entitlements.increments(), 0);
}

#[tokio::test]
async fn usage_reads_are_cached_for_a_minute() {
    let entitlements = Arc::new(CountingEntitlements::with_state(free_plan(0, 100)));
    let clock = Arc::new(ManualClock::new());
    let orchestrator = orchestrator(entitlements.clone()).with_clock(clock.clone());
    let identity = Identity::user("u1");

    orchestrator.enhance(&identity, &request("First post about hiring.")).await.expect("first");
    orchestrator.enhance(&identity, &request("Second post about pricing.")).await.expect("second");
    assert_eq!(entitlements.checks(), 1);

    clock.advance(Duration::from_secs(61));
    orchestrator.enhance(&identity, &request("Third post about churn.")).await.expect("third");
    assert_eq!(entitlements.checks(), 2);
}

#[tokio::test]
async fn local_usage_counter_blocks_after_fallback_uses() {
    let entitlements = Arc::new(CountingEntitlements::with_state(free_plan(1, 2)));
    let orchestrator = orchestrator(entitlements.clone());
    let identity = Identity::user("u1");

    let result = orchestrator
        .enhance(&identity, &request("First post about hiring."))
        .await
        .expect("first");
    assert_eq!(result.source, ContentSource::Fallback);
    assert_eq!(entitlements.increments(), 0);

    let err = orchestrator
        .enhance(&identity, &request("Second post about pricing."))
        .await
        .expect_err("limit");
    assert!(matches!(err, EnhanceError::UsageLimitReached { current: 2, limit: 2, .. }));
    assert_eq!(entitlements.checks(), 1);
}

#[tokio::test]
async fn unreachable_entitlements_allow_the_request() {
    let entitlements = Arc::new(CountingEntitlements::unreachable());
    let orchestrator = orchestrator(entitlements.clone());
    let identity = Identity::user("u1");

    orchestrator.enhance(&identity, &request("First post about hiring.")).await.expect("first");
    orchestrator.enhance(&identity, &request("Second post about pricing.")).await.expect("second");

    assert_eq!(entitlements.checks(), 2);
    let state = orchestrator.check_entitlement(&identity).await;
    assert!(state.can_use);
    assert_eq!(state.plan_name, "free");
}

#[tokio::test]
async fn identical_requests_are_served_from_cache() {
    let entitlements = Arc::new(CountingEntitlements::with_state(free_plan(0, 10)));
    let generator = Arc::new(ScriptedGenerator::replying("Cached copy, tell me what you think."));
    let orchestrator = orchestrator(entitlements.clone()).with_generator(generator.clone());
    let identity = Identity::user("u1");

    let first = orchestrator
        .enhance(&identity, &request("We shipped a new feature."))
        .await
        .expect("first");

    let phases = Mutex::new(Vec::new());
    let observer = |phase: EnhancementPhase| phases.lock().unwrap().push(phase);
    let second = orchestrator
        .enhance_observed(&identity, &request("  we SHIPPED a new   feature. "), &observer)
        .await
        .expect("second");

    assert_eq!(first, second);
    assert_eq!(generator.calls(), 4);
    assert_eq!(entitlements.increments(), 1);
    assert_eq!(orchestrator.history(&identity).await.len(), 1);
    assert_eq!(
        *phases.lock().unwrap(),
        vec![
            EnhancementPhase::CheckingEntitlement,
            EnhancementPhase::CacheHit,
            EnhancementPhase::Done
        ]
    );
}

#[tokio::test]
async fn cached_results_are_not_shared_across_identities() {
    let entitlements = Arc::new(CountingEntitlements::with_state(free_plan(0, 10)));
    let generator = Arc::new(ScriptedGenerator::replying("Shared post, what would you add?"));
    let orchestrator = orchestrator(entitlements.clone()).with_generator(generator.clone());
    let alice = Identity::user("alice");
    let bob = Identity::user("bob");

    orchestrator
        .enhance(&alice, &request("We shipped a new feature."))
        .await
        .expect("alice");
    orchestrator
        .enhance(&bob, &request("We shipped a new feature."))
        .await
        .expect("bob");

    assert_eq!(orchestrator.history(&alice).await.len(), 1);
    assert_eq!(orchestrator.history(&bob).await.len(), 1);
    assert_eq!(generator.calls(), 8);
    assert_eq!(entitlements.increments(), 2);
}

#[tokio::test]
async fn request_cache_entries_expire() {
    let entitlements = Arc::new(CountingEntitlements::with_state(free_plan(0, 100)));
    let generator = Arc::new(ScriptedGenerator::replying("Fresh copy, what do you think?"));
    let clock = Arc::new(ManualClock::new());
    let orchestrator = orchestrator(entitlements)
        .with_generator(generator.clone())
        .with_clock(clock.clone())
        .with_request_cache(RequestCache::new(Duration::from_secs(30), 8));
    let identity = Identity::user("u1");

    orchestrator.enhance(&identity, &request("Same post.")).await.expect("first");
    clock.advance(Duration::from_secs(31));
    orchestrator.enhance(&identity, &request("Same post.")).await.expect("second");

    assert_eq!(generator.calls(), 8);
}

#[tokio::test]
async fn phases_follow_the_remote_and_degraded_paths() {
    let entitlements = Arc::new(CountingEntitlements::with_state(free_plan(0, 100)));
    let remote = orchestrator(entitlements.clone())
        .with_generator(Arc::new(ScriptedGenerator::replying("Remote copy, what do you think?")));
    let degraded = orchestrator(entitlements)
        .with_generator(Arc::new(ScriptedGenerator::failing(GenerationErrorKind::Timeout)));

    let remote_phases = Mutex::new(Vec::new());
    let observer = |phase: EnhancementPhase| remote_phases.lock().unwrap().push(phase);
    remote
        .enhance_observed(&Identity::user("u1"), &request("Remote path."), &observer)
        .await
        .expect("remote");

    let degraded_phases = Mutex::new(Vec::new());
    let observer = |phase: EnhancementPhase| degraded_phases.lock().unwrap().push(phase);
    degraded
        .enhance_observed(&Identity::user("u1"), &request("Degraded path."), &observer)
        .await
        .expect("degraded");

    assert_eq!(
        *remote_phases.lock().unwrap(),
        vec![
            EnhancementPhase::CheckingEntitlement,
            EnhancementPhase::Generating,
            EnhancementPhase::Scoring,
            EnhancementPhase::Persisting,
            EnhancementPhase::Done
        ]
    );
    assert_eq!(
        *degraded_phases.lock().unwrap(),
        vec![
            EnhancementPhase::CheckingEntitlement,
            EnhancementPhase::Generating,
            EnhancementPhase::FallbackGenerating,
            EnhancementPhase::Persisting,
            EnhancementPhase::Done
        ]
    );
}

#[tokio::test]
async fn history_is_capped_newest_first() {
    let history = HistoryStore::new(Arc::new(MemoryStore::new()), 50);
    for id in 0..51 {
        history.append("u1", record(id)).await.expect("append");
    }

    let records = history.list("u1").await;
    assert_eq!(records.len(), 50);
    assert_eq!(records[0].id, "record-50");
    assert_eq!(records[49].id, "record-1");
    assert!(records.iter().all(|record| record.id != "record-0"));
}

#[tokio::test]
async fn corrupt_history_reads_as_empty() {
    let store = Arc::new(MemoryStore::new());
    store
        .set(&HistoryStore::storage_key("guest"), "{not json".to_string())
        .await
        .expect("seed");
    let history = HistoryStore::new(store, 50);

    assert!(history.list("guest").await.is_empty());
    history.append("guest", record(1)).await.expect("append");
    assert_eq!(history.list("guest").await.len(), 1);
}

#[tokio::test]
async fn histories_are_scoped_per_identity() {
    let history = HistoryStore::new(Arc::new(MemoryStore::new()), 50);
    history.append("u1", record(1)).await.expect("append");
    history.append("guest", record(2)).await.expect("append");

    assert_eq!(history.list("u1").await.len(), 1);
    assert_eq!(history.list("u1").await[0].id, "record-1");
    assert_eq!(history.list("u2").await.len(), 0);
}

#[tokio::test]
async fn file_store_persists_across_instances() {
    let dir = tempfile::tempdir().expect("tempdir");

    let history = HistoryStore::new(Arc::new(FileStore::new(dir.path())), 50);
    history.append("user@example.com", record(7)).await.expect("append");

    let reopened = HistoryStore::new(Arc::new(FileStore::new(dir.path())), 50);
    let records = reopened.list("user@example.com").await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0], record_with_time(7, records[0].created_at));

    reopened.clear("user@example.com").await.expect("clear");
    assert!(history.list("user@example.com").await.is_empty());
}

fn record_with_time(id: usize, created_at: chrono::DateTime<Utc>) -> LocalHistoryRecord {
    LocalHistoryRecord {
        created_at,
        ..record(id)
    }
}

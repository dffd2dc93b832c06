use crate::sink::EventSink;
use crate::{builder, emitter, evaluator};
use reqtrail_core::config::RequestLogsConfig;
use reqtrail_core::context::{RequestContext, RequestPayload, ResponsePayload};
use reqtrail_core::entry::LogEntry;
use reqtrail_core::policy::{Policy, PolicyUpdate, PropertiesHook, SkipPredicate};
use reqtrail_store::{EntryStore, PolicyStore};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{trace, warn};

/// Request logger: decides, records, and forwards.
///
/// Safe to share across every worker. The only shared state is the live
/// policy (swapped atomically) and the rolling buffer.
pub struct RequestLogger {
    policy: PolicyStore,
    store: EntryStore,
}

impl RequestLogger {
    pub fn new(policy: Policy, capacity: usize) -> Self {
        Self {
            policy: PolicyStore::new(policy),
            store: EntryStore::new(capacity),
        }
    }

    pub fn from_config(cfg: &RequestLogsConfig) -> Self {
        Self::new(Policy::from_config(cfg), cfg.capacity)
    }

    /// Called once per completed request.
    ///
    /// The sink is passed in by the host; `None` skips emission but the entry
    /// is still recorded. Sink failures are logged and dropped.
    pub fn on_request_completed(
        &self,
        ctx: &RequestContext,
        payload: Option<&RequestPayload>,
        response: Option<&ResponsePayload>,
        elapsed: Duration,
        sink: Option<&dyn EventSink>,
    ) {
        let policy = self.policy.snapshot();

        if !evaluator::should_log(Some(ctx), payload, &policy) {
            trace!(id = ctx.correlation_id, path = %ctx.path, "Request not logged");
            return;
        }

        if let Some(sink) = sink {
            let event = emitter::emit(ctx, payload, response, elapsed, &policy);
            if let Err(e) = sink.write(event) {
                warn!(id = ctx.correlation_id, error = %e, "Dropped request log event");
            }
        }

        self.store
            .insert(builder::build(ctx, payload, response, elapsed, &policy));
    }

    /// Most recent entries first, by identifier descending, after skipping
    /// `skip` of them. `take = None` returns the rest.
    pub fn get_recent(&self, skip: usize, take: Option<usize>) -> Vec<Arc<LogEntry>> {
        let mut entries = self.store.snapshot(None);
        entries.sort_by(|a, b| b.id.cmp(&a.id));
        entries
            .into_iter()
            .skip(skip)
            .take(take.unwrap_or(usize::MAX))
            .collect()
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    /// Snapshot of the live policy.
    pub fn policy(&self) -> Arc<Policy> {
        self.policy.snapshot()
    }

    // ── Administrative setters ────────────────────────────────────
    // Each takes effect for later decisions only.

    pub fn replace_policy(&self, policy: Policy) {
        self.policy.replace(policy);
    }

    pub fn apply(&self, update: PolicyUpdate) {
        self.policy.update(|p| p.apply(update.clone()));
    }

    pub fn set_session_tracking(&self, enabled: bool) {
        self.policy.update(|p| p.enable_session_tracking = enabled);
    }

    pub fn set_request_body_tracking(&self, enabled: bool) {
        self.policy.update(|p| p.enable_request_body_tracking = enabled);
    }

    pub fn set_response_tracking(&self, enabled: bool) {
        self.policy.update(|p| p.enable_response_tracking = enabled);
    }

    pub fn set_error_tracking(&self, enabled: bool) {
        self.policy.update(|p| p.enable_error_tracking = enabled);
    }

    pub fn set_limit_to_service_requests(&self, enabled: bool) {
        self.policy.update(|p| p.limit_to_service_requests = enabled);
    }

    pub fn set_required_roles<I, S>(&self, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles: BTreeSet<String> = roles.into_iter().map(Into::into).collect();
        self.policy.update(|p| p.required_roles = roles.clone());
    }

    pub fn set_excluded_kinds<I, S>(&self, kinds: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let kinds: BTreeSet<String> = kinds.into_iter().map(Into::into).collect();
        self.policy.update(|p| p.excluded_kinds = kinds.clone());
    }

    pub fn set_hide_body_kinds<I, S>(&self, kinds: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let kinds: BTreeSet<String> = kinds.into_iter().map(Into::into).collect();
        self.policy.update(|p| p.hide_body_kinds = kinds.clone());
    }

    pub fn set_skip_predicate(&self, skip: Option<SkipPredicate>) {
        self.policy.update(|p| p.skip = skip.clone());
    }

    /// The hook runs inline on every logged request; keep it fast and free of
    /// side effects.
    pub fn set_properties_hook(&self, hook: Option<PropertiesHook>) {
        self.policy.update(|p| p.properties_hook = hook.clone());
    }
}

impl Default for RequestLogger {
    fn default() -> Self {
        Self::from_config(&RequestLogsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{MemorySink, SinkError};
    use reqtrail_core::event::StructuredEvent;

    struct FailingSink;

    impl EventSink for FailingSink {
        fn write(&self, _event: StructuredEvent) -> Result<(), SinkError> {
            Err(SinkError::Write("backend down".into()))
        }
    }

    fn ctx(id: u64) -> RequestContext {
        RequestContext::new(id, "GET", format!("http://localhost/items/{id}"))
    }

    fn log(logger: &RequestLogger, id: u64, sink: Option<&dyn EventSink>) {
        logger.on_request_completed(&ctx(id), None, None, Duration::from_millis(1), sink);
    }

    fn ids(entries: &[Arc<LogEntry>]) -> Vec<u64> {
        entries.iter().map(|e| e.id).collect()
    }

    #[test]
    fn logged_request_reaches_store_and_sink() {
        let logger = RequestLogger::default();
        let sink = MemorySink::new();
        log(&logger, 1, Some(&sink));

        assert_eq!(sink.len(), 1);
        assert_eq!(ids(&logger.get_recent(0, None)), vec![1]);
    }

    #[test]
    fn missing_sink_still_records_entry() {
        let logger = RequestLogger::default();
        log(&logger, 1, None);
        assert_eq!(logger.store().len(), 1);
    }

    #[test]
    fn failing_sink_does_not_block_store() {
        let logger = RequestLogger::default();
        log(&logger, 1, Some(&FailingSink));
        assert_eq!(logger.store().len(), 1);
    }

    #[test]
    fn skipped_request_has_no_side_effects() {
        let logger = RequestLogger::default();
        logger.set_required_roles(["admin"]);
        let sink = MemorySink::new();
        log(&logger, 1, Some(&sink));

        assert!(sink.is_empty());
        assert!(logger.store().is_empty());
    }

    #[test]
    fn get_recent_is_newest_first_with_skip_and_take() {
        let logger = RequestLogger::default();
        for id in 1..=5 {
            log(&logger, id, None);
        }
        assert_eq!(ids(&logger.get_recent(0, None)), vec![5, 4, 3, 2, 1]);
        assert_eq!(ids(&logger.get_recent(1, Some(2))), vec![4, 3]);
        assert!(logger.get_recent(10, None).is_empty());
    }

    #[test]
    fn get_recent_orders_by_identifier() {
        let logger = RequestLogger::default();
        for id in [3, 1, 2] {
            log(&logger, id, None);
        }
        assert_eq!(ids(&logger.get_recent(0, None)), vec![3, 2, 1]);
    }

    #[test]
    fn capacity_comes_from_config() {
        let cfg = RequestLogsConfig {
            capacity: 2,
            ..Default::default()
        };
        let logger = RequestLogger::from_config(&cfg);
        for id in 1..=3 {
            log(&logger, id, None);
        }
        assert_eq!(ids(&logger.get_recent(0, None)), vec![3, 2]);
    }

    #[test]
    fn setters_affect_later_decisions_only() {
        let logger = RequestLogger::default();
        log(&logger, 1, None);

        logger.set_request_body_tracking(true);
        logger.set_response_tracking(true);
        log(&logger, 2, None);

        let recent = logger.get_recent(0, None);
        assert!(recent[0].form_data.is_some());
        assert!(recent[1].form_data.is_none());
    }

    #[test]
    fn skip_predicate_and_hook_can_be_set_and_cleared() {
        let logger = RequestLogger::default();
        logger.set_skip_predicate(Some(Arc::new(|c: &RequestContext| c.correlation_id % 2 == 0)));
        for id in 1..=4 {
            log(&logger, id, None);
        }
        assert_eq!(ids(&logger.get_recent(0, None)), vec![3, 1]);

        logger.set_skip_predicate(None);
        logger.set_properties_hook(Some(Arc::new(
            |_: &RequestContext, _: Option<&RequestPayload>, _: Option<&ResponsePayload>| Vec::new(),
        )));
        let view = logger.policy().view();
        assert!(!view.has_skip_predicate);
        assert!(view.has_properties_hook);
    }

    #[test]
    fn apply_updates_toggles() {
        let logger = RequestLogger::default();
        logger.apply(PolicyUpdate {
            enable_error_tracking: Some(true),
            excluded_kinds: Some(["Ping".to_string()].into_iter().collect()),
            ..Default::default()
        });
        let p = logger.policy();
        assert!(p.enable_error_tracking);
        assert!(p.excludes("Ping"));
    }
}

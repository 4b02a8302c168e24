//! Trace collector (spec §4.12): a per-operation structured event log.
//! Collection is opt-in — a disabled trace records nothing and costs
//! one branch per call site.

/// One recorded step of a traced operation.
#[derive(Debug, Clone)]
pub enum TraceEvent {
    SearchStarted { query: String },
    CandidatesFound { count: usize, source: String },
    ScoredCandidate { id: String, components: Vec<(&'static str, f32)>, total: f32 },
    FilteredOut { id: String, reason: String },
    ResultsReturned { ids: Vec<String> },
}

/// Either collecting events or a zero-cost no-op, chosen by the caller
/// per spec §4.12 ("non-traced callers pay zero cost").
pub struct Trace {
    events: Option<Vec<TraceEvent>>,
}

impl Trace {
    /// Events are appended to an in-memory log.
    pub fn enabled() -> Self {
        Self { events: Some(Vec::new()) }
    }

    /// Every recording call is a no-op.
    pub fn disabled() -> Self {
        Self { events: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.events.is_some()
    }

    pub fn events(&self) -> &[TraceEvent] {
        self.events.as_deref().unwrap_or(&[])
    }

    pub fn search_started(&mut self, query: &str) {
        if let Some(events) = &mut self.events {
            events.push(TraceEvent::SearchStarted { query: query.to_string() });
        }
    }

    pub fn candidates_found(&mut self, count: usize, source: &str) {
        if let Some(events) = &mut self.events {
            events.push(TraceEvent::CandidatesFound { count, source: source.to_string() });
        }
    }

    pub fn scored_candidate(&mut self, id: &str, total: f32) {
        if let Some(events) = &mut self.events {
            events.push(TraceEvent::ScoredCandidate { id: id.to_string(), components: Vec::new(), total });
        }
    }

    pub fn filtered_out(&mut self, id: &str, reason: &str) {
        if let Some(events) = &mut self.events {
            events.push(TraceEvent::FilteredOut { id: id.to_string(), reason: reason.to_string() });
        }
    }

    pub fn results_returned(&mut self, ids: impl Iterator<Item = String>) {
        if let Some(events) = &mut self.events {
            events.push(TraceEvent::ResultsReturned { ids: ids.collect() });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_trace_records_nothing() {
        let mut trace = Trace::disabled();
        trace.search_started("q");
        assert!(trace.events().is_empty());
    }

    #[test]
    fn enabled_trace_records_events_in_order() {
        let mut trace = Trace::enabled();
        trace.search_started("q");
        trace.candidates_found(3, "domain_listing");
        assert_eq!(trace.events().len(), 2);
        assert!(matches!(trace.events()[0], TraceEvent::SearchStarted { .. }));
    }
}

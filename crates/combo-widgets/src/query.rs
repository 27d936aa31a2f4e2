#![forbid(unsafe_code)]

//! Debounced query controller.
//!
//! Owns "what the user is typing" and turns it into a working set plus a
//! filtered view:
//!
//! - **Static source**: every query change re-ranks the list synchronously.
//! - **Async source**: a query change arms a debounce timer. When the timer
//!   fires, [`QueryController::poll_fetch_at`] hands out a [`FetchTicket`]
//!   the host drives to completion and passes back to
//!   [`QueryController::complete`].
//!
//! # Invariants
//!
//! - **Last request wins**: a result is applied only if its sequence number
//!   equals the latest issued one at the time it arrives. Older results,
//!   successful or failed, are dropped. Two results resolving in the same
//!   tick are ordered by the order they are handed to `complete`, and only
//!   the latest-issued one can apply.
//! - **Failure keeps data**: a failed fetch keeps the previous working set
//!   and only raises `has_error`.
//! - **Debounce resets**: a new query before the timer fires restarts it.
//!
//! There is no cancellation: superseded futures may still run to
//! completion if the host keeps polling them.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use crate::fuzzy;
use crate::option::{OptionValue, SelectOption};
use crate::source::{LoadFuture, OptionSource, SourceError};

/// Default debounce applied to async lookups.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Loading/error flags reported alongside the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryStatus {
    /// An async lookup for the current query is pending or in flight.
    pub is_loading: bool,
    /// The most recent applicable lookup failed.
    pub has_error: bool,
}

/// An issued async lookup, tagged with its sequence number.
pub struct FetchTicket<V> {
    /// Sequence number of this request.
    pub seq: u64,
    /// Query the lookup was issued for.
    pub query: String,
    future: LoadFuture<V>,
}

impl<V> FetchTicket<V> {
    /// Drive the lookup to completion, keeping the sequence tag.
    pub fn resolve(self) -> impl Future<Output = FetchResult<V>> {
        let seq = self.seq;
        let future = self.future;
        async move {
            FetchResult {
                seq,
                result: future.await,
            }
        }
    }
}

impl<V> fmt::Debug for FetchTicket<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchTicket")
            .field("seq", &self.seq)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

/// A finished lookup, ready to hand back to the controller.
#[derive(Debug)]
pub struct FetchResult<V> {
    /// Sequence number of the request that produced this result.
    pub seq: u64,
    /// Options on success.
    pub result: Result<Vec<SelectOption<V>>, SourceError>,
}

/// What happened to a completed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The result replaced the working set.
    Applied,
    /// The lookup failed; previous working set kept, `has_error` raised.
    Failed,
    /// A newer request exists; the result was dropped.
    Stale,
}

#[derive(Debug, Clone)]
struct PendingFetch {
    deadline: Instant,
}

/// Query state machine over a single [`OptionSource`].
pub struct QueryController<V> {
    source: OptionSource<V>,
    /// Options from the last applied async lookup.
    loaded: Vec<SelectOption<V>>,
    /// Indices into the working set, best first.
    filtered: Vec<usize>,
    query: String,
    status: QueryStatus,
    /// Latest sequence number handed out (or invalidated).
    seq: u64,
    /// A request with `seq` is outstanding.
    in_flight: bool,
    pending: Option<PendingFetch>,
    debounce: Duration,
}

impl<V: OptionValue> QueryController<V> {
    /// Create a controller over `source` with the default debounce.
    pub fn new(source: OptionSource<V>) -> Self {
        let mut controller = Self {
            source,
            loaded: Vec::new(),
            filtered: Vec::new(),
            query: String::new(),
            status: QueryStatus::default(),
            seq: 0,
            in_flight: false,
            pending: None,
            debounce: DEFAULT_DEBOUNCE,
        };
        controller.refilter();
        controller
    }

    /// Set the debounce used for async lookups (builder).
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Current query text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Loading/error flags.
    pub fn status(&self) -> QueryStatus {
        self.status
    }

    /// Whether the source is an async lookup.
    pub fn is_async(&self) -> bool {
        self.source.is_async()
    }

    /// The option sequence currently eligible for display.
    pub fn working_set(&self) -> &[SelectOption<V>] {
        match &self.source {
            OptionSource::Static(options) => options,
            OptionSource::Async(_) => &self.loaded,
        }
    }

    /// Indices into [`working_set`](Self::working_set), best match first.
    pub fn filtered(&self) -> &[usize] {
        &self.filtered
    }

    /// Iterate the filtered options in display order.
    pub fn filtered_options(&self) -> impl Iterator<Item = &SelectOption<V>> + '_ {
        let working = self.working_set();
        self.filtered.iter().map(move |&i| &working[i])
    }

    /// Latest issued sequence number.
    pub fn latest_seq(&self) -> u64 {
        self.seq
    }

    /// Whether an async lookup is waiting for its debounce timer.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Replace the source.
    ///
    /// Outstanding lookups become stale. An async source schedules a lookup
    /// for the current query without debounce.
    pub fn set_source_at(&mut self, source: OptionSource<V>, now: Instant) {
        self.source = source;
        self.loaded.clear();
        self.invalidate_in_flight();
        self.status = QueryStatus::default();
        if self.source.is_async() {
            self.schedule(now);
        } else {
            self.pending = None;
        }
        self.refilter();
    }

    /// Update the query text.
    ///
    /// Returns `true` if the query changed.
    pub fn set_query_at(&mut self, query: &str, now: Instant) -> bool {
        if query == self.query {
            return false;
        }
        self.query.clear();
        self.query.push_str(query);

        if self.source.is_async() {
            self.schedule(now + self.debounce);
        } else {
            self.refilter();
        }
        true
    }

    /// Clear the query without scheduling a lookup (e.g. on close).
    ///
    /// Pending and in-flight lookups become stale; an async working set is
    /// kept as is.
    pub fn reset_query(&mut self) {
        if self.query.is_empty() {
            return;
        }
        self.query.clear();
        if self.source.is_async() {
            self.pending = None;
            self.invalidate_in_flight();
            self.status.is_loading = false;
        }
        self.refilter();
    }

    /// Request a lookup for the current query right away (e.g. on open).
    ///
    /// No-op for static sources.
    pub fn refresh_at(&mut self, now: Instant) {
        if self.source.is_async() {
            self.schedule(now);
        }
    }

    /// Time left before the pending lookup is issued.
    pub fn time_until_fetch(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|p| p.deadline.saturating_duration_since(now))
    }

    /// Issue the pending lookup if its debounce timer has fired.
    pub fn poll_fetch_at(&mut self, now: Instant) -> Option<FetchTicket<V>> {
        let deadline = self.pending.as_ref()?.deadline;
        if now < deadline {
            return None;
        }
        self.pending = None;
        let OptionSource::Async(loader) = &self.source else {
            return None;
        };

        self.seq = self.seq.wrapping_add(1);
        self.in_flight = true;
        self.status.is_loading = true;
        tracing::debug!(seq = self.seq, query = %self.query, "option fetch issued");

        Some(FetchTicket {
            seq: self.seq,
            query: self.query.clone(),
            future: loader(self.query.as_str()),
        })
    }

    /// Hand back a finished lookup.
    pub fn complete(&mut self, fetch: FetchResult<V>) -> FetchOutcome {
        if !self.in_flight || fetch.seq != self.seq {
            tracing::trace!(
                seq = fetch.seq,
                latest = self.seq,
                "stale option fetch dropped"
            );
            return FetchOutcome::Stale;
        }
        self.in_flight = false;
        self.status.is_loading = self.pending.is_some();

        match fetch.result {
            Ok(options) => {
                tracing::debug!(seq = fetch.seq, count = options.len(), "option fetch applied");
                self.loaded = options;
                self.status.has_error = false;
                self.refilter();
                FetchOutcome::Applied
            }
            Err(err) => {
                tracing::warn!(seq = fetch.seq, error = %err, "option fetch failed");
                self.status.has_error = true;
                FetchOutcome::Failed
            }
        }
    }

    fn schedule(&mut self, deadline: Instant) {
        // A newer query supersedes whatever is in flight.
        self.invalidate_in_flight();
        self.pending = Some(PendingFetch { deadline });
        self.status.is_loading = true;
    }

    fn invalidate_in_flight(&mut self) {
        if self.in_flight {
            self.seq = self.seq.wrapping_add(1);
            self.in_flight = false;
        }
    }

    fn refilter(&mut self) {
        match &self.source {
            // The lookup already filtered for the query.
            OptionSource::Async(_) => {
                self.filtered = (0..self.loaded.len()).collect();
            }
            OptionSource::Static(options) => {
                let _span = tracing::debug_span!(
                    "combo_filter",
                    options = options.len(),
                    query_len = self.query.len()
                )
                .entered();
                self.filtered =
                    fuzzy::rank_iter(options.iter().map(|o| o.display_label()), &self.query);
            }
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for QueryController<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryController")
            .field("source", &self.source)
            .field("query", &self.query)
            .field("status", &self.status)
            .field("seq", &self.seq)
            .field("filtered", &self.filtered.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn opts(labels: &[&str]) -> Vec<SelectOption<String>> {
        labels
            .iter()
            .map(|l| SelectOption::labeled(*l, l.to_lowercase()))
            .collect()
    }

    fn labels(c: &QueryController<String>) -> Vec<String> {
        c.filtered_options()
            .map(|o| o.display_label().into_owned())
            .collect()
    }

    type Senders = Rc<RefCell<Vec<(String, oneshot::Sender<Vec<SelectOption<String>>>)>>>;

    /// Async source whose lookups resolve when the test says so.
    fn controlled_source() -> (OptionSource<String>, Senders) {
        let senders: Senders = Rc::new(RefCell::new(Vec::new()));
        let captured = Rc::clone(&senders);
        let source = OptionSource::from_fn(move |query: String| {
            let (tx, rx) = oneshot::channel();
            captured.borrow_mut().push((query, tx));
            async move { rx.await.map_err(SourceError::from) }
        });
        (source, senders)
    }

    #[test]
    fn static_source_filters_synchronously() {
        let mut c = QueryController::new(opts(&["Apple", "Carrot", "Banana"]).into());
        let now = Instant::now();
        assert_eq!(labels(&c), vec!["Apple", "Carrot", "Banana"]);

        assert!(c.set_query_at("an", now));
        assert_eq!(labels(&c), vec!["Banana"]);
        assert_eq!(c.status(), QueryStatus::default());
        assert!(c.poll_fetch_at(now).is_none());
    }

    #[test]
    fn unchanged_query_is_noop() {
        let mut c = QueryController::new(opts(&["A"]).into());
        let now = Instant::now();
        assert!(!c.set_query_at("", now));
        assert!(c.set_query_at("a", now));
        assert!(!c.set_query_at("a", now));
    }

    #[test]
    fn debounce_delays_and_resets() {
        let (source, senders) = controlled_source();
        let mut c = QueryController::new(source).with_debounce(Duration::from_millis(100));
        let t0 = Instant::now();

        c.set_query_at("a", t0);
        assert!(c.status().is_loading);
        assert!(c.poll_fetch_at(t0 + Duration::from_millis(50)).is_none());

        // Typing again restarts the timer.
        c.set_query_at("ab", t0 + Duration::from_millis(60));
        assert!(c.poll_fetch_at(t0 + Duration::from_millis(120)).is_none());
        assert_eq!(
            c.time_until_fetch(t0 + Duration::from_millis(120)),
            Some(Duration::from_millis(40))
        );

        let ticket = c.poll_fetch_at(t0 + Duration::from_millis(160)).expect("fires");
        assert_eq!(ticket.query, "ab");
        assert_eq!(senders.borrow().len(), 1);
        assert!(!c.has_pending());
    }

    #[test]
    fn last_request_wins_over_late_completion() {
        let (source, senders) = controlled_source();
        let mut c = QueryController::new(source).with_debounce(Duration::ZERO);
        let now = Instant::now();

        c.set_query_at("slow", now);
        let slow = c.poll_fetch_at(now).expect("slow issued");
        c.set_query_at("fast", now);
        let fast = c.poll_fetch_at(now).expect("fast issued");
        assert!(fast.seq > slow.seq);

        let mut senders = senders.borrow_mut().drain(..).collect::<Vec<_>>();
        let (_, fast_tx) = senders.pop().expect("fast sender");
        let (_, slow_tx) = senders.pop().expect("slow sender");

        fast_tx.send(opts(&["Fast result"])).expect("send");
        let fast_done = block_on(fast.resolve());
        assert_eq!(c.complete(fast_done), FetchOutcome::Applied);

        slow_tx.send(opts(&["Slow result"])).expect("send");
        let slow_done = block_on(slow.resolve());
        assert_eq!(c.complete(slow_done), FetchOutcome::Stale);

        assert_eq!(labels(&c), vec!["Fast result"]);
        assert!(!c.status().is_loading);
    }

    #[test]
    fn older_result_arriving_first_is_still_dropped() {
        let (source, senders) = controlled_source();
        let mut c = QueryController::new(source).with_debounce(Duration::ZERO);
        let now = Instant::now();

        c.set_query_at("one", now);
        let first = c.poll_fetch_at(now).expect("issued");
        c.set_query_at("two", now);
        let second = c.poll_fetch_at(now).expect("issued");

        let mut senders = senders.borrow_mut().drain(..).collect::<Vec<_>>();
        let (_, second_tx) = senders.pop().expect("sender");
        let (_, first_tx) = senders.pop().expect("sender");

        first_tx.send(opts(&["One"])).expect("send");
        assert_eq!(c.complete(block_on(first.resolve())), FetchOutcome::Stale);
        assert!(c.status().is_loading);
        assert!(c.working_set().is_empty());

        second_tx.send(opts(&["Two"])).expect("send");
        assert_eq!(c.complete(block_on(second.resolve())), FetchOutcome::Applied);
        assert_eq!(labels(&c), vec!["Two"]);
    }

    #[test]
    fn failure_keeps_previous_working_set() {
        let (source, senders) = controlled_source();
        let mut c = QueryController::new(source).with_debounce(Duration::ZERO);
        let now = Instant::now();

        c.refresh_at(now);
        let ok = c.poll_fetch_at(now).expect("issued");
        let (_, tx) = senders.borrow_mut().pop().expect("sender");
        tx.send(opts(&["Kept"])).expect("send");
        assert_eq!(c.complete(block_on(ok.resolve())), FetchOutcome::Applied);

        c.set_query_at("x", now);
        let failing = c.poll_fetch_at(now).expect("issued");
        let (_, tx) = senders.borrow_mut().pop().expect("sender");
        drop(tx);
        assert_eq!(c.complete(block_on(failing.resolve())), FetchOutcome::Failed);

        let status = c.status();
        assert!(status.has_error);
        assert!(!status.is_loading);
        assert_eq!(labels(&c), vec!["Kept"]);
    }

    #[test]
    fn success_clears_error() {
        let source = OptionSource::from_fn(|query: String| async move {
            if query == "bad" {
                Err(SourceError::msg("boom"))
            } else {
                Ok(vec![SelectOption::labeled("ok", "ok".to_string())])
            }
        });
        let mut c = QueryController::new(source).with_debounce(Duration::ZERO);
        let now = Instant::now();

        c.set_query_at("bad", now);
        let t = c.poll_fetch_at(now).expect("issued");
        assert_eq!(c.complete(block_on(t.resolve())), FetchOutcome::Failed);
        assert!(c.status().has_error);

        c.set_query_at("good", now);
        let t = c.poll_fetch_at(now).expect("issued");
        assert_eq!(c.complete(block_on(t.resolve())), FetchOutcome::Applied);
        assert!(!c.status().has_error);
    }

    #[test]
    fn async_result_is_not_refiltered() {
        let source = OptionSource::from_fn(|_query: String| async move {
            Ok(vec![
                SelectOption::labeled("Zulu", "z".to_string()),
                SelectOption::labeled("Alpha", "a".to_string()),
            ])
        });
        let mut c = QueryController::new(source).with_debounce(Duration::ZERO);
        let now = Instant::now();
        c.set_query_at("nothing matches this", now);
        let t = c.poll_fetch_at(now).expect("issued");
        c.complete(block_on(t.resolve()));
        assert_eq!(labels(&c), vec!["Zulu", "Alpha"]);
    }

    #[test]
    fn source_change_invalidates_in_flight() {
        let (source, senders) = controlled_source();
        let mut c = QueryController::new(source).with_debounce(Duration::ZERO);
        let now = Instant::now();
        c.refresh_at(now);
        let ticket = c.poll_fetch_at(now).expect("issued");

        c.set_source_at(opts(&["Static"]).into(), now);
        assert!(!c.is_async());
        assert!(!c.status().is_loading);

        let (_, tx) = senders.borrow_mut().pop().expect("sender");
        tx.send(opts(&["Late"])).expect("send");
        assert_eq!(c.complete(block_on(ticket.resolve())), FetchOutcome::Stale);
        assert_eq!(labels(&c), vec!["Static"]);
    }

    #[test]
    fn reset_query_drops_pending_lookup() {
        let (source, senders) = controlled_source();
        let mut c = QueryController::new(source).with_debounce(Duration::from_millis(50));
        let now = Instant::now();
        c.set_query_at("abc", now);
        assert!(c.has_pending());

        c.reset_query();
        assert_eq!(c.query(), "");
        assert!(!c.has_pending());
        assert!(!c.status().is_loading);
        assert!(c.poll_fetch_at(now + Duration::from_secs(1)).is_none());
        assert!(senders.borrow().is_empty());
    }

    #[test]
    fn completion_without_request_is_stale() {
        let mut c = QueryController::new(opts(&["A"]).into());
        let outcome = c.complete(FetchResult {
            seq: 0,
            result: Ok(Vec::new()),
        });
        assert_eq!(outcome, FetchOutcome::Stale);
    }

    #[test]
    fn one_million_options_narrow_to_one() {
        let options: Vec<SelectOption<String>> = (0..1_000_000)
            .map(|i| SelectOption::labeled(format!("Option {i}"), i.to_string()))
            .collect();
        let mut c = QueryController::new(options.into());
        c.set_query_at("Option 999999", Instant::now());
        let found: Vec<_> = c.filtered_options().collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].display_label(), "Option 999999");
        assert_eq!(found[0].value, "999999");
    }
}

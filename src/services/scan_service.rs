//! Scan service for ranking threads that need a reply.
//!
//! Drives the analysis pipeline across many threads:
//! - Lists recent inbox threads from a [`MailSource`]
//! - Fetches and analyzes each thread
//! - Drops threads below a minimum score
//! - Ranks survivors by score, keeping fetch order among equal scores

use std::pin::pin;
use std::time::Duration;

use chrono::{Days, Local, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use thiserror::Error;

use crate::analysis::{analyze_thread, ScoringRules};
use crate::domain::{ThreadAnalysis, ThreadId};
use crate::providers::email::{MailSource, ProviderError};

/// Threads between progress log lines.
const PROGRESS_EVERY: usize = 10;

/// Errors that abort a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The account address could not be read.
    #[error("failed to read account address: {0}")]
    Account(#[source] ProviderError),

    /// Recent threads could not be listed.
    #[error("failed to list recent threads: {0}")]
    Listing(#[source] ProviderError),

    /// Credentials stopped working mid-scan; every later fetch would fail too.
    #[error("authentication lost while fetching thread {thread_id}: {source}")]
    Authentication {
        /// Thread whose fetch was rejected.
        thread_id: ThreadId,
        /// The provider error.
        #[source]
        source: ProviderError,
    },
}

/// Result type for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Options for scanning a list of thread ids.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Minimum score a thread needs to be kept.
    pub min_score: u8,
    /// Thread fetches kept in flight at once.
    pub concurrency: usize,
    /// Overall time budget; threads not analyzed by then are left out.
    pub timeout: Option<Duration>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            min_score: 20,
            concurrency: 1,
            timeout: None,
        }
    }
}

impl ScanOptions {
    /// Sets the minimum score.
    pub fn min_score(mut self, min_score: u8) -> Self {
        self.min_score = min_score;
        self
    }

    /// Sets the number of concurrent fetches.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the overall time budget.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Parameters for a full mailbox scan.
#[derive(Debug, Clone)]
pub struct ScanParams {
    /// How many days back the thread listing reaches.
    pub days_back: u32,
    /// Maximum number of threads listed.
    pub max_results: u32,
    /// Options applied to the listed threads.
    pub options: ScanOptions,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            days_back: 60,
            max_results: 150,
            options: ScanOptions::default(),
        }
    }
}

impl ScanParams {
    /// First date included in the listing, counted back from `today`.
    pub fn listing_start(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(u64::from(self.days_back)))
            .unwrap_or(NaiveDate::MIN)
    }
}

/// Outcome of a scan.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Qualifying analyses, highest score first.
    pub analyses: Vec<ThreadAnalysis>,
    /// Threads fetched (successfully or not).
    pub scanned: usize,
    /// Threads skipped because they could not be fetched or interpreted.
    pub skipped_errors: usize,
    /// Whether the time budget ran out before every thread was fetched.
    pub timed_out: bool,
}

/// Sorts analyses by score, highest first. Equal scores keep their order.
pub fn rank(analyses: &mut [ThreadAnalysis]) {
    analyses.sort_by(|a, b| b.score.cmp(&a.score));
}

/// Service that scans a mailbox for threads awaiting a reply.
pub struct ScanService<S: MailSource> {
    source: S,
    rules: ScoringRules,
}

impl<S: MailSource> ScanService<S> {
    /// Creates a scan service using the default scoring rules.
    pub fn new(source: S) -> Self {
        Self::with_rules(source, ScoringRules::default())
    }

    /// Creates a scan service with custom scoring rules.
    pub fn with_rules(source: S, rules: ScoringRules) -> Self {
        Self { source, rules }
    }

    /// Returns the underlying mail source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Lists recent inbox threads and scans them.
    pub async fn find_forgotten_replies(&self, params: &ScanParams) -> ScanResult<ScanOutcome> {
        let account_email = self
            .source
            .account_email()
            .await
            .map_err(ScanError::Account)?;
        tracing::info!(account = %account_email, "Scanning inbox");

        let after = params.listing_start(Local::now().date_naive());
        let thread_ids = self
            .source
            .list_recent_thread_ids(after, params.max_results)
            .await
            .map_err(ScanError::Listing)?;
        tracing::info!(count = thread_ids.len(), "Found threads to analyze");

        self.scan(&thread_ids, &account_email, &params.options)
            .await
    }

    /// Fetches and analyzes `thread_ids`, keeping analyses scoring at least
    /// `options.min_score`, ranked by score.
    ///
    /// A thread that cannot be fetched or interpreted is logged and skipped.
    /// An authentication failure aborts the scan.
    pub async fn scan(
        &self,
        thread_ids: &[ThreadId],
        account_email: &str,
        options: &ScanOptions,
    ) -> ScanResult<ScanOutcome> {
        let now = Utc::now();
        let total = thread_ids.len();
        let deadline = options
            .timeout
            .map(|timeout| tokio::time::Instant::now() + timeout);

        // `buffered` yields in input order, so results match a sequential scan.
        let mut fetches = pin!(stream::iter(thread_ids)
            .map(|id| async move { (id, self.source.get_thread(id).await) })
            .buffered(options.concurrency.max(1)));

        let mut outcome = ScanOutcome::default();
        loop {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, fetches.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        tracing::warn!(
                            scanned = outcome.scanned,
                            total,
                            "Scan timed out, returning threads analyzed so far"
                        );
                        outcome.timed_out = true;
                        break;
                    }
                },
                None => fetches.next().await,
            };
            let Some((thread_id, fetched)) = next else {
                break;
            };

            if outcome.scanned % PROGRESS_EVERY == 0 {
                tracing::info!("Analyzing thread {}/{}", outcome.scanned + 1, total);
            }
            outcome.scanned += 1;

            let thread = match fetched {
                Ok(thread) => thread,
                Err(e) if e.is_authentication() => {
                    return Err(ScanError::Authentication {
                        thread_id: thread_id.clone(),
                        source: e,
                    });
                }
                Err(e) => {
                    tracing::warn!(%thread_id, error = %e, "Skipping thread that could not be fetched");
                    outcome.skipped_errors += 1;
                    continue;
                }
            };

            match analyze_thread(thread_id, &thread, account_email, &self.rules, now) {
                Ok(Some(analysis)) if analysis.score >= options.min_score => {
                    tracing::debug!(%thread_id, score = analysis.score, "Thread needs a reply");
                    outcome.analyses.push(analysis);
                }
                Ok(Some(analysis)) => {
                    tracing::trace!(%thread_id, score = analysis.score, "Below minimum score");
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(%thread_id, error = %e, "Skipping thread that could not be analyzed");
                    outcome.skipped_errors += 1;
                }
            }
        }

        rank(&mut outcome.analyses);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BodyPart, Header, MessageId, RawMessage, RawThread};
    use crate::providers::email::MockMailSource;
    use base64::prelude::*;
    use std::collections::HashMap;

    const ACCOUNT: &str = "me@example.com";

    fn thread_from(sender: &str, body: &str) -> RawThread {
        RawThread::new(vec![RawMessage {
            id: MessageId::from("m"),
            headers: vec![Header::new("From", sender)],
            payload: BodyPart::leaf("text/plain", BASE64_URL_SAFE_NO_PAD.encode(body)),
            internal_date_ms: Utc::now().timestamp_millis(),
            labels: vec!["INBOX".to_string()],
            snippet: String::new(),
        }])
    }

    fn ids(raw: &[&str]) -> Vec<ThreadId> {
        raw.iter().map(|id| ThreadId::from(*id)).collect()
    }

    fn mock_with(threads: Vec<(&str, RawThread)>) -> MockMailSource {
        let threads: HashMap<ThreadId, RawThread> = threads
            .into_iter()
            .map(|(id, thread)| (ThreadId::from(id), thread))
            .collect();
        let mut mock = MockMailSource::new();
        mock.expect_get_thread().returning(move |id| {
            threads
                .get(id)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(id.to_string()))
        });
        mock
    }

    fn weighted_rules() -> ScoringRules {
        ScoringRules::new(
            vec![
                ("nineteen".to_string(), 19),
                ("twenty".to_string(), 20),
                ("forty".to_string(), 40),
            ],
            Vec::<String>::new(),
        )
    }

    fn scored_ids(outcome: &ScanOutcome) -> Vec<(&str, u8)> {
        outcome
            .analyses
            .iter()
            .map(|a| (a.thread_id.as_str(), a.score))
            .collect()
    }

    #[tokio::test]
    async fn scan_filters_by_min_score_and_ranks_stably() {
        let mock = mock_with(vec![
            ("a", thread_from("a@co.com", "twenty")),
            ("b", thread_from("b@co.com", "nineteen")),
            ("c", thread_from("c@co.com", "forty")),
            ("d", thread_from("d@co.com", "twenty again")),
            ("e", thread_from("e@co.com", "forty again")),
        ]);
        let service = ScanService::with_rules(mock, weighted_rules());

        let outcome = service
            .scan(&ids(&["a", "b", "c", "d", "e"]), ACCOUNT, &ScanOptions::default())
            .await
            .unwrap();

        assert_eq!(
            scored_ids(&outcome),
            vec![("c", 40), ("e", 40), ("a", 20), ("d", 20)]
        );
        assert_eq!(outcome.scanned, 5);
        assert_eq!(outcome.skipped_errors, 0);
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn scan_skips_owner_and_automated_threads() {
        let mock = mock_with(vec![
            ("own", thread_from("Me <me@example.com>", "forty")),
            ("bot", thread_from("noreply@shop.com", "forty")),
            ("human", thread_from("bob@co.com", "forty")),
        ]);
        let service = ScanService::with_rules(mock, weighted_rules());

        let outcome = service
            .scan(&ids(&["own", "bot", "human"]), ACCOUNT, &ScanOptions::default())
            .await
            .unwrap();

        assert_eq!(scored_ids(&outcome), vec![("human", 40)]);
        assert_eq!(outcome.skipped_errors, 0);
    }

    #[tokio::test]
    async fn scan_logs_and_skips_failed_fetches() {
        let mock = mock_with(vec![("ok", thread_from("bob@co.com", "forty"))]);
        let service = ScanService::with_rules(mock, weighted_rules());

        let outcome = service
            .scan(&ids(&["missing", "ok"]), ACCOUNT, &ScanOptions::default())
            .await
            .unwrap();

        assert_eq!(scored_ids(&outcome), vec![("ok", 40)]);
        assert_eq!(outcome.scanned, 2);
        assert_eq!(outcome.skipped_errors, 1);
    }

    #[tokio::test]
    async fn scan_aborts_on_authentication_failure() {
        let mut mock = MockMailSource::new();
        mock.expect_get_thread()
            .returning(|_| Err(ProviderError::Authentication("revoked".to_string())));
        let service = ScanService::new(mock);

        let err = service
            .scan(&ids(&["a", "b"]), ACCOUNT, &ScanOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::Authentication { ref thread_id, .. } if thread_id.as_str() == "a"));
    }

    #[tokio::test]
    async fn concurrent_scan_matches_sequential_order() {
        let threads = || {
            vec![
                ("a", thread_from("a@co.com", "twenty")),
                ("b", thread_from("b@co.com", "forty")),
                ("c", thread_from("c@co.com", "twenty")),
                ("d", thread_from("d@co.com", "forty")),
            ]
        };
        let order = ids(&["a", "b", "c", "d"]);

        let sequential = ScanService::with_rules(mock_with(threads()), weighted_rules())
            .scan(&order, ACCOUNT, &ScanOptions::default())
            .await
            .unwrap();
        let concurrent = ScanService::with_rules(mock_with(threads()), weighted_rules())
            .scan(&order, ACCOUNT, &ScanOptions::default().concurrency(4))
            .await
            .unwrap();

        assert_eq!(scored_ids(&sequential), scored_ids(&concurrent));
        assert_eq!(
            scored_ids(&concurrent),
            vec![("b", 40), ("d", 40), ("a", 20), ("c", 20)]
        );
    }

    #[tokio::test]
    async fn find_forgotten_replies_lists_then_scans() {
        let mut mock = mock_with(vec![("t1", thread_from("bob@co.com", "forty"))]);
        mock.expect_account_email()
            .times(1)
            .returning(|| Ok(ACCOUNT.to_string()));
        mock.expect_list_recent_thread_ids()
            .withf(|_, limit| *limit == 25)
            .times(1)
            .returning(|_, _| Ok(vec![ThreadId::from("t1")]));
        let service = ScanService::with_rules(mock, weighted_rules());

        let params = ScanParams {
            max_results: 25,
            ..ScanParams::default()
        };
        let outcome = service.find_forgotten_replies(&params).await.unwrap();

        assert_eq!(scored_ids(&outcome), vec![("t1", 40)]);
    }

    #[tokio::test]
    async fn listing_failure_is_reported() {
        let mut mock = MockMailSource::new();
        mock.expect_account_email()
            .returning(|| Ok(ACCOUNT.to_string()));
        mock.expect_list_recent_thread_ids()
            .returning(|_, _| Err(ProviderError::Connection("offline".to_string())));
        let service = ScanService::new(mock);

        let err = service
            .find_forgotten_replies(&ScanParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Listing(ProviderError::Connection(_))));
    }

    #[test]
    fn listing_start_counts_back_days() {
        let params = ScanParams::default();
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            params.listing_start(today),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }

    #[test]
    fn rank_is_stable_for_equal_scores() {
        let mut analyses: Vec<ThreadAnalysis> = [("x", 30), ("y", 50), ("z", 30)]
            .into_iter()
            .map(|(id, score)| ThreadAnalysis {
                thread_id: ThreadId::from(id),
                subject: String::new(),
                sender_name: String::new(),
                sender_email: String::new(),
                last_message: String::new(),
                days_ago: 0,
                message_count: 1,
                is_read: true,
                score,
                reasons: vec![],
            })
            .collect();

        rank(&mut analyses);
        let order: Vec<&str> = analyses.iter().map(|a| a.thread_id.as_str()).collect();
        assert_eq!(order, vec!["y", "x", "z"]);
    }

    #[test]
    fn default_params() {
        let params = ScanParams::default();
        assert_eq!(params.days_back, 60);
        assert_eq!(params.max_results, 150);
        assert_eq!(params.options.min_score, 20);
        assert_eq!(params.options.concurrency, 1);
        assert!(params.options.timeout.is_none());
    }
}

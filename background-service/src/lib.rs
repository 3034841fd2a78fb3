use history_store::HistoryStore;
use llm_interface::LlmProvider;
use reddit_client::FeedSource;
use std::sync::Arc;
use std::time::Duration;
use subwatch_core::{
    ClassificationError, CoreError, ErrorExt, ErrorReporter, KeywordFilter, MonitorConfig, Pacer,
    Post, QueueItem, Verdict,
};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub mod notifier;
pub mod queue;

pub use notifier::{DiscordWebhook, Notifier, WebhookMessage};
pub use queue::{AnalysisQueue, QueueStats};


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub subreddits: Vec<String>,
    pub sleep_time: Duration,
    pub ai_delay: Duration,
}

impl MonitorSettings {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            subreddits: config.subreddits.clone(),
            sleep_time: config.sleep_interval(),
            ai_delay: config.ai_delay(),
        }
    }
}

/// Counters for one pass over the configured subreddits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub posts_fetched: usize,
    pub new_posts: usize,
    pub matched: usize,
    pub history_errors: usize,
    pub failed_subreddits: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyOutcome {
    Notified,
    Suppressed,
    ClassificationFailed,
    NotifyFailed,
}

/// Drives the two cadences of the monitor: an hourly-ish fetch cycle that
/// feeds the analysis queue, and a paced classifier that drains it.
pub struct MonitorService {
    feed: Arc<dyn FeedSource>,
    history: Arc<HistoryStore>,
    queue: Arc<AnalysisQueue>,
    filter: KeywordFilter,
    classifier: Arc<dyn LlmProvider>,
    notifier: Arc<dyn Notifier>,
    settings: MonitorSettings,
    classify_pacer: Pacer,
    reporter: ErrorReporter,
}

impl MonitorService {
    pub fn new(
        settings: MonitorSettings,
        feed: Arc<dyn FeedSource>,
        history: Arc<HistoryStore>,
        filter: KeywordFilter,
        classifier: Arc<dyn LlmProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            classify_pacer: Pacer::new(settings.ai_delay),
            feed,
            history,
            queue: Arc::new(AnalysisQueue::new()),
            filter,
            classifier,
            notifier,
            settings,
            reporter: ErrorReporter::new(),
        }
    }

    pub fn queue(&self) -> &Arc<AnalysisQueue> {
        &self.queue
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub async fn run_fetch_cycle(&self) -> CycleReport {
        info!(
            "Starting scan of {} subreddits",
            self.settings.subreddits.len()
        );
        let mut report = CycleReport::default();

        for subreddit in &self.settings.subreddits {
            let posts = match self.feed.fetch(subreddit).await {
                Ok(posts) => posts,
                Err(e) => {
                    self.reporter.report_error(&CoreError::from(e));
                    report.failed_subreddits.push(subreddit.clone());
                    continue;
                }
            };

            report.posts_fetched += posts.len();
            for post in posts {
                self.process_post(post, &mut report).await;
            }
        }

        info!(
            "Scan complete: {} fetched, {} new, {} queued for analysis, {} subreddits failed",
            report.posts_fetched,
            report.new_posts,
            report.matched,
            report.failed_subreddits.len()
        );
        let backlog = self.queue.stats().await;
        if backlog.pending > 0 {
            info!(
                "Analysis backlog: {} pending, oldest waiting {:?} ({} analyzed so far)",
                backlog.pending,
                backlog.oldest_wait,
                backlog.total_dequeued
            );
        }
        report
    }

    async fn process_post(&self, post: Post, report: &mut CycleReport) {
        match self.history.record(&post.id).await {
            Ok(false) => return,
            Ok(true) => {}
            Err(e) => {
                // Still new in memory, so keep going with it.
                report.history_errors += 1;
                self.reporter.report_error(&CoreError::from(e));
            }
        }
        report.new_posts += 1;

        let Some(keyword) = self.filter.find_match(&post) else {
            debug!("No keyword in '{}'", post.title);
            return;
        };

        info!(
            "Keyword '{}' matched in r/{}: {}",
            keyword, post.subreddit, post.title
        );
        let item = QueueItem::new(post, keyword);
        self.queue.enqueue(item).await;
        report.matched += 1;
    }

    /// Classifies the next queued item, if any, respecting `ai_delay`.
    pub async fn classify_next(&self) -> Option<ClassifyOutcome> {
        let item = self.queue.try_dequeue().await?;
        Some(self.classify_item(item).await)
    }

    async fn classify_item(&self, item: QueueItem) -> ClassifyOutcome {
        let permit = self.classify_pacer.acquire().await;
        if !permit.waited.is_zero() {
            debug!("Cooled down {:?} before next analysis", permit.waited);
        }

        info!(
            "Analyzing '{}' (keyword: {})",
            item.post.title, item.keyword
        );

        let verdict = match self.classifier.classify(&item.post).await {
            Ok(verdict) => verdict,
            Err(e) => {
                if let Some(delay) = e.retry_after() {
                    warn!(
                        "{} asked to back off; next analysis in at least {:?}",
                        self.classifier.name(),
                        delay
                    );
                    self.classify_pacer.defer(delay).await;
                }
                let error = CoreError::from(e);
                if matches!(
                    error,
                    CoreError::Classification(ClassificationError::ContentFiltered { .. })
                ) {
                    self.reporter.report_warning(&error);
                } else {
                    self.reporter.report_error(&error);
                }
                return ClassifyOutcome::ClassificationFailed;
            }
        };

        if verdict == Verdict::NotRelevant {
            info!("Ignoring '{}': classified as not relevant", item.post.title);
            return ClassifyOutcome::Suppressed;
        }

        match self.notifier.notify(&item.post, &item.keyword).await {
            Ok(()) => ClassifyOutcome::Notified,
            Err(e) => {
                self.reporter.report_error(&CoreError::from(e));
                ClassifyOutcome::NotifyFailed
            }
        }
    }

    /// One fetch cycle, then drain the queue.
    pub async fn run_once(&self) -> (CycleReport, Vec<ClassifyOutcome>) {
        let report = self.run_fetch_cycle().await;
        let mut outcomes = Vec::with_capacity(report.matched);
        while let Some(outcome) = self.classify_next().await {
            outcomes.push(outcome);
        }
        (report, outcomes)
    }

    /// Runs both loops until `token` is cancelled.
    pub async fn run(&self, token: CancellationToken) {
        info!(
            "Monitor started: scan every {:?}, analysis delay {:?}",
            self.settings.sleep_time, self.settings.ai_delay
        );
        tokio::join!(self.fetch_loop(&token), self.classify_loop(&token));
        info!("Monitor stopped");
    }

    async fn fetch_loop(&self, token: &CancellationToken) {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = self.run_fetch_cycle() => {}
            }

            debug!("Next scan in {:?}", self.settings.sleep_time);
            tokio::select! {
                _ = token.cancelled() => break,
                _ = sleep(self.settings.sleep_time) => {}
            }
        }
        debug!("Fetch loop exited");
    }

    async fn classify_loop(&self, token: &CancellationToken) {
        loop {
            let item = tokio::select! {
                _ = token.cancelled() => break,
                item = self.queue.dequeue() => item,
            };

            tokio::select! {
                _ = token.cancelled() => break,
                _ = self.classify_item(item) => {}
            }
        }
        debug!("Classify loop exited");
    }
}

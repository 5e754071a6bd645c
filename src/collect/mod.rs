// src/collect/mod.rs
//
// Fan-out/fan-in collection orchestrator: drives every configured source
// client concurrently for one fetch window and joins the outcomes into a
// single immutable `CollectedData`. Per-source failures never cross the
// join point; only a malformed window fails the call itself.

pub mod clients;
pub mod config;
pub mod status;
pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;

use crate::collect::types::{
    CollectedData, CollectionResult, FetchWindow, InvalidWindow, SourceClient, SourceError,
    SourceName,
};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("collect_runs_total", "Collection runs started.");
        describe_counter!("collect_items_total", "Items collected across all sources.");
        describe_counter!("collect_source_errors_total", "Source fetch errors (pre-retry).");
        describe_counter!("collect_retries_total", "Retries after transient errors.");
        describe_histogram!("collect_source_ms", "Per-source fetch time in milliseconds.");
        describe_gauge!("collect_last_run_ts", "Unix ts when a collection run last finished.");
    });
}

/// Tuning knobs for one orchestrator run.
#[derive(Debug, Clone, Copy)]
pub struct CollectorCfg {
    /// Bound on a single fetch attempt; exceeding it counts as a
    /// transient "timeout" failure.
    pub source_timeout: Duration,
    /// Additional attempts after the first, transient errors only.
    pub retry_attempts: u32,
    pub retry_backoff: Duration,
    /// Caller-imposed bound on the whole run. Outstanding sources are
    /// abandoned and marked failed when it expires.
    pub overall_deadline: Option<Duration>,
}

impl Default for CollectorCfg {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_secs(30),
            retry_attempts: 2,
            retry_backoff: Duration::from_millis(500),
            overall_deadline: None,
        }
    }
}

/// Collect from all configured clients in parallel.
///
/// `unconfigured` lists the sources excluded up front for missing
/// credentials, with a human-readable reason; they get a `not_configured`
/// result without any network activity. Every known source ends up with
/// exactly one `CollectionResult`.
///
/// The only error this function itself returns is an invalid window,
/// rejected before any client is invoked.
pub async fn collect_all(
    window: FetchWindow,
    clients: Vec<Arc<dyn SourceClient>>,
    unconfigured: Vec<(SourceName, String)>,
    cfg: &CollectorCfg,
) -> Result<CollectedData, InvalidWindow> {
    window.validate()?;
    ensure_metrics_described();
    counter!("collect_runs_total").increment(1);

    let requested_at = chrono::Utc::now();
    let run_started = Instant::now();

    let mut results: BTreeMap<SourceName, CollectionResult> = BTreeMap::new();
    for (source, reason) in unconfigured {
        tracing::info!(source = %source, reason = %reason, "source not configured, skipping");
        results.insert(
            source,
            CollectionResult::failed(source, &SourceError::NotConfigured(reason), 0, 0),
        );
    }

    tracing::info!(
        start = %window.start,
        end = %window.end,
        sources = clients.len(),
        "starting collection run"
    );

    let expected: Vec<SourceName> = clients.iter().map(|c| c.name()).collect();

    let mut set: JoinSet<CollectionResult> = JoinSet::new();
    for client in clients {
        let w = window;
        let c = *cfg;
        set.spawn(async move { fetch_one(client, w, &c).await });
    }

    // Full join: wait for every source task to settle. With a deadline we
    // stop joining when it expires and abandon whatever is still running.
    let deadline = cfg
        .overall_deadline
        .map(|d| tokio::time::Instant::now() + d);
    let mut deadline_hit = false;
    loop {
        let joined = match deadline {
            Some(at) => match tokio::time::timeout_at(at, set.join_next()).await {
                Ok(j) => j,
                Err(_) => {
                    deadline_hit = true;
                    break;
                }
            },
            None => set.join_next().await,
        };
        match joined {
            Some(Ok(res)) => {
                results.insert(res.source, res);
            }
            Some(Err(join_err)) => {
                // A panicked task loses its identity; the backfill below
                // still gives its source a failed result.
                tracing::error!(error = %join_err, "source task aborted");
            }
            None => break,
        }
    }
    set.abort_all();

    let overall_ms = run_started.elapsed().as_millis() as u64;
    for source in expected {
        if results.contains_key(&source) {
            continue;
        }
        let err = if deadline_hit {
            SourceError::Transient("overall_timeout".into())
        } else {
            SourceError::Transient("task failed".into())
        };
        tracing::warn!(source = %source, error = %err, "source did not settle");
        results.insert(source, CollectionResult::failed(source, &err, 0, overall_ms));
    }

    gauge!("collect_last_run_ts").set(requested_at.timestamp().max(0) as f64);

    let data = CollectedData {
        window,
        requested_at,
        results,
    };
    tracing::info!(
        total_items = status::total_items(&data),
        overall = %status::overall_status(&data),
        elapsed_ms = overall_ms,
        "collection run finished"
    );
    Ok(data)
}

/// Drive one client to a terminal state: success, exhausted retries, or
/// timeout. Errors are converted to a result value here so nothing
/// propagates into the join.
async fn fetch_one(
    client: Arc<dyn SourceClient>,
    window: FetchWindow,
    cfg: &CollectorCfg,
) -> CollectionResult {
    let source = client.name();
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let outcome = match tokio::time::timeout(cfg.source_timeout, client.fetch_items(&window))
            .await
        {
            Ok(res) => res,
            Err(_) => Err(SourceError::Transient("timeout".into())),
        };

        match outcome {
            Ok(items) => {
                let ms = started.elapsed().as_millis() as u64;
                histogram!("collect_source_ms").record(ms as f64);
                counter!("collect_items_total").increment(items.len() as u64);
                tracing::info!(source = %source, items = items.len(), attempts, "source collected");
                return CollectionResult::success(source, items, attempts, ms);
            }
            Err(e) => {
                counter!("collect_source_errors_total").increment(1);
                if e.is_retryable() && attempts <= cfg.retry_attempts {
                    counter!("collect_retries_total").increment(1);
                    tracing::warn!(source = %source, error = %e, attempt = attempts, "transient error, retrying");
                    tokio::time::sleep(cfg.retry_backoff).await;
                    continue;
                }
                let ms = started.elapsed().as_millis() as u64;
                histogram!("collect_source_ms").record(ms as f64);
                tracing::warn!(source = %source, error = %e, attempts, "source failed");
                return CollectionResult::failed(source, &e, attempts, ms);
            }
        }
    }
}

/// Normalize provider text before it enters a `RawItem`: decode HTML
/// entities, strip tags, collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // Length cap: 2000 chars, enough context for a digest line
    if out.chars().count() > 2000 {
        out = out.chars().take(2000).collect();
    }

    out
}

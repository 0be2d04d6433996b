use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// A snapshot of match evaluation profiling metrics.
///
/// Profiling is enabled via the `STRIDE_PROFILE` environment variable and
/// tracks time spent in graph scans and adjacency joins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryProfileSnapshot {
    /// Total nanoseconds spent in graph scans.
    pub scan_ns: u64,
    /// Number of graph scan calls.
    pub scan_count: u64,
    /// Total nanoseconds spent joining adjacent strides.
    pub join_ns: u64,
    /// Number of adjacency joins.
    pub join_count: u64,
    /// Candidate left/right pairs compared by joins.
    pub join_pairs: u64,
}

#[derive(Default)]
struct QueryProfileCounters {
    scan_ns: AtomicU64,
    scan_count: AtomicU64,
    join_ns: AtomicU64,
    join_count: AtomicU64,
    join_pairs: AtomicU64,
}

static PROFILE_ENABLED: OnceLock<bool> = OnceLock::new();
static PROFILE_COUNTERS: OnceLock<QueryProfileCounters> = OnceLock::new();

fn profiling_enabled() -> bool {
    *PROFILE_ENABLED.get_or_init(|| std::env::var_os("STRIDE_PROFILE").is_some())
}

fn counters() -> Option<&'static QueryProfileCounters> {
    profiling_enabled().then(|| PROFILE_COUNTERS.get_or_init(QueryProfileCounters::default))
}

pub(crate) fn profile_timer() -> Option<Instant> {
    profiling_enabled().then(Instant::now)
}

pub(crate) enum QueryProfileKind {
    /// A single graph scan call.
    Scan,
    /// One adjacency join.
    Join,
}

pub(crate) fn record_profile_timer(kind: QueryProfileKind, start: Option<Instant>) {
    let Some(start) = start else {
        return;
    };
    let Some(counters) = counters() else {
        return;
    };
    let nanos = start.elapsed().as_nanos().min(u64::MAX as u128) as u64;
    match kind {
        QueryProfileKind::Scan => {
            counters.scan_ns.fetch_add(nanos, Ordering::Relaxed);
            counters.scan_count.fetch_add(1, Ordering::Relaxed);
        }
        QueryProfileKind::Join => {
            counters.join_ns.fetch_add(nanos, Ordering::Relaxed);
            counters.join_count.fetch_add(1, Ordering::Relaxed);
        }
    }
}

pub(crate) fn record_join_pairs(pairs: u64) {
    if let Some(counters) = counters() {
        counters.join_pairs.fetch_add(pairs, Ordering::Relaxed);
    }
}

/// Retrieves a snapshot of current profiling metrics.
///
/// Returns `None` when `STRIDE_PROFILE` was unset at first use. With `reset`
/// the counters are zeroed as they are read.
///
/// ```no_run
/// use stride::query::profile::profile_snapshot;
///
/// if let Some(snapshot) = profile_snapshot(true) {
///     println!("join pairs examined: {}", snapshot.join_pairs);
/// }
/// ```
pub fn profile_snapshot(reset: bool) -> Option<QueryProfileSnapshot> {
    let counters = counters()?;
    let load = |counter: &AtomicU64| {
        if reset {
            counter.swap(0, Ordering::Relaxed)
        } else {
            counter.load(Ordering::Relaxed)
        }
    };
    Some(QueryProfileSnapshot {
        scan_ns: load(&counters.scan_ns),
        scan_count: load(&counters.scan_count),
        join_ns: load(&counters.join_ns),
        join_count: load(&counters.join_count),
        join_pairs: load(&counters.join_pairs),
    })
}

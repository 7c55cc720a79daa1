//! Safety checks for user-supplied regular expressions.
//!
//! Patterns end up in Postgres `~` predicates, so anything that could
//! backtrack catastrophically or use engine extensions is refused up front.
//! Structural heuristics run everywhere; the compile check is delegated to a
//! [`RegexSafetyProbe`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use regex::{Regex, RegexBuilder};

use crate::error::{Result, SearchError};

pub const MAX_PATTERN_LEN: usize = 100;
pub const MAX_CAPTURE_GROUPS: usize = 10;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_PROBE_WORKERS: usize = 4;

const PROBE_SAMPLE_LEN: usize = 100;
const COMPILED_SIZE_LIMIT: usize = 1 << 20;

/// Compiles a pattern and reports why it is unsafe, if it is.
pub trait RegexSafetyProbe: Send + Sync {
    fn check(&self, pattern: &str) -> std::result::Result<(), String>;
}

/// Compile-only probe. No wall-clock budget.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticProbe;

impl RegexSafetyProbe for StaticProbe {
    fn check(&self, pattern: &str) -> std::result::Result<(), String> {
        compile_and_probe(pattern)
    }
}

/// Compiles and runs a sample match on a worker thread, giving up after
/// `timeout`. If no worker can be spawned the check fails open to
/// [`StaticProbe`].
///
/// A timed-out worker is detached, not killed: it keeps its core until the
/// match finishes. At most `max_workers` workers run at once per probe
/// (clones share the count); a check arriving while all are busy is
/// rejected.
#[derive(Debug, Clone)]
pub struct DeadlineProbe {
    timeout: Duration,
    max_workers: usize,
    in_flight: Arc<AtomicUsize>,
}

impl DeadlineProbe {
    pub fn new(timeout: Duration) -> Self {
        Self::with_max_workers(timeout, DEFAULT_MAX_PROBE_WORKERS)
    }

    pub fn with_max_workers(timeout: Duration, max_workers: usize) -> Self {
        Self {
            timeout,
            max_workers,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Workers currently running, including detached ones.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    fn acquire(&self) -> Option<WorkerSlot> {
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_workers).then_some(n + 1)
            })
            .ok()
            .map(|_| WorkerSlot(Arc::clone(&self.in_flight)))
    }
}

impl Default for DeadlineProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

/// Released when the worker thread exits, however late.
struct WorkerSlot(Arc<AtomicUsize>);

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl RegexSafetyProbe for DeadlineProbe {
    fn check(&self, pattern: &str) -> std::result::Result<(), String> {
        let Some(slot) = self.acquire() else {
            tracing::warn!(max_workers = self.max_workers, "regex probe workers exhausted");
            return Err("too many regex checks in progress, retry later".into());
        };
        let (tx, rx) = crossbeam_channel::bounded(1);
        let owned = pattern.to_string();
        let spawned = std::thread::Builder::new()
            .name("regex-probe".into())
            .spawn(move || {
                let _slot = slot;
                tx.send(compile_and_probe(&owned)).ok();
            });
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "regex probe worker unavailable, skipping deadline");
            return StaticProbe.check(pattern);
        }
        match rx.recv_timeout(self.timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => Err(format!(
                "compilation exceeded {}ms",
                self.timeout.as_millis()
            )),
            Err(RecvTimeoutError::Disconnected) => Err("regex probe worker panicked".into()),
        }
    }
}

/// Probe appropriate for the current target.
pub fn default_probe(timeout: Duration) -> Box<dyn RegexSafetyProbe> {
    if cfg!(target_family = "wasm") {
        Box::new(StaticProbe)
    } else {
        Box::new(DeadlineProbe::new(timeout))
    }
}

fn compile_and_probe(pattern: &str) -> std::result::Result<(), String> {
    let re = RegexBuilder::new(pattern)
        .size_limit(COMPILED_SIZE_LIMIT)
        .build()
        .map_err(|e| format!("does not compile: {e}"))?;
    let groups = re.captures_len() - 1;
    if groups > MAX_CAPTURE_GROUPS {
        return Err(format!(
            "{groups} capture groups, at most {MAX_CAPTURE_GROUPS} allowed"
        ));
    }
    let _ = re.is_match(&"a".repeat(PROBE_SAMPLE_LEN));
    Ok(())
}

struct Heuristic {
    re: Regex,
    reason: &'static str,
}

fn heuristics() -> &'static [Heuristic] {
    static HEURISTICS: OnceLock<Vec<Heuristic>> = OnceLock::new();
    HEURISTICS.get_or_init(|| {
        [
            (r"\(\?<[=!]", "lookbehind is not allowed"),
            (r"\(\?P?<[A-Za-z_]", "named groups are not allowed"),
            (r"\(\?[^:]", "only (?: extensions are allowed"),
            (r"\\[1-9]", "backreferences are not allowed"),
            (r"\(\.[*+]\)[*+{]", "repeated wildcard group"),
            (r"\([^()]*[*+]\)[*+{]", "nested quantifiers"),
            (r"\.\*\.\*", "repeated .*"),
            (r"\([^()]*\|[^()]*\)[*+{]", "repeated alternation"),
        ]
        .into_iter()
        .filter_map(|(src, reason)| Regex::new(src).ok().map(|re| Heuristic { re, reason }))
        .collect()
    })
}

/// Full safety check for one pattern, reporting failures at `path`.
pub fn validate_pattern(pattern: &str, probe: &dyn RegexSafetyProbe, path: &str) -> Result<()> {
    if pattern.is_empty() {
        return Err(SearchError::invalid(path, "regex pattern cannot be empty"));
    }
    if pattern.chars().count() > MAX_PATTERN_LEN {
        return Err(SearchError::invalid(
            path,
            format!("regex pattern longer than {MAX_PATTERN_LEN} characters"),
        ));
    }
    if let Some(h) = heuristics().iter().find(|h| h.re.is_match(pattern)) {
        return Err(SearchError::invalid(
            path,
            format!("unsafe regex pattern: {}", h.reason),
        ));
    }
    probe
        .check(pattern)
        .map_err(|reason| SearchError::invalid(path, format!("unsafe regex pattern: {reason}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(pattern: &str) -> Result<()> {
        validate_pattern(pattern, &StaticProbe, "filters.item.version.regex")
    }

    #[test]
    fn plain_patterns_pass() {
        for p in ["^Insane$", "hard|insane", "[0-9]+ stars", "(?:easy|normal) diff", "a.*b"] {
            assert!(check(p).is_ok(), "{p}");
        }
    }

    #[test]
    fn rejects_empty_and_long() {
        assert!(check("").is_err());
        assert!(check(&"a".repeat(MAX_PATTERN_LEN)).is_ok());
        assert!(check(&"a".repeat(MAX_PATTERN_LEN + 1)).is_err());
    }

    #[test]
    fn rejects_engine_extensions() {
        for p in ["(?<=x)y", "(?<!x)y", "(?P<n>a)", "(?<name>a)", r"(a)\1", "(?=a)", "(?i)abc"] {
            assert!(check(p).is_err(), "{p}");
        }
    }

    #[test]
    fn rejects_catastrophic_shapes() {
        for p in ["(.*)+", "(.+)+", "(.*){2,}", "(a+)+", r"(\w*)*", "x.*.*y"] {
            let err = check(p).unwrap_err();
            assert!(err.to_string().contains("unsafe regex"), "{p}: {err}");
        }
    }

    #[test]
    fn rejects_repeated_alternation() {
        for p in ["(a|aa)+", "(a|a?)+", "(?:x|xy)*", "(ab|a){3,}"] {
            let err = check(p).unwrap_err();
            assert!(err.to_string().contains("repeated alternation"), "{p}: {err}");
        }
        for p in ["(easy|normal) diff", "(a|b)?", "x(a|b)y"] {
            assert!(check(p).is_ok(), "{p}");
        }
    }

    #[test]
    fn rejects_too_many_groups() {
        let eleven = "(a)".repeat(11);
        let err = check(&eleven).unwrap_err();
        assert!(err.to_string().contains("capture groups"));
        assert!(check(&"(a)".repeat(10)).is_ok());
    }

    #[test]
    fn rejects_uncompilable() {
        let err = check("[a-").unwrap_err();
        assert!(err.to_string().contains("does not compile"));
    }

    #[test]
    fn deadline_probe_accepts_and_rejects_like_static() {
        let probe = DeadlineProbe::default();
        assert!(probe.check("^abc$").is_ok());
        assert!(probe.check("(").is_err());
    }

    #[test]
    fn deadline_probe_caps_concurrent_workers() {
        let busy = DeadlineProbe::with_max_workers(DEFAULT_PROBE_TIMEOUT, 0);
        let err = busy.check("^abc$").unwrap_err();
        assert!(err.contains("too many regex checks"), "{err}");

        let probe = DeadlineProbe::with_max_workers(Duration::from_secs(5), 1);
        assert!(probe.check("^abc$").is_ok());
        // the slot is released when the worker exits
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while probe.in_flight() > 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(probe.in_flight(), 0);
        assert!(probe.clone().check("^def$").is_ok());
    }

    #[test]
    fn error_carries_path() {
        let err = check("(.*)+").unwrap_err();
        assert_eq!(err.path(), Some("filters.item.version.regex"));
    }
}

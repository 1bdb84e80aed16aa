//! Scoped measurement sessions over instrumented call frames.
//!
//! A [`Session`] activates a thread-local collector; while it is alive, every
//! [`frame`] guard entered on that thread records call count, own time and
//! cumulative time for its frame name. Dropping the session (on any exit
//! path, including unwinding) deactivates collection, so a failing workload
//! can never leave a profiler window open. Frame guards are inert when no
//! session is active, which keeps the workload functions callable outside a
//! measurement window at negligible cost.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};

thread_local! {
    static COLLECTOR: RefCell<Option<Collector>> = RefCell::new(None);
}

struct ActiveFrame {
    name: &'static str,
    start: Instant,
    child_ns: u64,
}

#[derive(Default)]
struct FrameAccum {
    calls: u64,
    cumulative_ns: u64,
    own_ns: u64,
    // Live activations of this name; cumulative time is only charged when
    // the outermost activation exits, so recursion is not double-counted.
    active_depth: u32,
}

#[derive(Default)]
struct Collector {
    stack: Vec<ActiveFrame>,
    frames: BTreeMap<&'static str, FrameAccum>,
}

impl Collector {
    fn enter(&mut self, name: &'static str) {
        self.frames.entry(name).or_default().active_depth += 1;
        self.stack.push(ActiveFrame {
            name,
            start: Instant::now(),
            child_ns: 0,
        });
    }

    fn exit(&mut self, name: &'static str) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        debug_assert_eq!(frame.name, name);

        let elapsed_ns = frame.start.elapsed().as_nanos() as u64;
        if let Some(parent) = self.stack.last_mut() {
            parent.child_ns = parent.child_ns.saturating_add(elapsed_ns);
        }

        let acc = self.frames.entry(frame.name).or_default();
        acc.calls += 1;
        acc.own_ns = acc
            .own_ns
            .saturating_add(elapsed_ns.saturating_sub(frame.child_ns));
        acc.active_depth = acc.active_depth.saturating_sub(1);
        if acc.active_depth == 0 {
            acc.cumulative_ns = acc.cumulative_ns.saturating_add(elapsed_ns);
        }
    }

    fn into_snapshot(self, wall_ns: u64) -> ProfileSnapshot {
        let frames = self
            .frames
            .into_iter()
            .map(|(name, acc)| {
                (
                    name.to_string(),
                    FrameStats {
                        calls: acc.calls,
                        cumulative_ns: acc.cumulative_ns,
                        own_ns: acc.own_ns,
                    },
                )
            })
            .collect();
        ProfileSnapshot { wall_ns, frames }
    }
}

/// An active measurement window on the current thread.
///
/// Exactly one enable/disable cycle: collection starts at [`Session::start`]
/// and stops when the session is finished or dropped. The session is bound
/// to the thread it was started on.
pub struct Session {
    started: Instant,
    _thread_bound: PhantomData<*const ()>,
}

impl Session {
    /// Activate frame collection on the current thread. Any collector left
    /// over from a previous session on this thread is discarded.
    pub fn start() -> Session {
        COLLECTOR.with(|c| *c.borrow_mut() = Some(Collector::default()));
        Session {
            started: Instant::now(),
            _thread_bound: PhantomData,
        }
    }

    /// Stop collecting and return the aggregated snapshot.
    pub fn finish(self) -> ProfileSnapshot {
        let wall_ns = self.started.elapsed().as_nanos() as u64;
        let collector = COLLECTOR.with(|c| c.borrow_mut().take());
        collector.unwrap_or_default().into_snapshot(wall_ns)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Unwinding path: discard the collector so no window stays open.
        COLLECTOR.with(|c| {
            c.borrow_mut().take();
        });
    }
}

/// RAII guard for one call frame. Records on drop; inert outside a session.
pub struct FrameGuard {
    name: &'static str,
    active: bool,
}

/// Enter a named call frame. Guards must follow scope (LIFO) discipline,
/// which Rust's drop order provides for free.
pub fn frame(name: &'static str) -> FrameGuard {
    let active = COLLECTOR.with(|c| match c.borrow_mut().as_mut() {
        Some(collector) => {
            collector.enter(name);
            true
        }
        None => false,
    });
    FrameGuard { name, active }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        COLLECTOR.with(|c| {
            if let Some(collector) = c.borrow_mut().as_mut() {
                collector.exit(self.name);
            }
        });
    }
}

/// Run `f` under a fresh measurement session and return its result together
/// with the captured snapshot. The result is exactly `f()`; a panic in `f`
/// propagates unchanged with the session torn down by the guard's drop.
pub fn run_with_profiling<T>(f: impl FnOnce() -> T) -> (T, ProfileSnapshot) {
    let session = Session::start();
    let result = f();
    let snapshot = session.finish();
    (result, snapshot)
}

/// Aggregated statistics for one frame name within a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameStats {
    pub calls: u64,
    pub cumulative_ns: u64,
    pub own_ns: u64,
}

/// Immutable result of one measurement window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub wall_ns: u64,
    pub frames: BTreeMap<String, FrameStats>,
}

fn secs(ns: u64) -> f64 {
    ns as f64 / 1e9
}

impl ProfileSnapshot {
    /// Frames ordered by cumulative time descending, name ascending on ties.
    pub fn ranked(&self) -> Vec<(&str, &FrameStats)> {
        let mut ranked: Vec<(&str, &FrameStats)> = self
            .frames
            .iter()
            .map(|(name, stats)| (name.as_str(), stats))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.cumulative_ns
                .cmp(&a.1.cumulative_ns)
                .then_with(|| a.0.cmp(b.0))
        });
        ranked
    }

    /// Render a textual table, optionally limited to the top `limit` frames.
    ///
    /// Numeric columns are fixed-width, so two snapshots with the same call
    /// structure render to the same byte size regardless of measured times.
    pub fn render(&self, limit: Option<usize>) -> String {
        let ranked = self.ranked();
        let shown = limit.unwrap_or(ranked.len()).min(ranked.len());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "profile: {} frames, wall {:>12.6}s",
            self.frames.len(),
            secs(self.wall_ns)
        );
        if shown < ranked.len() {
            let _ = writeln!(out, "(top {} of {})", shown, ranked.len());
        }
        let _ = writeln!(
            out,
            "{:>10}  {:>10}  {:>10}  {:>10}  {:>10}  frame",
            "calls", "own(s)", "own/call", "cum(s)", "cum/call"
        );
        for (name, stats) in ranked.into_iter().take(shown) {
            let calls = stats.calls.max(1) as f64;
            let _ = writeln!(
                out,
                "{:>10}  {:>10.6}  {:>10.6}  {:>10.6}  {:>10.6}  {}",
                stats.calls,
                secs(stats.own_ns),
                secs(stats.own_ns) / calls,
                secs(stats.cumulative_ns),
                secs(stats.cumulative_ns) / calls,
                name
            );
        }
        out
    }

    /// Serialize the snapshot to `path`, overwriting any existing file.
    pub fn dump<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let bytes = bincode::serialize(self).map_err(io::Error::other)?;
        fs::write(path, bytes)
    }

    /// Load a snapshot previously written by [`ProfileSnapshot::dump`].
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<ProfileSnapshot> {
        let bytes = fs::read(path)?;
        bincode::deserialize(&bytes).map_err(io::Error::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workloads::{fibonacci_iterative, fibonacci_recursive, matrix_multiplication};
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn result_is_unchanged_by_profiling() {
        let (result, _snapshot) = run_with_profiling(|| fibonacci_recursive(10));
        assert_eq!(result, 55);
    }

    #[test]
    fn recursive_call_count_is_exact() {
        // fib_recursive(10) makes C(10) = 177 calls: C(n) = C(n-1) + C(n-2) + 1.
        let (_, snapshot) = run_with_profiling(|| fibonacci_recursive(10));
        let stats = &snapshot.frames["fibonacci_recursive"];
        assert_eq!(stats.calls, 177);
        // Only the outermost activation is charged cumulatively.
        assert!(stats.cumulative_ns <= snapshot.wall_ns);
    }

    #[test]
    fn nested_frames_attribute_child_time_to_parent() {
        let (_, snapshot) = run_with_profiling(|| matrix_multiplication(8));
        let mm = &snapshot.frames["matrix_multiplication"];
        let build = &snapshot.frames["build_matrix"];
        assert_eq!(mm.calls, 1);
        assert_eq!(build.calls, 2);
        // Own time excludes the two build_matrix children.
        assert!(mm.own_ns <= mm.cumulative_ns);
        assert!(build.cumulative_ns <= mm.cumulative_ns);
    }

    #[test]
    fn frames_are_inert_without_a_session() {
        // Must not panic or record anything.
        let _ = fibonacci_recursive(5);
        let (_, snapshot) = run_with_profiling(|| fibonacci_iterative(10));
        assert!(!snapshot.frames.contains_key("fibonacci_recursive"));
        assert!(snapshot.frames.contains_key("fibonacci_iterative"));
    }

    #[test]
    fn panicking_workload_tears_down_the_session() {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            run_with_profiling(|| {
                fibonacci_recursive(3);
                panic!("boom");
            })
        }));
        assert!(outcome.is_err());

        // The next session starts clean: nothing from the failed run leaks.
        let (result, snapshot) = run_with_profiling(|| fibonacci_iterative(12));
        assert_eq!(result, 144);
        assert!(!snapshot.frames.contains_key("fibonacci_recursive"));
    }

    #[test]
    fn render_byte_size_is_deterministic_for_same_call_structure() {
        let (_, first) = run_with_profiling(|| fibonacci_recursive(12));
        let (_, second) = run_with_profiling(|| fibonacci_recursive(12));
        assert_eq!(first.render(None).len(), second.render(None).len());
    }

    #[test]
    fn render_limit_truncates_to_top_frames() {
        let (_, snapshot) = run_with_profiling(|| matrix_multiplication(4));
        assert_eq!(snapshot.frames.len(), 2);
        let limited = snapshot.render(Some(1));
        assert!(limited.contains("(top 1 of 2)"));
        assert!(!limited.contains("build_matrix"));
    }
}

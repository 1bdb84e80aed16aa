//! Profile artifact export for external analysis tools.
//!
//! Runs a batch of workloads under one continuous measurement window and
//! writes three files at fixed paths in the working directory:
//!
//! - `profile_output.prof` — bincode dump of the [`ProfileSnapshot`],
//!   re-loadable via [`ProfileSnapshot::load`]
//! - `profile_output.txt` — the full snapshot rendered as text, sorted by
//!   cumulative time descending
//! - `callgrind_script.sh` — a static helper script that drives a reduced
//!   workload subset under `valgrind --tool=callgrind`
//!
//! Files are overwritten wholesale on every export. A failure partway
//! through leaves the files written by earlier steps in place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::profiler::{ProfileSnapshot, Session};
use crate::workloads::Workload;

/// Binary snapshot dump, relative to the working directory.
pub const PROFILE_DUMP_FILE: &str = "profile_output.prof";

/// Text rendering of the full snapshot.
pub const PROFILE_TEXT_FILE: &str = "profile_output.txt";

/// Helper script for callgrind runs. Its content is a fixed template and
/// does not depend on the profiling run that wrote it.
pub const CALLGRIND_SCRIPT_FILE: &str = "callgrind_script.sh";

const CALLGRIND_SCRIPT: &str = "\
#!/bin/sh
# Drives a reduced workload subset under callgrind.
# Usage: ./callgrind_script.sh [path-to-profbench]
# View results with: kcachegrind callgrind.out.*
BIN=\"${1:-target/release/profbench}\"
printf '1\\n3\\n4\\nq\\n' | valgrind --tool=callgrind \"$BIN\" --scale quick
";

/// Paths written by an export, plus the snapshot that was persisted.
#[derive(Debug)]
pub struct ExportedArtifacts {
    pub dump: PathBuf,
    pub text: PathBuf,
    pub script: PathBuf,
    pub snapshot: ProfileSnapshot,
}

/// The fixed batch profiled by the "generate profile data" menu entry.
///
/// Sized so the batch finishes in a few seconds while still giving every
/// workload a visible share of the report. The iterative Fibonacci index is
/// pinned at 90, the largest comfortable value for `u64`.
pub fn default_batch() -> Vec<Workload> {
    vec![
        Workload::FibonacciRecursive { n: 25 },
        Workload::FibonacciIterative { n: 90 },
        Workload::MatrixMultiplication { size: 50 },
        Workload::PrimeFactorization { n: 987_654_321 },
        Workload::StringProcessing { iterations: 5_000 },
    ]
}

/// Export profile artifacts to the working directory.
pub fn export_profile(batch: &[Workload]) -> io::Result<ExportedArtifacts> {
    export_profile_to(Path::new("."), batch)
}

/// Export profile artifacts into `dir`. The batch runs in order under a
/// single session window spanning all calls.
pub fn export_profile_to(dir: &Path, batch: &[Workload]) -> io::Result<ExportedArtifacts> {
    let session = Session::start();
    for workload in batch {
        workload.execute();
    }
    let snapshot = session.finish();

    let dump = dir.join(PROFILE_DUMP_FILE);
    snapshot.dump(&dump)?;

    let text = dir.join(PROFILE_TEXT_FILE);
    fs::write(&text, snapshot.render(None))?;

    let script = dir.join(CALLGRIND_SCRIPT_FILE);
    fs::write(&script, CALLGRIND_SCRIPT)?;
    make_executable(&script)?;

    Ok(ExportedArtifacts {
        dump,
        text,
        script,
        snapshot,
    })
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn small_batch() -> Vec<Workload> {
        vec![
            Workload::FibonacciRecursive { n: 10 },
            Workload::StringProcessing { iterations: 100 },
        ]
    }

    #[test]
    fn export_writes_all_three_artifacts() {
        let dir = tempdir().unwrap();
        let artifacts = export_profile_to(dir.path(), &small_batch()).unwrap();

        assert!(artifacts.dump.is_file());
        assert!(artifacts.text.is_file());
        assert!(artifacts.script.is_file());

        let text = fs::read_to_string(&artifacts.text).unwrap();
        assert!(text.contains("fibonacci_recursive"));
        assert!(text.contains("string_processing"));
    }

    #[test]
    fn binary_dump_reloads_to_the_same_snapshot() {
        let dir = tempdir().unwrap();
        let artifacts = export_profile_to(dir.path(), &small_batch()).unwrap();

        let reloaded = ProfileSnapshot::load(&artifacts.dump).unwrap();
        assert_eq!(reloaded.wall_ns, artifacts.snapshot.wall_ns);
        assert_eq!(reloaded.frames, artifacts.snapshot.frames);
        assert_eq!(reloaded.frames["fibonacci_recursive"].calls, 177);
    }

    #[test]
    fn second_export_overwrites_instead_of_appending() {
        let dir = tempdir().unwrap();
        let first = export_profile_to(dir.path(), &small_batch()).unwrap();
        let first_text_len = fs::metadata(&first.text).unwrap().len();
        let first_dump_len = fs::metadata(&first.dump).unwrap().len();

        let second = export_profile_to(dir.path(), &small_batch()).unwrap();
        let second_text_len = fs::metadata(&second.text).unwrap().len();
        let second_dump_len = fs::metadata(&second.dump).unwrap().len();

        // Same call structure: the text report is byte-for-byte the same
        // size, and the dump holds exactly one snapshot.
        assert_eq!(first_text_len, second_text_len);
        assert_eq!(first_dump_len, second_dump_len);
    }

    #[test]
    fn script_is_the_fixed_template() {
        let dir = tempdir().unwrap();
        let artifacts = export_profile_to(dir.path(), &small_batch()).unwrap();
        let script = fs::read_to_string(&artifacts.script).unwrap();
        assert!(script.starts_with("#!/bin/sh"));
        assert!(script.contains("valgrind --tool=callgrind"));
        assert_eq!(script, CALLGRIND_SCRIPT);
    }

    #[test]
    fn batch_runs_under_one_window() {
        let dir = tempdir().unwrap();
        let artifacts = export_profile_to(dir.path(), &default_batch()).unwrap();
        let frames = &artifacts.snapshot.frames;
        for name in [
            "fibonacci_recursive",
            "fibonacci_iterative",
            "matrix_multiplication",
            "prime_factorization",
            "string_processing",
        ] {
            assert!(frames.contains_key(name), "missing frame {name}");
            assert!(frames[name].cumulative_ns <= artifacts.snapshot.wall_ns);
        }
    }
}

use clap::Parser;
use profbench::export;
use profbench::harness::{speedup_ratio, time_repeated, Scale};
use profbench::profiler::run_with_profiling;
use profbench::workloads::{fibonacci_iterative, fibonacci_recursive, matrix_multiplication, Workload};
use std::io::{self, BufRead, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};

#[derive(Parser, Debug)]
#[command(name = "profbench")]
#[command(about = "Interactive profiling demo (menu-driven workload harness)")]
struct Args {
    /// Workload parameter scale for the interactive menu.
    #[arg(long, value_enum, default_value_t = Scale::Full)]
    scale: Scale,
}

/// One menu selection, matched exhaustively in the dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MenuChoice {
    FibonacciRecursive,
    FibonacciIterative,
    MatrixMultiplication,
    PrimeFactorization,
    StringProcessing,
    RunAll,
    ExportArtifacts,
    Comparison,
    Quit,
}

impl MenuChoice {
    fn parse(input: &str) -> Option<MenuChoice> {
        match input.trim() {
            "1" => Some(MenuChoice::FibonacciRecursive),
            "2" => Some(MenuChoice::FibonacciIterative),
            "3" => Some(MenuChoice::MatrixMultiplication),
            "4" => Some(MenuChoice::PrimeFactorization),
            "5" => Some(MenuChoice::StringProcessing),
            "6" => Some(MenuChoice::RunAll),
            "7" => Some(MenuChoice::ExportArtifacts),
            "8" => Some(MenuChoice::Comparison),
            "q" | "Q" => Some(MenuChoice::Quit),
            _ => None,
        }
    }
}

fn print_menu(out: &mut impl Write, scale: Scale) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "=== Profiling Demo (scale: {}) ===", scale.as_str())?;
    writeln!(out, "  1  Fibonacci (recursive)   O(2^n), good profiler fodder")?;
    writeln!(out, "  2  Fibonacci (iterative)   O(n)")?;
    writeln!(out, "  3  Matrix multiplication   O(n^3) schoolbook")?;
    writeln!(out, "  4  Prime factorization     trial division")?;
    writeln!(out, "  5  String processing       naive concatenation")?;
    writeln!(out, "  6  Run all workloads       each under its own profile")?;
    writeln!(out, "  7  Generate profile data   write dump/report/script files")?;
    writeln!(out, "  8  Timing comparison       recursive vs iterative")?;
    writeln!(out, "  q  Quit")?;
    Ok(())
}

fn run_one(out: &mut impl Write, workload: Workload) -> io::Result<()> {
    writeln!(out, "\nRunning {} ...", workload.label())?;
    let (summary, snapshot) = run_with_profiling(|| workload.execute());
    write!(out, "{}", snapshot.render(Some(10)))?;
    writeln!(out, "{summary}")?;
    Ok(())
}

fn export_artifacts(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "\nGenerating profile data files ...")?;
    // Filesystem errors are reported here and the menu keeps running.
    match export::export_profile(&export::default_batch()) {
        Ok(artifacts) => {
            writeln!(out, "Profile dump saved to: {}", artifacts.dump.display())?;
            writeln!(out, "Text report saved to:  {}", artifacts.text.display())?;
            writeln!(out, "Callgrind script:      {}", artifacts.script.display())?;
            writeln!(out, "Run the script with a release build to collect callgrind data.")?;
        }
        Err(err) => writeln!(out, "artifact export failed: {err}")?,
    }
    Ok(())
}

fn comparison(out: &mut impl Write) -> io::Result<()> {
    let n = 20u64;
    let iterations = 100u64;

    writeln!(out, "\nTiming comparison ({iterations} iterations each) ...")?;
    let recursive = time_repeated(iterations, || fibonacci_recursive(n));
    let iterative = time_repeated(iterations, || fibonacci_iterative(n));
    let matrix = time_repeated(10, || matrix_multiplication(30));

    writeln!(out, "{:<28} {:>14} {:>12}", "function", "time (s)", "iterations")?;
    writeln!(
        out,
        "{:<28} {:>14.6} {:>12}",
        format!("fibonacci_recursive({n})"),
        recursive.total.as_secs_f64(),
        recursive.repeats
    )?;
    writeln!(
        out,
        "{:<28} {:>14.6} {:>12}",
        format!("fibonacci_iterative({n})"),
        iterative.total.as_secs_f64(),
        iterative.repeats
    )?;
    writeln!(
        out,
        "{:<28} {:>14.6} {:>12}",
        "matrix_multiplication(30)",
        matrix.total.as_secs_f64(),
        matrix.repeats
    )?;

    match speedup_ratio(&recursive, &iterative) {
        Ok(ratio) => writeln!(out, "\nIterative is {ratio:.2}x faster than recursive")?,
        Err(err) => writeln!(out, "\nno speedup ratio: {err}")?,
    }
    Ok(())
}

fn dispatch(out: &mut impl Write, choice: MenuChoice, scale: Scale) -> io::Result<()> {
    match choice {
        MenuChoice::FibonacciRecursive => run_one(
            out,
            Workload::FibonacciRecursive {
                n: scale.fibonacci_recursive_n(),
            },
        ),
        MenuChoice::FibonacciIterative => run_one(
            out,
            Workload::FibonacciIterative {
                n: scale.fibonacci_iterative_n(),
            },
        ),
        MenuChoice::MatrixMultiplication => run_one(
            out,
            Workload::MatrixMultiplication {
                size: scale.matrix_size(),
            },
        ),
        MenuChoice::PrimeFactorization => run_one(
            out,
            Workload::PrimeFactorization {
                n: scale.factorization_target(),
            },
        ),
        MenuChoice::StringProcessing => run_one(
            out,
            Workload::StringProcessing {
                iterations: scale.string_iterations(),
            },
        ),
        MenuChoice::RunAll => {
            for workload in Workload::demo_set(scale) {
                run_one(out, workload)?;
            }
            Ok(())
        }
        MenuChoice::ExportArtifacts => export_artifacts(out),
        MenuChoice::Comparison => comparison(out),
        // Handled by the loop before dispatch.
        MenuChoice::Quit => Ok(()),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    loop {
        print_menu(&mut out, args.scale)?;
        write!(out, "\nSelect an option [1-8, q]: ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            // EOF behaves like quit.
            break;
        }
        let Some(choice) = MenuChoice::parse(&line) else {
            writeln!(out, "invalid selection: {}", line.trim())?;
            continue;
        };
        if choice == MenuChoice::Quit {
            writeln!(out, "bye")?;
            break;
        }

        // A failing workload (overflow and friends) is reported and the
        // menu keeps running; it must not take the process down.
        match catch_unwind(AssertUnwindSafe(|| dispatch(&mut out, choice, args.scale))) {
            Ok(result) => result?,
            Err(payload) => writeln!(out, "workload failed: {}", panic_message(payload.as_ref()))?,
        }
    }

    Ok(())
}

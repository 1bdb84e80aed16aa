//! Canned computational workloads used as benchmark subjects.
//!
//! These are intentionally naive reference implementations: the recursive
//! Fibonacci and the triple-loop matrix multiply exist to burn CPU in a
//! recognizable shape, not to be fast. Each function opens a profiler frame
//! so a surrounding [`crate::profiler::Session`] can attribute time to it;
//! outside a session the frames are inert.

use std::hint::black_box;

use crate::harness::Scale;
use crate::profiler;

/// Fibonacci by naive double recursion, O(2^n). `n` must be at most 93 or
/// the addition overflows `u64` (panics in debug builds).
pub fn fibonacci_recursive(n: u64) -> u64 {
    let _frame = profiler::frame("fibonacci_recursive");
    if n <= 1 {
        return n;
    }
    fibonacci_recursive(n - 1) + fibonacci_recursive(n - 2)
}

/// Fibonacci by iteration, O(n). Same `n <= 93` bound as the recursive form.
pub fn fibonacci_iterative(n: u64) -> u64 {
    let _frame = profiler::frame("fibonacci_iterative");
    if n <= 1 {
        return n;
    }
    let (mut a, mut b) = (0u64, 1u64);
    for _ in 2..=n {
        let next = a + b;
        a = b;
        b = next;
    }
    b
}

fn build_matrix(size: usize, cell: impl Fn(usize, usize) -> i64) -> Vec<Vec<i64>> {
    let _frame = profiler::frame("build_matrix");
    (0..size)
        .map(|i| (0..size).map(|j| cell(i, j)).collect())
        .collect()
}

/// Multiply two generated `size x size` matrices with the schoolbook
/// triple loop, O(n^3). `matrix_a[i][j] = i + j`, `matrix_b[i][j] = i * j`.
pub fn matrix_multiplication(size: usize) -> Vec<Vec<i64>> {
    let _frame = profiler::frame("matrix_multiplication");

    let matrix_a = build_matrix(size, |i, j| (i + j) as i64);
    let matrix_b = build_matrix(size, |i, j| (i * j) as i64);

    let mut result = vec![vec![0i64; size]; size];
    for i in 0..size {
        for j in 0..size {
            for k in 0..size {
                result[i][j] += matrix_a[i][k] * matrix_b[k][j];
            }
        }
    }
    result
}

/// Prime factors of `n` in ascending order by trial division.
/// Returns an empty vector for `n <= 1`.
pub fn prime_factorization(n: u64) -> Vec<u64> {
    let _frame = profiler::frame("prime_factorization");
    let mut factors = Vec::new();
    let mut n = n;
    let mut d = 2u64;
    while d * d <= n {
        while n % d == 0 {
            factors.push(d);
            n /= d;
        }
        d += 1;
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

/// Concatenate the decimal renderings of `0..iterations` one at a time.
/// Deliberately re-formats per iteration to give the profiler something
/// to chew on.
pub fn string_processing(iterations: usize) -> String {
    let _frame = profiler::frame("string_processing");
    let mut result = String::new();
    for i in 0..iterations {
        result.push_str(&i.to_string());
    }
    result
}

/// One workload invocation with bound parameters. This is the enumerated
/// command type the menu and the exporter dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    FibonacciRecursive { n: u64 },
    FibonacciIterative { n: u64 },
    MatrixMultiplication { size: usize },
    PrimeFactorization { n: u64 },
    StringProcessing { iterations: usize },
}

impl Workload {
    /// The five demo workloads at the parameters for `scale`.
    pub fn demo_set(scale: Scale) -> [Workload; 5] {
        [
            Workload::FibonacciRecursive {
                n: scale.fibonacci_recursive_n(),
            },
            Workload::FibonacciIterative {
                n: scale.fibonacci_iterative_n(),
            },
            Workload::MatrixMultiplication {
                size: scale.matrix_size(),
            },
            Workload::PrimeFactorization {
                n: scale.factorization_target(),
            },
            Workload::StringProcessing {
                iterations: scale.string_iterations(),
            },
        ]
    }

    pub fn label(&self) -> String {
        match self {
            Workload::FibonacciRecursive { n } => format!("fibonacci_recursive({n})"),
            Workload::FibonacciIterative { n } => format!("fibonacci_iterative({n})"),
            Workload::MatrixMultiplication { size } => format!("matrix_multiplication({size})"),
            Workload::PrimeFactorization { n } => format!("prime_factorization({n})"),
            Workload::StringProcessing { iterations } => format!("string_processing({iterations})"),
        }
    }

    /// Run the workload and summarize its result for display. The result
    /// value itself is kept alive through `black_box` so the optimizer
    /// cannot discard the computation.
    pub fn execute(&self) -> String {
        match *self {
            Workload::FibonacciRecursive { n } => {
                format!("Result: {}", black_box(fibonacci_recursive(n)))
            }
            Workload::FibonacciIterative { n } => {
                format!("Result: {}", black_box(fibonacci_iterative(n)))
            }
            Workload::MatrixMultiplication { size } => {
                let result = black_box(matrix_multiplication(size));
                format!("Matrix multiplication complete ({}x{})", result.len(), size)
            }
            Workload::PrimeFactorization { n } => {
                format!("Prime factors: {:?}", black_box(prime_factorization(n)))
            }
            Workload::StringProcessing { iterations } => {
                let result = black_box(string_processing(iterations));
                format!("String length: {} characters", result.len())
            }
        }
    }
}

//! Benchmark harness for the rsharp front end.
//!
//! Uses criterion for reliable benchmarking.
//! Run with: cargo bench -p rsharp_compiler

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rsharp_compiler::{compile_unit, Compilation};
use rsharp_options::CompilerOptions;

/// A class with loops, labels, conversions and a query.
const MEDIUM_SOURCE: &str = r#"
using System;
using System.Linq;

namespace Samples
{
    public class Flag
    {
        public static implicit operator bool(Flag f) { return f != null; }
    }

    public class Loops
    {
        private int size;

        public int Sum(int[] cells)
        {
            int total = 0;
            for (int i = 0; i < size; i++)
            {
                if (cells[i] < 0) continue;
                total += cells[i];
            }
            return total;
        }

        public void Scan(Flag flag, bool? maybe)
        {
            int n = 0;
            while (flag) { n++; if (n > 10) break; }
            for (int k = 0, j = 0; k < 100, j > 5; k++) { }
            for (; maybe; ) { }
            goto done;
            n = 1;
            done:
            var words = from w in new[] { "a", "b" } where w.Length > 0 select w.ToUpper();
        }
    }
}
"#;

/// Generate `count` classes of loop-heavy methods.
fn generate_large_source(count: usize) -> String {
    let mut source = String::new();
    for i in 0..count {
        source.push_str(&format!(
            "class Class{i}
{{
    private int field{i};
    int Method{i}(int[] values)
    {{
        int total = 0;
        for (int j = 0; j < values.Length; j++)
        {{
            if (values[j] > {i}) total += values[j];
        }}
        do {{ total--; }} while (total > field{i});
        return total;
    }}
}}\n\n"
        ));
    }
    source
}

// ============================================================================
// Single Unit Benchmarks
// ============================================================================

fn bench_compile_unit(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_unit");
    let options = CompilerOptions::default();

    group.bench_function("medium", |b| {
        b.iter(|| compile_unit("bench.cs", black_box(MEDIUM_SOURCE), &options, None));
    });

    let large = generate_large_source(100);
    group.bench_function("large", |b| {
        b.iter(|| compile_unit("bench.cs", black_box(&large), &options, None));
    });

    group.finish();
}

// ============================================================================
// Compilation Benchmarks
// ============================================================================

fn bench_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("compilation");

    for parallel in [false, true] {
        let name = if parallel { "parallel" } else { "sequential" };
        group.bench_with_input(BenchmarkId::new(name, 16), &parallel, |b, &parallel| {
            b.iter(|| {
                let options = CompilerOptions {
                    parallel,
                    ..Default::default()
                };
                let mut compilation = Compilation::new(options);
                for i in 0..16 {
                    compilation.add_source(format!("file_{}.cs", i), MEDIUM_SOURCE);
                }
                black_box(compilation.compile())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile_unit, bench_compilation);
criterion_main!(benches);

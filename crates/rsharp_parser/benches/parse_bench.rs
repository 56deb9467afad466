use bumpalo::Bump;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rsharp_core::intern::StringInterner;
use rsharp_diagnostics::DiagnosticBag;
use rsharp_parser::Parser;
use rsharp_scanner::scan_tokens;

// A medium-size C# source with loops, queries and a few recovery cases
const CSHARP_SOURCE: &str = r#"
using System;
using System.Collections.Generic;
using System.Linq;

namespace Samples.Loops
{
    public struct Point
    {
        public int X;
        public int Y;
    }

    public class Matrix
    {
        private int[,] cells;
        private readonly int size;

        public Matrix(int size)
        {
            this.size = size;
            cells = new int[size, size];
        }

        public int Trace()
        {
            int total = 0;
            for (int i = 0; i < size; i++)
            {
                total += cells[i, i];
            }
            return total;
        }

        public void Fill(int value)
        {
            for (int i = 0, j = 0; i < size; i++, j = 0)
            {
                for (; j < size; j++)
                {
                    cells[i, j] = value;
                }
            }
        }

        public static implicit operator bool(Matrix m)
        {
            return m != null;
        }
    }

    public class Reports
    {
        public IEnumerable<string> Names(List<string> source)
        {
            var query = from name in source
                        where name.Length > 3
                        orderby name descending
                        select name.ToUpper();
            return query;
        }

        public int Search(int[] values, int target)
        {
            int index = -1;
            for (int k = 0; k < values.Length; k++)
            {
                if (values[k] == target)
                {
                    index = k;
                    break;
                }
            }
            while (index < 0 && target > 0)
            {
                target--;
            }
            do
            {
                index++;
            } while (index < 10);
            return index;
        }

        public void Broken()
        {
            for (int k = 0, j = 0; k < 100, j > 5; k++) { }
            for (int i = 10; i < 100;;);
            for ();
        }
    }
}
"#;

fn parse(source: &str) -> usize {
    let arena = Bump::new();
    let interner = StringInterner::new();
    let mut bag = DiagnosticBag::new();
    let tokens = scan_tokens(source, &mut bag);
    let unit = Parser::new(&arena, &interner, &tokens, &mut bag)
        .parse_compilation_unit()
        .map(|unit| unit.members.len())
        .unwrap_or_default();
    unit + bag.len()
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_csharp_source", |b| {
        b.iter(|| parse(black_box(CSHARP_SOURCE)))
    });

    let large = CSHARP_SOURCE.repeat(20);
    c.bench_function("parse_csharp_source_x20", |b| {
        b.iter(|| parse(black_box(&large)))
    });

    let deep = format!("x = {}1{};", "(".repeat(1000), ")".repeat(1000));
    c.bench_function("parse_nesting_limit", |b| {
        b.iter(|| parse(black_box(&deep)))
    });
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};

const LARGE_PROGRAM: &str = include_str!("../../../demos/large_program.py");
const DIVMOD: &str = include_str!("../../../demos/divmod.py");

/// A synthetic program with many functions and deeply nested branches.
fn generated_program(functions: usize, depth: usize) -> String {
    let mut src = String::new();
    for f in 0..functions {
        src.push_str(&format!("def f{f}(a, b):\n"));
        for d in 0..depth {
            let indent = "  ".repeat(d + 1);
            src.push_str(&format!("{indent}if a * {d} + b > {f}:\n"));
        }
        let indent = "  ".repeat(depth + 1);
        src.push_str(&format!("{indent}return a, b\n"));
        src.push_str("  return 0\n\n");
    }
    src
}

fn bench_parse_large_program(c: &mut Criterion) {
    c.bench_function("parse_large_program", |b| {
        b.iter(|| sympath_lang::parse(black_box(LARGE_PROGRAM), "large_program.py").unwrap())
    });
}

fn bench_parse_divmod(c: &mut Criterion) {
    c.bench_function("parse_divmod", |b| {
        b.iter(|| sympath_lang::parse(black_box(DIVMOD), "divmod.py").unwrap())
    });
}

fn bench_parse_generated(c: &mut Criterion) {
    let src = generated_program(50, 8);
    c.bench_function("parse_generated_50x8", |b| {
        b.iter(|| sympath_lang::parse(black_box(&src), "generated.py").unwrap())
    });
}

criterion_group!(
    benches,
    bench_parse_large_program,
    bench_parse_divmod,
    bench_parse_generated
);
criterion_main!(benches);

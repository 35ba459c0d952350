use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vcf_filter::{FilterSpec, VariantFilter, VcfRecord, VcfRecords};

const PATH: &str = "resources/mpileup.vcf";

fn records(path: &str) -> Vec<VcfRecord> {
    VcfRecords::from_path(path)
        .unwrap()
        .filter_map(Result::ok)
        .collect()
}

fn benchmark_read(c: &mut Criterion) {
    let path = PATH;
    c.bench_with_input(BenchmarkId::new("read", path), &path, |b, &path| {
        b.iter(|| records(path).len())
    });
}

fn benchmark_check(c: &mut Criterion) {
    let input = records(PATH);
    let mut group = c.benchmark_group("check");
    let specs = [
        ("qual", FilterSpec::builder().qual_threshold(50.0)),
        (
            "builtin",
            FilterSpec::builder()
                .indel_filter(true)
                .dp4_filter(true)
                .af1_filter(true),
        ),
        (
            "rules",
            FilterSpec::builder()
                .rule("MQ", "<30")
                .rule("DP", "<10|>1000")
                .rule("PV4[0]", "<0.001")
                .rule("sum(DP4[2],DP4[3])", "<4"),
        ),
    ];
    for (name, spec) in specs {
        let filter = VariantFilter::new(spec.build().unwrap());
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, input| {
            b.iter(|| {
                input
                    .iter()
                    .filter(|record| filter.check(black_box(*record)).is_kept())
                    .count()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_read, benchmark_check);
criterion_main!(benches);

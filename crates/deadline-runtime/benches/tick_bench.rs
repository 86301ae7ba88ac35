use criterion::{criterion_group, criterion_main, Criterion};
use deadline_core::{Feedback, MetaRecord, OutputSink};
use deadline_meta::MetaProgression;
use deadline_runtime::{Run, RunConfig};

struct Discard;

impl OutputSink for Discard {
    fn emit(&mut self, _feedback: Feedback) {}
}

fn fresh(seed: u64, out: &mut Discard) -> Run {
    Run::start(
        RunConfig::new(seed),
        MetaProgression::in_memory(MetaRecord::default()),
        out,
    )
    .unwrap()
}

fn bench_ticks(c: &mut Criterion) {
    c.bench_function("run_step", |b| {
        let mut out = Discard;
        let mut run = fresh(42, &mut out);
        b.iter(|| {
            if run.is_over() {
                run = fresh(42, &mut out);
            }
            run.step(&mut out);
        })
    });

    c.bench_function("submit_scan", |b| {
        let mut out = Discard;
        let mut run = fresh(7, &mut out);
        b.iter(|| {
            let _ = run.submit("scan", &mut out);
            let _ = run.submit("hide", &mut out);
        })
    });
}

criterion_group!(benches, bench_ticks);
criterion_main!(benches);

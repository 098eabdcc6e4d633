//! Performance benchmarks for the speedtest exporter
//!
//! A scrape is dominated by the external CLI, but the report parsing and
//! metrics rendering run on every result and every scrape.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use speedtest_exporter::{
    cli::Cli,
    config::{parser::ConfigParser, validate_config},
    models::{Config, Snapshot},
    output::{JsonFormatter, MetricsFormatter, PrometheusFormatter},
    speedtest::parse_report,
};
use clap::Parser;
use std::hint::black_box;

const REPORT: &str = include_str!("../tests/fixtures/speedtest_result.json");
const ERROR_REPORT: &str = include_str!("../tests/fixtures/speedtest_error.json");

fn sample_snapshot() -> Snapshot {
    let mut measurement = parse_report(REPORT.as_bytes()).expect("fixture parses");
    measurement.duration = std::time::Duration::from_secs(21);
    Snapshot {
        last: Some(measurement),
        runs_total: 42,
        failures_total: 3,
        running: false,
    }
}

/// Benchmark parsing of CLI reports
fn benchmark_report_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("report_parsing");

    group.bench_function("parse_result", |b| {
        b.iter(|| parse_report(black_box(REPORT.as_bytes())))
    });

    group.bench_function("parse_error", |b| {
        b.iter(|| parse_report(black_box(ERROR_REPORT.as_bytes())).is_err())
    });

    group.finish();
}

/// Benchmark rendering a snapshot per scrape
fn benchmark_metrics_rendering(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics_rendering");
    let prometheus = PrometheusFormatter::new();
    let json = JsonFormatter;

    for (name, snapshot) in [("empty", Snapshot::empty()), ("measured", sample_snapshot())] {
        group.bench_with_input(BenchmarkId::new("prometheus", name), &snapshot, |b, snapshot| {
            b.iter(|| prometheus.format(black_box(snapshot)))
        });

        group.bench_with_input(BenchmarkId::new("json", name), &snapshot, |b, snapshot| {
            b.iter(|| json.format(black_box(snapshot)))
        });
    }

    group.finish();
}

/// Benchmark configuration parsing
fn benchmark_config_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("config_parsing");

    group.bench_function("parse_cli_args", |b| {
        b.iter(|| {
            Cli::try_parse_from(black_box([
                "speedtest-exporter", "--port", "9100", "--server-id", "21541", "--cache-for", "300",
            ]))
        })
    });

    group.bench_function("validate_config", |b| {
        let config = Config::default();
        b.iter(|| validate_config(black_box(&config)))
    });

    group.bench_function("apply_cli_overrides", |b| {
        let cli = Cli::parse_from(["speedtest-exporter", "--timeout", "120", "--interval", "600"]);
        let parser = ConfigParser::new(cli);
        b.iter(|| {
            let mut config = Config::default();
            parser.apply_cli_overrides(&mut config);
            black_box(config)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_report_parsing,
    benchmark_metrics_rendering,
    benchmark_config_parsing
);
criterion_main!(benches);

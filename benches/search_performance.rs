use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lineview::file_handler::Session;
use lineview::search::{search_session, CollectSink, LineMatcher, SearchLimits, SearchOptions};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::runtime::Runtime;

fn create_log_file_with_patterns(size_kb: usize, pattern_frequency: usize) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let target_size = size_kb * 1024;
    let mut current_size = 0;
    let mut line_num = 0;

    let log_levels = ["DEBUG", "INFO", "WARN", "ERROR", "FATAL"];
    let services = ["auth", "database", "cache", "payment", "notification"];
    let error_patterns = [
        "timeout",
        "connection_failed",
        "null_pointer",
        "out_of_memory",
    ];

    while current_size < target_size {
        let log_level = log_levels[line_num % log_levels.len()];
        let service = services[line_num % services.len()];

        let log_line = if line_num % pattern_frequency == 0 {
            let error = error_patterns[line_num / pattern_frequency % error_patterns.len()];
            format!(
                "[2024-09-02T10:{}:{:02}] {} {}: Request {} failed with {} user_{}\n",
                (line_num / 3600) % 24,
                (line_num / 60) % 60,
                log_level,
                service,
                line_num,
                error,
                line_num % 1000
            )
        } else {
            format!(
                "[2024-09-02T10:{}:{:02}] {} {}: Request {} completed in {}ms user_{}\n",
                (line_num / 3600) % 24,
                (line_num / 60) % 60,
                log_level,
                service,
                line_num,
                line_num % 500,
                line_num % 1000
            )
        };

        temp_file.write_all(log_line.as_bytes()).unwrap();
        current_size += log_line.len();
        line_num += 1;
    }

    temp_file.flush().unwrap();
    temp_file
}

fn limits(max_results: usize) -> SearchLimits {
    SearchLimits {
        max_results,
        ..SearchLimits::default()
    }
}

fn bench_search_patterns(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("search_patterns");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    let temp_file = create_log_file_with_patterns(20000, 100);
    let session = rt
        .block_on(Session::index(temp_file.path(), 1024 * 1024, |_| {}))
        .unwrap();
    let session = &session;

    let regex = SearchOptions {
        regex_mode: true,
        ..SearchOptions::default()
    };
    let ignore_case = SearchOptions {
        case_sensitive: false,
        ..SearchOptions::default()
    };
    let word = SearchOptions {
        whole_word: true,
        ..SearchOptions::default()
    };
    let cases = [
        ("literal_common", "timeout", SearchOptions::default()),
        ("literal_absent", "segfault", SearchOptions::default()),
        ("ignore_case", "ERROR", ignore_case),
        ("whole_word", "auth", word),
        ("regex_alternation", r"timeout|out_of_memory", regex.clone()),
        ("regex_digits", r"Request \d{3}5 failed", regex),
    ];

    for (name, pattern, options) in cases {
        let matcher = LineMatcher::new(pattern, &options).unwrap();
        group.bench_function(BenchmarkId::new("full_scan", name), |b| {
            let matcher = &matcher;
            b.to_async(&rt).iter(move || async move {
                let mut sink = CollectSink::default();
                let summary = search_session(session, matcher, limits(usize::MAX), None, &mut sink)
                    .await
                    .unwrap();
                black_box(summary.match_count);
            });
        });
    }

    group.finish();
}

fn bench_first_screen_of_results(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("first_results");

    let temp_file = create_log_file_with_patterns(20000, 100);
    let session = rt
        .block_on(Session::index(temp_file.path(), 1024 * 1024, |_| {}))
        .unwrap();
    let session = &session;
    let matcher = LineMatcher::new("connection_failed", &SearchOptions::default()).unwrap();
    let matcher = &matcher;

    // A result cap stops the scan early; this is what interactive search pays
    for &max_results in &[1usize, 50, 1000] {
        group.bench_with_input(
            BenchmarkId::new("max_results", max_results),
            &max_results,
            |b, &max_results| {
                b.to_async(&rt).iter(move || async move {
                    let mut sink = CollectSink::default();
                    let summary =
                        search_session(session, matcher, limits(max_results), None, &mut sink)
                            .await
                            .unwrap();
                    black_box(summary.status);
                });
            },
        );
    }

    group.finish();
}

fn bench_matcher_compilation(c: &mut Criterion) {
    let regex = SearchOptions {
        regex_mode: true,
        ..SearchOptions::default()
    };
    c.bench_function("compile_regex", |b| {
        b.iter(|| {
            let matcher = LineMatcher::new(
                black_box(r"\b(?:ERROR|FATAL)\b.*(?:timeout|out_of_memory)"),
                &regex,
            )
            .unwrap();
            black_box(matcher);
        });
    });
}

criterion_group!(
    benches,
    bench_search_patterns,
    bench_first_screen_of_results,
    bench_matcher_compilation
);
criterion_main!(benches);

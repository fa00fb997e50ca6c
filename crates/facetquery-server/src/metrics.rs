use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_histogram, CounterVec, Histogram};

pub static QUERY_ASSEMBLE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "query_assemble_total",
        "Assembly requests by result",
        &["result"]
    )
    .unwrap()
});

pub static FILTERS_SKIPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "filters_skipped_total",
        "Search fields dropped from the filter chain, by reason",
        &["reason"]
    )
    .unwrap()
});

pub static QUERY_ASSEMBLE_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "query_assemble_seconds",
        "Time to translate and assemble one query",
        vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01]
    )
    .unwrap()
});

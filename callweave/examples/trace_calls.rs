//! Trace every call in a function.
//!
//! Run with: `cargo run --example trace_calls`

use callweave::{wrap_calls, TraceCalls};

fn load(id: u32) -> Vec<u32> {
    (0..id).collect()
}

fn checksum(values: &[u32]) -> u32 {
    values.iter().sum()
}

#[wrap_calls(wrapper = TraceCalls, rewrite_details = PIPELINE_DETAILS)]
fn pipeline(id: u32) -> u32 {
    let values = load(id);
    checksum(&values)
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let total = pipeline(5);
    println!("checksum: {total}");
    println!("--- rewritten source of {} ---", PIPELINE_DETAILS.function);
    println!("{}", PIPELINE_DETAILS.new_source);
}

//! Profile a function and report the per-callee breakdown.
//!
//! Run with: `cargo run --example flat_profile`

use std::thread::sleep;
use std::time::Duration;

use callweave::flat_profile;

fn fetch(id: u32) -> u32 {
    sleep(Duration::from_millis(30));
    id * 10
}

fn transform(value: u32) -> u32 {
    sleep(Duration::from_millis(5));
    value + 1
}

fn store(value: u32) {
    sleep(Duration::from_millis(10));
    let _ = value;
}

#[flat_profile(time_limit = 0.025)]
fn sync_record(id: u32) {
    let raw = fetch(id);
    let cooked = transform(raw);
    store(cooked);
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Well over the 25ms limit, so the above-limit report fires with the
    // breakdown showing fetch as the dominant callee.
    sync_record(7);
}

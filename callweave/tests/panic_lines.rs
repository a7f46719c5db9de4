//! Panic locations inside rewritten bodies point at the original lines.
//!
//! Kept in its own test binary: the panic hook is process-global, and this
//! way no other panicking test can race with it.

use std::panic;
use std::sync::Mutex;

use callweave::{wrap_calls, Passthrough};

static LOCATION: Mutex<Option<(String, u32)>> = Mutex::new(None);

#[wrap_calls(wrapper = Passthrough)]
fn trips(v: u32) -> u32 {
    let doubled = double(v);
    assert_ne!(doubled, 8, "tripwire");
    doubled
}

fn double(v: u32) -> u32 {
    v * 2
}

#[test]
fn panic_location_reports_the_original_line() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(|info| {
        if let Some(location) = info.location() {
            *LOCATION.lock().unwrap() =
                Some((location.file().to_string(), location.line()));
        }
    }));
    let result = panic::catch_unwind(|| trips(4));
    panic::set_hook(previous);

    assert!(result.is_err());
    let (file, line) = LOCATION.lock().unwrap().clone().unwrap();
    assert!(file.ends_with("panic_lines.rs"), "{file}");
    // The assert sits on line 16 of this file; the rewrite must not have
    // moved it as far as diagnostics are concerned.
    assert_eq!(line, 16);
}

//! The wrapper contract and the built-in wrappers.

use tracing::info;

use crate::CallExtras;

/// A value that intercepts wrapped calls.
///
/// Rewritten call sites invoke `wrap` with the call site's [`CallExtras`]
/// and a thunk that performs the original call. The wrapper decides what
/// happens around the thunk; the transparency expectation is that it runs
/// the thunk exactly once and returns its result unchanged, with panics
/// propagating. Nothing enforces that, which is what makes short-circuit
/// or retry wrappers possible when a caller wants them.
pub trait CallWrap {
    fn wrap<T>(&self, extras: &CallExtras, call: impl FnOnce() -> T) -> T;
}

/// Forwards every call untouched. The baseline for overhead measurements
/// and for checking that a rewrite preserves behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl CallWrap for Passthrough {
    fn wrap<T>(&self, _extras: &CallExtras, call: impl FnOnce() -> T) -> T {
        call()
    }
}

/// Logs each wrapped call before and after it runs.
///
/// The after-line is emitted from a drop guard so it also fires when the
/// call panics, marking where an invocation stopped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceCalls;

impl CallWrap for TraceCalls {
    fn wrap<T>(&self, extras: &CallExtras, call: impl FnOnce() -> T) -> T {
        struct After(&'static str);
        impl Drop for After {
            fn drop(&mut self) {
                info!(target: "callweave", call = self.0, "call finished");
            }
        }
        info!(
            target: "callweave",
            call = extras.name,
            source = extras.source,
            line = extras.ln_range.0,
            "call started"
        );
        let _after = After(extras.name);
        call()
    }
}

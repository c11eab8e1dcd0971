//! Host stack guard for the recursive parser and evaluator.
//!
//! Nested expressions and user-level recursion both turn into Rust recursion.
//! Wrapping the recursive entry points in [`ensure_sufficient_stack`] grows the
//! stack on demand, so the interpreter's own call-depth limit is what stops a
//! runaway script instead of a host stack overflow.

/// If less than this remains, grow the stack.
const RED_ZONE: usize = 128 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

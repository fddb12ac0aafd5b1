//! Stack growth for the recursive parts of the pipeline.
//!
//! Both the parser and the evaluator recurse once per level of nesting in
//! the source, so deeply nested input would otherwise overflow the native
//! stack long before any of our own limits trigger.

/// Minimum stack space left before `stacker` switches to a new segment.
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first moving to a fresh stack segment if the current one is
/// nearly exhausted.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

//! Stack switching: mmap'd stacks and one-shot continuations over libcontext.

pub(crate) mod continuation;
pub(crate) mod stack;

#[allow(dead_code)]
#[allow(non_upper_case_globals)]
#[allow(non_camel_case_types)]
#[allow(non_snake_case)]
#[allow(clippy::upper_case_acronyms)]
pub(super) mod libcontext;

pub use stack::DEFAULT_STACK_SIZE;

#[cfg(not(all(
    target_os = "linux",
    any(target_arch = "x86_64", target_arch = "aarch64")
)))]
compile_error!("bidi_coroutine only supports x86_64 and aarch64 Linux");

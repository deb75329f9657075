use libc::c_void;
use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Error, ErrorKind};
use tracing::trace;

/// Stack size used by `Coroutine::new` and `BidirectionalCoroutine::new`.
pub const DEFAULT_STACK_SIZE: usize = 1 << 20;

/// Number of released stacks each thread keeps around for reuse.
const POOL_CAPACITY: usize = 64;

static PAGE_SIZE: Lazy<usize> = Lazy::new(|| unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize });

pub(crate) struct Stack {
    // highest address; stacks grow down from here
    pub(crate) top: *mut c_void,
    // mapped length, guard page included
    pub(crate) size: usize,
}

impl Stack {
    #[cold]
    unsafe fn new(size: usize) -> Result<Self, Error> {
        let page_size = *PAGE_SIZE;
        assert!(size % page_size == 0);
        let mem = libc::mmap(
            std::ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_STACK,
            -1,
            0,
        );
        if mem == libc::MAP_FAILED {
            return Err(Error::last_os_error());
        }

        // lowest page traps overflow
        if libc::mprotect(mem, page_size, libc::PROT_NONE) < 0 {
            let err = Error::last_os_error();
            libc::munmap(mem, size);
            return Err(err);
        }

        trace!(target: "bidi_coroutine::stack", size, "Mapped coroutine stack");
        Ok(Self {
            top: mem.byte_add(size),
            size,
        })
    }
}

impl Drop for Stack {
    #[cold]
    fn drop(&mut self) {
        trace!(target: "bidi_coroutine::stack", size = self.size, "Unmapping coroutine stack");
        assert_eq!(
            unsafe { libc::munmap(self.top.byte_sub(self.size), self.size) },
            0
        );
    }
}

struct StackPool {
    capacity: usize,
    len: usize,
    stacks: HashMap<usize, Vec<Stack>>,
}

impl StackPool {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            len: 0,
            stacks: HashMap::new(),
        }
    }

    fn fetch_stack(&mut self, size: usize) -> Option<Stack> {
        let stack = self.stacks.get_mut(&size)?.pop()?;
        self.len -= 1;
        Some(stack)
    }

    fn return_stack(&mut self, stack: Stack) -> Result<(), Stack> {
        if self.len >= self.capacity {
            Err(stack)
        } else {
            self.len += 1;
            self.stacks.entry(stack.size).or_default().push(stack);
            Ok(())
        }
    }
}

thread_local! {
    static TLS_STACK_POOL: RefCell<StackPool> = RefCell::new(StackPool::new(POOL_CAPACITY));
}

/// Rounds a requested stack size up to whole pages, adding the guard page and
/// enforcing a floor of two usable pages.
pub(crate) fn mapped_size(requested: usize) -> Result<usize, Error> {
    let page_size = *PAGE_SIZE;
    let usable = requested.max(2 * page_size);
    usable
        .div_ceil(page_size)
        .checked_mul(page_size)
        .and_then(|size| size.checked_add(page_size))
        .ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("coroutine stack size {requested} is too large"),
            )
        })
}

#[inline]
pub(crate) fn fetch_or_alloc_stack(requested: usize) -> Result<Stack, Error> {
    let size = mapped_size(requested)?;
    let cached = TLS_STACK_POOL
        .try_with(|pool| pool.borrow_mut().fetch_stack(size))
        .ok()
        .flatten();
    match cached {
        Some(stack) => {
            trace!(target: "bidi_coroutine::stack", size, "Reusing cached coroutine stack");
            Ok(stack)
        }
        None => unsafe { Stack::new(size) },
    }
}

#[inline]
pub(crate) fn return_or_release_stack(stack: Stack) {
    // during thread teardown the pool may already be gone; the stack is then unmapped here
    let _ = TLS_STACK_POOL.try_with(|pool| pool.borrow_mut().return_stack(stack));
}

#[cfg(test)]
pub(crate) fn cached_stacks() -> usize {
    TLS_STACK_POOL.with_borrow(|pool| pool.len)
}

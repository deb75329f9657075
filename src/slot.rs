//! Heap storage for a single value that may not have been constructed yet.
//!
//! A [`Slot`] is allocated empty, filled in place as many times as needed
//! without reallocating, and torn down exactly once. The coroutine engine uses
//! one for the argument tuple (empty until the first resume) and one for the
//! yielded result (empty until the body first yields).

use std::fmt;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

struct SlotCell<T> {
    live: bool,
    value: MaybeUninit<T>,
}

/// Possibly-uninitialized, explicitly managed storage for one `T`.
pub struct Slot<T> {
    cell: Option<NonNull<SlotCell<T>>>,
}

impl<T> Slot<T> {
    /// Allocates storage for a `T` without constructing one.
    pub fn allocate() -> Self {
        let cell = Box::new(SlotCell {
            live: false,
            value: MaybeUninit::uninit(),
        });
        Self {
            cell: Some(NonNull::from(Box::leak(cell))),
        }
    }

    #[inline]
    fn cell(&self) -> &SlotCell<T> {
        match self.cell {
            Some(cell) => unsafe { cell.as_ref() },
            None => panic!("slot used after release"),
        }
    }

    #[inline]
    fn cell_mut(&mut self) -> &mut SlotCell<T> {
        match self.cell {
            Some(mut cell) => unsafe { cell.as_mut() },
            None => panic!("slot used after release"),
        }
    }

    /// Whether a value is currently constructed in the slot.
    #[inline]
    pub fn is_live(&self) -> bool {
        self.cell.is_some() && self.cell().live
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.cell.is_none()
    }

    /// Destroys the current value, if any, then stores `value` in its place.
    #[inline]
    pub fn construct_or_replace(&mut self, value: T) -> &mut T {
        self.construct_with(|| value)
    }

    /// Destroys the current value, if any, then constructs a new one from `init`.
    ///
    /// If `init` panics the slot is left empty.
    pub fn construct_with(&mut self, init: impl FnOnce() -> T) -> &mut T {
        let cell = self.cell_mut();
        if cell.live {
            cell.live = false;
            unsafe { cell.value.assume_init_drop() };
        }
        let value = cell.value.write(init());
        cell.live = true;
        value
    }

    /// # Safety
    /// The slot must be live.
    #[inline]
    pub unsafe fn get(&self) -> &T {
        let cell = self.cell();
        debug_assert!(cell.live, "read from an empty slot");
        cell.value.assume_init_ref()
    }

    /// # Safety
    /// The slot must be live.
    #[inline]
    pub unsafe fn get_mut(&mut self) -> &mut T {
        let cell = self.cell_mut();
        debug_assert!(cell.live, "read from an empty slot");
        cell.value.assume_init_mut()
    }

    #[inline]
    pub fn try_get(&self) -> Option<&T> {
        if self.is_live() {
            Some(unsafe { self.get() })
        } else {
            None
        }
    }

    /// Moves the value out, leaving the slot empty but still allocated.
    pub fn take(&mut self) -> Option<T> {
        let cell = self.cell_mut();
        if cell.live {
            cell.live = false;
            Some(unsafe { cell.value.assume_init_read() })
        } else {
            None
        }
    }

    /// Destroys the value if live and frees the storage. Calling it again does nothing.
    pub fn release(&mut self) {
        if let Some(cell) = self.cell.take() {
            let mut cell = unsafe { Box::from_raw(cell.as_ptr()) };
            if cell.live {
                cell.live = false;
                unsafe { cell.value.assume_init_drop() };
            }
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::allocate()
    }
}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_released() {
            f.write_str("Slot(<released>)")
        } else {
            match self.try_get() {
                Some(value) => f.debug_tuple("Slot").field(value).finish(),
                None => f.write_str("Slot(<empty>)"),
            }
        }
    }
}

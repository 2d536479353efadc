#[cfg(feature = "loom")]
mod imp {
    pub(crate) use loom::{
        cell::UnsafeCell,
        sync::atomic::{AtomicBool, Ordering},
    };
    use std::collections::VecDeque;

    /// Multi-producer FIFO backing a serial engine.
    ///
    /// Loom cannot see through `crossbeam-queue`'s internal atomics, so the
    /// model uses a mutex-guarded deque instead.
    #[derive(Debug)]
    pub(crate) struct Fifo<T>(loom::sync::Mutex<VecDeque<T>>);

    impl<T> Fifo<T> {
        pub(crate) fn new() -> Self {
            Self(loom::sync::Mutex::new(VecDeque::new()))
        }

        pub(crate) fn push(&self, value: T) {
            self.0.lock().unwrap().push_back(value);
        }

        pub(crate) fn pop(&self) -> Option<T> {
            self.0.lock().unwrap().pop_front()
        }

        pub(crate) fn is_empty(&self) -> bool {
            self.0.lock().unwrap().is_empty()
        }
    }

    /// Orders a store to the `running` flag against a later FIFO emptiness check.
    ///
    /// The loom FIFO is lock-based, and its lock already provides the order.
    pub(crate) fn store_load_fence() {}
}

#[cfg(not(feature = "loom"))]
mod imp {
    use crate::types::SyncUnsafeCell;
    pub(crate) use core::{
        cell::UnsafeCell,
        sync::atomic::{AtomicBool, Ordering},
    };
    use core::sync::atomic::fence;
    use crossbeam_queue::SegQueue;

    /// Multi-producer FIFO backing a serial engine.
    pub(crate) type Fifo<T> = SegQueue<T>;

    /// Orders a store to the `running` flag against a later FIFO emptiness check.
    ///
    /// Submitters push and then CAS the flag; the finishing worker clears the
    /// flag and then checks the FIFO. Without a full fence on both sides each
    /// could miss the other's write and strand the pushed entry.
    pub(crate) fn store_load_fence() {
        fence(Ordering::SeqCst);
    }

    pub(crate) trait LoomPtrCompat: Sized {
        type Ptr;
        fn with<R>(self, f: impl FnOnce(Self::Ptr) -> R) -> R;
    }

    impl<T> LoomPtrCompat for *mut T {
        type Ptr = *mut T;
        fn with<R>(self, f: impl FnOnce(Self::Ptr) -> R) -> R {
            f(self)
        }
    }

    pub(crate) trait LoomUnsafeCellCompat<T> {
        fn get_mut(&self) -> impl LoomPtrCompat<Ptr = *mut T>;
    }

    impl<T> LoomUnsafeCellCompat<T> for SyncUnsafeCell<T> {
        fn get_mut(&self) -> impl LoomPtrCompat<Ptr = *mut T> {
            self.get()
        }
    }
}

pub(crate) use imp::*;

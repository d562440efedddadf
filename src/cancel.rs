use core::cell::RefCell;
use core::fmt;
use core::future::poll_fn;
use core::task::{Poll, Waker};
use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::MultiWakerRegistration;

const MAX_WAITERS: usize = 4;

struct Shared {
    cancelled: bool,
    waker: MultiWakerRegistration<MAX_WAITERS>,
}

struct Node {
    shared: Mutex<NoopRawMutex, RefCell<Shared>>,
    parent: Option<Rc<Node>>,
}

impl Node {
    fn new(parent: Option<Rc<Node>>) -> Self {
        Self {
            shared: Mutex::new(RefCell::new(Shared {
                cancelled: false,
                waker: MultiWakerRegistration::new(),
            })),
            parent,
        }
    }

    /// With a waker, register it on this node and every ancestor still
    /// running.
    fn is_cancelled(&self, waker: Option<&Waker>) -> bool {
        let cancelled = self.shared.lock(|s| {
            let mut s = s.borrow_mut();
            if let (false, Some(waker)) = (s.cancelled, waker) {
                s.waker.register(waker);
            }
            s.cancelled
        });
        cancelled || self.parent.as_ref().is_some_and(|p| p.is_cancelled(waker))
    }
}

/// Cooperative cancellation flag.
///
/// Clones share the same flag. A token made with [`CancellationToken::child`]
/// also reports cancellation once any of its ancestors is cancelled, while
/// cancelling the child leaves the parent untouched.
#[derive(Clone)]
pub struct CancellationToken {
    node: Rc<Node>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            node: Rc::new(Node::new(None)),
        }
    }

    pub fn child(&self) -> Self {
        Self {
            node: Rc::new(Node::new(Some(self.node.clone()))),
        }
    }

    pub fn cancel(&self) {
        self.node.shared.lock(|s| {
            let mut s = s.borrow_mut();
            s.cancelled = true;
            s.waker.wake();
        });
    }

    pub fn is_cancelled(&self) -> bool {
        self.node.is_cancelled(None)
    }

    /// Resolves once this token or one of its ancestors is cancelled.
    pub async fn cancelled(&self) {
        poll_fn(|cx| {
            if self.node.is_cancelled(Some(cx.waker())) {
                return Poll::Ready(());
            }
            Poll::Pending
        })
        .await
    }
}

use std::cell::RefCell;
use std::marker::PhantomData;

use tracing::trace;

use crate::runtime::flow::Flow;

thread_local! {
    // Innermost entered flow is last.
    static ACTIVE_FLOWS: RefCell<Vec<Flow>> = const { RefCell::new(Vec::new()) };
}

/// Keeps a flow active on the current thread until dropped.
///
/// Not `Send`: the guard has to be dropped on the thread that created it.
#[must_use = "the flow stops being active as soon as the guard is dropped"]
pub struct FlowGuard {
    // The handle that was pushed; other flows may share its id.
    flow: Flow,
    _not_send: PhantomData<*const ()>,
}

impl Flow {
    /// Make this flow the active one for task construction on this thread.
    ///
    /// Scopes nest; the innermost entered flow wins.
    pub fn enter(&self) -> FlowGuard {
        ACTIVE_FLOWS.with(|stack| stack.borrow_mut().push(self.clone()));
        trace!(flow = %self.id(), "entered flow context");
        FlowGuard {
            flow: self.clone(),
            _not_send: PhantomData,
        }
    }

    /// Run `f` with this flow active.
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.enter();
        f()
    }

    /// The flow currently active on this thread, if any.
    pub fn active() -> Option<Flow> {
        ACTIVE_FLOWS.with(|stack| stack.borrow().last().cloned())
    }
}

impl Drop for FlowGuard {
    fn drop(&mut self) {
        ACTIVE_FLOWS.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|f| f.ptr_eq(&self.flow)) {
                stack.remove(pos);
            }
        });
        trace!(flow = %self.flow.id(), "left flow context");
    }
}

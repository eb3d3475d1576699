//! Double-buffered message delivery between supersteps.
//!
//! During superstep `s` nodes read only what was sent in `s - 1` (the receive
//! buffer) and write only into the send buffer. The buffers are swapped by the
//! driver after the task batch joined, so no message is read while it can still be
//! written.
//!
//! Two strategies:
//! - [`QueueMessenger`]: every message is kept. Each partition task appends to its
//!   own outbox; at the barrier the outboxes are compacted into a CSR-shaped inbox
//!   (`offsets` + `messages`) indexed by target.
//! - [`ReducingMessenger`]: messages to a node are folded into one slot by a
//!   [`Reducer`] as they are sent, using atomic read-modify-write on the slot.

use std::sync::Mutex;

use super::reducer::Reducer;
use crate::{
    collections::paged::{AtomicPagedArray, AtomicValue, PagedArray},
    concurrency::AtomicBitSet,
    tracing_helpers::trace_log,
};

/// Keeps every message, delivered in per-target batches.
pub(crate) struct QueueMessenger<M: AtomicValue> {
    node_count: u64,
    outboxes: Vec<Mutex<Vec<(u64, M)>>>,
    offsets: PagedArray<u64>,
    messages: PagedArray<M>,
}

impl<M: AtomicValue> QueueMessenger<M> {
    fn new(node_count: u64) -> Self {
        Self {
            node_count,
            outboxes: Vec::new(),
            offsets: PagedArray::new(node_count + 1),
            messages: PagedArray::new(0),
        }
    }

    /// Allocates one outbox per partition task of the coming superstep.
    fn prepare(&mut self, tasks: usize) {
        self.outboxes.resize_with(tasks, || Mutex::new(Vec::new()));
    }

    /// Hands the outbox of task `slot` to the messenger.
    fn deposit(&self, slot: usize, outbox: Vec<(u64, M)>) {
        let mut guard = match self.outboxes[slot].lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = outbox;
    }

    /// Compacts all outboxes into the receive buffer, replacing the previous one.
    fn swap(&mut self) {
        let n = self.node_count;
        let mut offsets = PagedArray::<u64>::new(n + 1);
        let mut total = 0u64;
        for outbox in &mut self.outboxes {
            let outbox = outbox.get_mut().unwrap_or_else(|p| p.into_inner());
            total += outbox.len() as u64;
            for &(target, _) in outbox.iter() {
                offsets.set(target + 1, offsets.get(target + 1) + 1);
            }
        }
        for i in 1..=n {
            offsets.set(i, offsets.get(i) + offsets.get(i - 1));
        }

        let mut cursor = PagedArray::<u64>::new(n);
        let mut messages = PagedArray::<M>::new(total);
        for outbox in &mut self.outboxes {
            let outbox = outbox.get_mut().unwrap_or_else(|p| p.into_inner());
            for (target, message) in outbox.drain(..) {
                let slot = offsets.get(target) + cursor.get(target);
                cursor.set(target, cursor.get(target) + 1);
                messages.set(slot, message);
            }
        }

        trace_log!(messages = total, "compacted queue inbox");
        self.offsets = offsets;
        self.messages = messages;
    }

    fn has_messages(&self, node: u64) -> bool {
        self.offsets.get(node + 1) > self.offsets.get(node)
    }

    fn messages(&self, node: u64) -> Messages<'_, M> {
        Messages {
            inner: MessagesInner::Queue {
                messages: &self.messages,
                next: self.offsets.get(node),
                end: self.offsets.get(node + 1),
            },
        }
    }
}

/// Folds messages per target with a [`Reducer`].
pub(crate) struct ReducingMessenger<M: AtomicValue> {
    reducer: Box<dyn Reducer<M>>,
    send_values: AtomicPagedArray<M>,
    send_flags: AtomicBitSet,
    receive_values: AtomicPagedArray<M>,
    receive_flags: AtomicBitSet,
}

impl<M: AtomicValue> ReducingMessenger<M> {
    fn new(node_count: u64, reducer: Box<dyn Reducer<M>>) -> Self {
        let identity = reducer.identity();
        Self {
            send_values: AtomicPagedArray::filled(node_count, identity),
            send_flags: AtomicBitSet::new(node_count),
            receive_values: AtomicPagedArray::filled(node_count, identity),
            receive_flags: AtomicBitSet::new(node_count),
            reducer,
        }
    }

    /// Folds `message` into the mailbox of `target`.
    #[inline]
    pub(crate) fn send(&self, target: u64, message: M) {
        let reducer = &*self.reducer;
        self.send_values
            .update(target, |current| reducer.reduce(current, message));
        self.send_flags.set(target);
    }

    fn swap(&mut self) {
        core::mem::swap(&mut self.send_values, &mut self.receive_values);
        core::mem::swap(&mut self.send_flags, &mut self.receive_flags);
        self.send_values.fill(self.reducer.identity());
        self.send_flags.clear_all();
    }

    fn has_messages(&self, node: u64) -> bool {
        self.receive_flags.get(node)
    }

    fn messages(&self, node: u64) -> Messages<'_, M> {
        let value = self
            .receive_flags
            .get(node)
            .then(|| self.receive_values.get(node));
        Messages {
            inner: MessagesInner::Reduced(value),
        }
    }
}

/// The messenger a computation runs with.
pub(crate) enum Messenger<M: AtomicValue> {
    Queue(QueueMessenger<M>),
    Reducing(ReducingMessenger<M>),
}

impl<M: AtomicValue> Messenger<M> {
    pub(crate) fn new(node_count: u64, reducer: Option<Box<dyn Reducer<M>>>) -> Self {
        match reducer {
            Some(reducer) => Self::Reducing(ReducingMessenger::new(node_count, reducer)),
            None => Self::Queue(QueueMessenger::new(node_count)),
        }
    }

    pub(crate) fn prepare(&mut self, tasks: usize) {
        if let Self::Queue(queue) = self {
            queue.prepare(tasks);
        }
    }

    pub(crate) fn swap(&mut self) {
        match self {
            Self::Queue(queue) => queue.swap(),
            Self::Reducing(reducing) => reducing.swap(),
        }
    }

    /// Returns `true` if `node` received anything in the previous superstep.
    #[inline]
    pub(crate) fn has_messages(&self, node: u64) -> bool {
        match self {
            Self::Queue(queue) => queue.has_messages(node),
            Self::Reducing(reducing) => reducing.has_messages(node),
        }
    }

    /// Messages `node` received in the previous superstep.
    #[inline]
    pub(crate) fn messages(&self, node: u64) -> Messages<'_, M> {
        match self {
            Self::Queue(queue) => queue.messages(node),
            Self::Reducing(reducing) => reducing.messages(node),
        }
    }

    /// A per-task sending handle.
    pub(crate) fn outbox(&self) -> Outbox<'_, M> {
        match self {
            Self::Queue(_) => Outbox::Queue(Vec::new()),
            Self::Reducing(reducing) => Outbox::Reducing(reducing),
        }
    }

    /// Returns the outbox of task `slot` after the task is done with it.
    pub(crate) fn deposit(&self, slot: usize, outbox: Outbox<'_, M>) {
        if let (Self::Queue(queue), Outbox::Queue(messages)) = (self, outbox) {
            queue.deposit(slot, messages);
        }
    }
}

/// Where one partition task sends its messages.
pub(crate) enum Outbox<'a, M: AtomicValue> {
    /// Task-private append buffer, handed over at task end.
    Queue(Vec<(u64, M)>),
    /// Shared reducing mailboxes, written atomically.
    Reducing(&'a ReducingMessenger<M>),
}

/// Object-safe sending half of an [`Outbox`], as seen by compute contexts.
pub(crate) trait MessageSink<M> {
    fn send(&mut self, target: u64, message: M);
}

impl<M: AtomicValue> MessageSink<M> for Outbox<'_, M> {
    #[inline]
    fn send(&mut self, target: u64, message: M) {
        match self {
            Self::Queue(buffer) => buffer.push((target, message)),
            Self::Reducing(reducing) => reducing.send(target, message),
        }
    }
}

/// The messages a node received in the previous superstep.
///
/// Arrival order is unspecified. With a reducer there is at most one message: the
/// reduction of everything sent to the node.
pub struct Messages<'a, M: AtomicValue> {
    inner: MessagesInner<'a, M>,
}

enum MessagesInner<'a, M: AtomicValue> {
    Queue {
        messages: &'a PagedArray<M>,
        next: u64,
        end: u64,
    },
    Reduced(Option<M>),
}

impl<M: AtomicValue> Messages<'_, M> {
    /// Returns `true` if no (further) message is available.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<M: AtomicValue> Iterator for Messages<'_, M> {
    type Item = M;

    #[inline]
    fn next(&mut self) -> Option<M> {
        match &mut self.inner {
            MessagesInner::Queue { messages, next, end } => {
                if *next >= *end {
                    return None;
                }
                let message = messages.get(*next);
                *next += 1;
                Some(message)
            }
            MessagesInner::Reduced(value) => value.take(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = match &self.inner {
            MessagesInner::Queue { next, end, .. } => (end - next) as usize,
            MessagesInner::Reduced(value) => usize::from(value.is_some()),
        };
        (len, Some(len))
    }
}

impl<M: AtomicValue> ExactSizeIterator for Messages<'_, M> {}

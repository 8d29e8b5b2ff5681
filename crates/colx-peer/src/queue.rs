//! Outbound message queue owned by the write pump.
//!
//! Messages go out FIFO in two classes. Immediate messages always drain
//! first; inventory is held back and flushed as `inv` batches on the trickle
//! timer.

use crate::KnownInventory;
use colx_wire::{InvVect, Message, MsgInv};
use rand::Rng;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::sync::oneshot;

/// Inventory vectors per trickled `inv` message.
pub const MAX_INV_TRICKLE_SIZE: usize = 1000;

/// A message waiting to be written, with its completion signal.
#[derive(Debug)]
pub struct QueuedMessage {
    pub message: Message,
    done: Option<oneshot::Sender<()>>,
}

impl QueuedMessage {
    pub fn new(message: Message, done: Option<oneshot::Sender<()>>) -> Self {
        Self { message, done }
    }

    /// Fire the completion signal. Consumes the entry so it fires once.
    pub fn complete(self) {
        if let Some(done) = self.done {
            let _ = done.send(());
        }
    }
}

/// Work handed from the public API to the write pump.
#[derive(Debug)]
pub enum Outbound {
    Message(QueuedMessage),
    Inventory(InvVect),
}

impl Outbound {
    pub(crate) fn complete(self) {
        if let Outbound::Message(queued) = self {
            queued.complete();
        }
    }
}

#[derive(Debug, Default)]
pub struct OutboundQueue {
    immediate: VecDeque<QueuedMessage>,
    trickled: VecDeque<QueuedMessage>,
    pending_inv: Vec<InvVect>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Outbound) {
        match item {
            Outbound::Message(queued) => self.immediate.push_back(queued),
            Outbound::Inventory(iv) => self.pending_inv.push(iv),
        }
    }

    /// Next message to write, immediate before trickled.
    pub fn pop(&mut self) -> Option<QueuedMessage> {
        self.immediate
            .pop_front()
            .or_else(|| self.trickled.pop_front())
    }

    /// Turn pending inventory into `inv` batches.
    ///
    /// Vectors the remote already knows, and repeats within the batch, are
    /// dropped. Everything batched is added to `known`.
    pub fn flush_trickle(&mut self, known: &mut KnownInventory) -> usize {
        if self.pending_inv.is_empty() {
            return 0;
        }

        let mut seen = HashSet::new();
        let mut batch = MsgInv::new();
        let mut flushed = 0;
        for iv in self.pending_inv.drain(..) {
            if known.contains(&iv) || !seen.insert(iv) {
                continue;
            }
            known.insert(iv);
            batch.inv_list.push(iv);
            flushed += 1;

            if batch.inv_list.len() >= MAX_INV_TRICKLE_SIZE {
                let full = std::mem::take(&mut batch);
                self.trickled
                    .push_back(QueuedMessage::new(Message::Inv(full), None));
            }
        }
        if !batch.inv_list.is_empty() {
            self.trickled
                .push_back(QueuedMessage::new(Message::Inv(batch), None));
        }
        flushed
    }

    pub fn is_empty(&self) -> bool {
        self.immediate.is_empty() && self.trickled.is_empty()
    }

    pub fn pending_inventory(&self) -> usize {
        self.pending_inv.len()
    }

    /// Remove every queued message so their signals can be fired.
    pub fn drain(&mut self) -> Vec<QueuedMessage> {
        self.pending_inv.clear();
        self.immediate.drain(..).chain(self.trickled.drain(..)).collect()
    }
}

/// Trickle interval for one peer: `base` plus up to 25% random jitter.
pub fn jittered_trickle_interval(base: Duration) -> Duration {
    let max_jitter = base.as_millis() as u64 / 4;
    if max_jitter == 0 {
        return base;
    }
    base + Duration::from_millis(rand::thread_rng().gen_range(0..=max_jitter))
}

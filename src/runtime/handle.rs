use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tokio::{
    sync::{Mutex, broadcast, mpsc, oneshot},
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};

use crate::{
    cart::{
        removal::RemovalToken,
        store::{CartError, CartSnapshotV1, CartStore, CartTotals},
    },
    line::{CartLine, LineDraft},
    op::{Op, StoredOp},
    persist::{OpSink, PersistError},
    types::{LineId, OpSeq},
};

use super::events::CartEvent;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("cart runtime channel closed")]
    ChannelClosed,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub flush_on_add: bool,
    pub batch_max_ops: usize,
    pub batch_max_latency_ms: u64,
    pub persist_queue_bound: usize,
    pub snapshot_every_ops: usize,
    pub compact_after_snapshot: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            flush_on_add: true,
            batch_max_ops: 32,
            batch_max_latency_ms: 75,
            persist_queue_bound: 64,
            snapshot_every_ops: 500,
            compact_after_snapshot: false,
        }
    }
}

#[derive(Clone)]
pub struct CartHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<CartEvent>,
}

enum Command {
    AddOrIncrement {
        draft: LineDraft,
        resp: oneshot::Sender<Result<CartLine, RuntimeError>>,
    },
    SetQuantity {
        id: LineId,
        quantity: i64,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Save {
        id: LineId,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Restore {
        id: LineId,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Remove {
        id: LineId,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    RequestRemoval {
        id: LineId,
        resp: oneshot::Sender<Result<RemovalToken, RuntimeError>>,
    },
    ConfirmRemoval {
        token: RemovalToken,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    CancelRemoval {
        token: RemovalToken,
        resp: oneshot::Sender<bool>,
    },
    Get {
        id: LineId,
        resp: oneshot::Sender<Option<CartLine>>,
    },
    Totals {
        resp: oneshot::Sender<Option<CartTotals>>,
    },
    Snapshot {
        resp: oneshot::Sender<CartSnapshotV1>,
    },
    Flush {
        resp: oneshot::Sender<Result<OpSeq, RuntimeError>>,
    },
    Checkpoint {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
}

enum PersistMsg {
    Op(StoredOp),
    Flush {
        resp: oneshot::Sender<Result<OpSeq, PersistError>>,
    },
    Checkpoint {
        snapshot: CartSnapshotV1,
        last_seq: OpSeq,
        compact: bool,
        resp: oneshot::Sender<Result<(), PersistError>>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

struct LoopState {
    store: CartStore,
    events_tx: broadcast::Sender<CartEvent>,
    persist_tx: Option<mpsc::Sender<PersistMsg>>,
    config: RuntimeConfig,
    ops_since_snapshot: usize,
    // Set when an accepted op never reached the persistence queue. No later op
    // is journaled until a snapshot covering the lost one has been written.
    journal_gap: bool,
}

/// Spawns the cart loop on the current tokio runtime.
///
/// With a `sink`, accepted ops are batched to a background persistence worker.
pub fn spawn_cart(store: CartStore, sink: Option<Box<dyn OpSink>>, config: RuntimeConfig) -> CartHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(256);
    let (events_tx, _) = broadcast::channel::<CartEvent>(1024);

    let (persist_tx, mut durable_rx) = if let Some(sink) = sink {
        let (persist_tx, persist_rx) = mpsc::channel::<PersistMsg>(config.persist_queue_bound.max(1));
        let (durable_tx, durable_rx) = mpsc::unbounded_channel::<Result<OpSeq, PersistError>>();
        spawn_persistence_worker(sink, persist_rx, durable_tx, config.clone());
        (Some(persist_tx), Some(durable_rx))
    } else {
        (None, None)
    };

    info!(
        active = store.active().len(),
        saved = store.saved().len(),
        persistent = persist_tx.is_some(),
        "cart runtime started"
    );

    let mut state = LoopState {
        store,
        events_tx: events_tx.clone(),
        persist_tx,
        config,
        ops_since_snapshot: 0,
        journal_gap: false,
    };

    tokio::spawn(async move {
        let mut durable_open = true;
        loop {
            if let Some(rx) = durable_rx.as_mut() {
                tokio::select! {
                    cmd = cmd_rx.recv() => {
                        let Some(cmd) = cmd else { break; };
                        if state.handle_command(cmd).await {
                            break;
                        }
                    }
                    durable = rx.recv(), if durable_open => {
                        match durable {
                            Some(Ok(op_seq)) => {
                                let _ = state.events_tx.send(CartEvent::DurableUpTo { op_seq });
                            }
                            Some(Err(err)) => warn!(%err, "cart journal append failed"),
                            None => durable_open = false,
                        }
                    }
                }
            } else {
                let Some(cmd) = cmd_rx.recv().await else { break; };
                if state.handle_command(cmd).await {
                    break;
                }
            }
        }
        info!("cart runtime stopped");
    });

    CartHandle { cmd_tx, events_tx }
}

impl CartHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events_tx.subscribe()
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    pub async fn add_or_increment(&self, draft: LineDraft) -> Result<CartLine, RuntimeError> {
        self.call(|resp| Command::AddOrIncrement { draft, resp }).await?
    }

    pub async fn set_quantity(&self, id: LineId, quantity: i64) -> Result<(), RuntimeError> {
        self.call(|resp| Command::SetQuantity { id, quantity, resp }).await?
    }

    pub async fn save(&self, id: LineId) -> Result<(), RuntimeError> {
        self.call(|resp| Command::Save { id, resp }).await?
    }

    pub async fn restore(&self, id: LineId) -> Result<(), RuntimeError> {
        self.call(|resp| Command::Restore { id, resp }).await?
    }

    pub async fn remove(&self, id: LineId) -> Result<(), RuntimeError> {
        self.call(|resp| Command::Remove { id, resp }).await?
    }

    pub async fn request_removal(&self, id: LineId) -> Result<RemovalToken, RuntimeError> {
        self.call(|resp| Command::RequestRemoval { id, resp }).await?
    }

    pub async fn confirm_removal(&self, token: RemovalToken) -> Result<(), RuntimeError> {
        self.call(|resp| Command::ConfirmRemoval { token, resp }).await?
    }

    pub async fn cancel_removal(&self, token: RemovalToken) -> Result<bool, RuntimeError> {
        self.call(|resp| Command::CancelRemoval { token, resp }).await
    }

    pub async fn get(&self, id: LineId) -> Result<Option<CartLine>, RuntimeError> {
        self.call(|resp| Command::Get { id, resp }).await
    }

    pub async fn totals(&self) -> Result<Option<CartTotals>, RuntimeError> {
        self.call(|resp| Command::Totals { resp }).await
    }

    pub async fn snapshot(&self) -> Result<CartSnapshotV1, RuntimeError> {
        self.call(|resp| Command::Snapshot { resp }).await
    }

    pub async fn flush(&self) -> Result<OpSeq, RuntimeError> {
        self.call(|resp| Command::Flush { resp }).await?
    }

    pub async fn checkpoint(&self) -> Result<(), RuntimeError> {
        self.call(|resp| Command::Checkpoint { resp }).await?
    }

    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.call(|resp| Command::Shutdown { resp }).await?
    }
}

impl LoopState {
    async fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::AddOrIncrement { draft, resp } => {
                let (line, _) = self.store.add_or_increment(draft);
                let res = self.publish_pending().await.map(|()| line);
                let _ = resp.send(res);
            }
            Command::SetQuantity { id, quantity, resp } => {
                let res = self.mutate(|store| store.set_quantity(id, quantity)).await;
                let _ = resp.send(res);
            }
            Command::Save { id, resp } => {
                let res = self.mutate(|store| store.save(id)).await;
                let _ = resp.send(res);
            }
            Command::Restore { id, resp } => {
                let res = self.mutate(|store| store.restore(id)).await;
                let _ = resp.send(res);
            }
            Command::Remove { id, resp } => {
                let res = self.mutate(|store| store.remove(id)).await;
                let _ = resp.send(res);
            }
            Command::RequestRemoval { id, resp } => {
                let res = self.store.request_removal(id).map_err(RuntimeError::from);
                let _ = resp.send(res);
            }
            Command::ConfirmRemoval { token, resp } => {
                let res = self.mutate(|store| store.confirm_removal(token)).await;
                let _ = resp.send(res);
            }
            Command::CancelRemoval { token, resp } => {
                let _ = resp.send(self.store.cancel_removal(token));
            }
            Command::Get { id, resp } => {
                let _ = resp.send(self.store.get(id).cloned());
            }
            Command::Totals { resp } => {
                let _ = resp.send(self.store.compute_totals());
            }
            Command::Snapshot { resp } => {
                let _ = resp.send(self.store.export_snapshot());
            }
            Command::Flush { resp } => {
                let out = match self.close_journal_gap().await {
                    Ok(()) => self.flush().await,
                    Err(err) => Err(err),
                };
                let _ = resp.send(out);
            }
            Command::Checkpoint { resp } => {
                let out = self.checkpoint().await;
                let _ = resp.send(out);
            }
            Command::Shutdown { resp } => {
                if let Err(err) = self.close_journal_gap().await {
                    warn!(%err, "cart journal gap left open at shutdown");
                }
                let out = match &self.persist_tx {
                    Some(tx) => {
                        let (done_tx, done_rx) = oneshot::channel();
                        if tx.send(PersistMsg::Shutdown { resp: done_tx }).await.is_err() {
                            Err(RuntimeError::ChannelClosed)
                        } else {
                            done_rx.await.map_err(|_| RuntimeError::ChannelClosed)
                        }
                    }
                    None => Ok(()),
                };
                let _ = resp.send(out);
                return true;
            }
        }

        false
    }

    async fn mutate(
        &mut self,
        op: impl FnOnce(&mut CartStore) -> Result<StoredOp, CartError>,
    ) -> Result<(), RuntimeError> {
        op(&mut self.store)?;
        self.publish_pending().await
    }

    async fn publish_pending(&mut self) -> Result<(), RuntimeError> {
        let ops = self.store.drain_pending_ops();
        let accepted = ops.len();
        let mut out = Ok(());

        // With a gap open these ops are covered by the gap snapshot instead.
        let journal_ops = !self.journal_gap;
        if !journal_ops && accepted > 0 {
            if let Err(err) = self.close_journal_gap().await {
                out = Err(err);
            }
        }

        for stored in ops {
            let events = events_for(&stored.op, &self.store);
            match &self.persist_tx {
                Some(tx) if journal_ops && !self.journal_gap => {
                    if let Err(err) = enqueue_persist(tx, stored) {
                        warn!(%err, "cart op not journaled; snapshot pending");
                        self.journal_gap = true;
                        out = Err(err);
                    }
                }
                Some(_) => {}
                None => {
                    let _ = self.events_tx.send(CartEvent::DurableUpTo {
                        op_seq: self.store.latest_op_seq(),
                    });
                }
            }
            for event in events {
                let _ = self.events_tx.send(event);
            }
        }

        self.ops_since_snapshot += accepted;
        self.maybe_auto_checkpoint().await;
        out
    }

    /// Writes a snapshot over ops that never reached the journal.
    async fn close_journal_gap(&mut self) -> Result<(), RuntimeError> {
        if !self.journal_gap {
            return Ok(());
        }
        self.checkpoint().await?;
        self.journal_gap = false;
        let op_seq = self.store.latest_op_seq();
        info!(op_seq, "cart journal gap closed by snapshot");
        let _ = self.events_tx.send(CartEvent::DurableUpTo { op_seq });
        Ok(())
    }

    async fn flush(&mut self) -> Result<OpSeq, RuntimeError> {
        let Some(tx) = &self.persist_tx else {
            return Ok(self.store.latest_op_seq());
        };
        let (flush_tx, flush_rx) = oneshot::channel();
        tx.send(PersistMsg::Flush { resp: flush_tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        flush_rx
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?
            .map_err(RuntimeError::from)
    }

    async fn checkpoint(&mut self) -> Result<(), RuntimeError> {
        let Some(tx) = &self.persist_tx else {
            return Ok(());
        };

        let snapshot = self.store.export_snapshot();
        let last_seq = self.store.latest_op_seq();
        let (cp_tx, cp_rx) = oneshot::channel();
        tx.send(PersistMsg::Checkpoint {
            snapshot,
            last_seq,
            compact: self.config.compact_after_snapshot,
            resp: cp_tx,
        })
        .await
        .map_err(|_| RuntimeError::ChannelClosed)?;

        cp_rx.await.map_err(|_| RuntimeError::ChannelClosed)??;
        self.ops_since_snapshot = 0;
        self.journal_gap = false;
        debug!(last_seq, "cart checkpoint written");
        Ok(())
    }

    async fn maybe_auto_checkpoint(&mut self) {
        if self.config.snapshot_every_ops == 0 || self.ops_since_snapshot < self.config.snapshot_every_ops {
            return;
        }
        if let Err(err) = self.checkpoint().await {
            warn!(%err, "automatic cart checkpoint failed");
        }
    }
}

fn events_for(op: &Op, store: &CartStore) -> Vec<CartEvent> {
    let quantity_of = |id: LineId| store.get(id).map(|l| l.quantity).unwrap_or_default();
    match op {
        Op::Add { line } => vec![CartEvent::LineAdded { id: line.id }],
        Op::Increment { id, from_saved } => {
            let mut out = Vec::with_capacity(2);
            if *from_saved {
                out.push(CartEvent::Restored { id: *id });
            }
            out.push(CartEvent::QuantityChanged {
                id: *id,
                quantity: quantity_of(*id),
            });
            out
        }
        Op::SetQuantity { id, quantity } => vec![CartEvent::QuantityChanged {
            id: *id,
            quantity: *quantity,
        }],
        Op::Save { id } => vec![CartEvent::Saved { id: *id }],
        Op::Restore { id } => vec![CartEvent::Restored { id: *id }],
        Op::Remove { line } => vec![CartEvent::Removed { id: line.id }],
    }
}

fn spawn_persistence_worker(
    sink: Box<dyn OpSink>,
    mut rx: mpsc::Receiver<PersistMsg>,
    durable_tx: mpsc::UnboundedSender<Result<OpSeq, PersistError>>,
    config: RuntimeConfig,
) {
    let sink = Arc::new(Mutex::new(sink));
    let latency = Duration::from_millis(config.batch_max_latency_ms);
    tokio::spawn(async move {
        let mut buf = Vec::<StoredOp>::new();
        let mut deadline = Instant::now() + latency;
        let mut last_durable: OpSeq = 0;

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else {
                        let _ = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await;
                        break;
                    };

                    match msg {
                        PersistMsg::Op(stored) => {
                            let is_add = matches!(stored.op, Op::Add { .. });
                            buf.push(stored);

                            if buf.len() >= config.batch_max_ops || (config.flush_on_add && is_add) {
                                let _ = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await;
                                deadline = Instant::now() + latency;
                            }
                        }
                        PersistMsg::Flush { resp } => {
                            let result = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await;
                            let _ = resp.send(result.map(|()| last_durable));
                            deadline = Instant::now() + latency;
                        }
                        PersistMsg::Checkpoint { snapshot, last_seq, compact, resp } => {
                            let result = match flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await {
                                Err(err) => Err(err),
                                Ok(()) => {
                                    let sink_ref = Arc::clone(&sink);
                                    tokio::task::spawn_blocking(move || {
                                        let mut sink = sink_ref.blocking_lock();
                                        sink.write_snapshot(&snapshot, last_seq)?;
                                        if compact {
                                            sink.compact_through(last_seq)?;
                                        }
                                        Result::<(), PersistError>::Ok(())
                                    })
                                    .await
                                    .unwrap_or_else(|e| Err(PersistError::Message(format!("join error: {e}"))))
                                }
                            };
                            let _ = resp.send(result);
                            deadline = Instant::now() + latency;
                        }
                        PersistMsg::Shutdown { resp } => {
                            let _ = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, true).await;
                            let _ = resp.send(());
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep_until(deadline), if !buf.is_empty() => {
                    let _ = flush_buf(&sink, &mut buf, &mut last_durable, &durable_tx, false).await;
                    deadline = Instant::now() + latency;
                }
            }
        }
    });
}

async fn flush_buf(
    sink: &Arc<Mutex<Box<dyn OpSink>>>,
    buf: &mut Vec<StoredOp>,
    last_durable: &mut OpSeq,
    durable_tx: &mpsc::UnboundedSender<Result<OpSeq, PersistError>>,
    call_flush: bool,
) -> Result<(), PersistError> {
    if buf.is_empty() {
        if call_flush {
            let sink_ref = Arc::clone(sink);
            tokio::task::spawn_blocking(move || {
                let mut sink = sink_ref.blocking_lock();
                sink.flush()
            })
            .await
            .map_err(|e| PersistError::Message(format!("join error: {e}")))??;
        }
        return Ok(());
    }

    let ops = std::mem::take(buf);
    let sink_ref = Arc::clone(sink);
    let append_res: Result<OpSeq, PersistError> = tokio::task::spawn_blocking(move || {
        let mut sink = sink_ref.blocking_lock();
        let seq = sink.append_ops(&ops)?;
        if call_flush {
            sink.flush()?;
        }
        Ok(seq)
    })
    .await
    .map_err(|e| PersistError::Message(format!("join error: {e}")))?;

    match append_res {
        Ok(seq) => {
            *last_durable = (*last_durable).max(seq);
            let _ = durable_tx.send(Ok(*last_durable));
            Ok(())
        }
        Err(err) => {
            let _ = durable_tx.send(Err(PersistError::Message(format!("append failed: {err}"))));
            Err(err)
        }
    }
}

fn enqueue_persist(tx: &mpsc::Sender<PersistMsg>, stored: StoredOp) -> Result<(), RuntimeError> {
    tx.try_send(PersistMsg::Op(stored))
        .map_err(|err| RuntimeError::Persist(PersistError::Message(format!("persist queue error: {err}"))))
}

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{Counter, Gauge, counter, gauge};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use user_api::OverflowPolicy;

use crate::config::SinkConfig;
use crate::message::SinkMessage;
use crate::writer::SinkWriter;

// ═══════════════════════════════════════════════════════════════
//  Metric names
// ═══════════════════════════════════════════════════════════════

pub const SINK_SUBMITTED_TOTAL: &str = "sink_messages_submitted_total";
pub const SINK_OVERFLOWED_TOTAL: &str = "sink_messages_overflowed_total";
pub const SINK_RENDERED_TOTAL: &str = "sink_messages_rendered_total";
pub const SINK_WRITE_ERRORS_TOTAL: &str = "sink_write_errors_total";
/// Gauge: overflow сообщения, ещё не дошедшие до bounded очереди.
pub const SINK_PENDING_OVERFLOW: &str = "sink_pending_overflow";

/// Значение label `sink`: тег без скобок, `[AUDIT]` → `audit`.
fn sink_label(tag: &str) -> String {
    tag.trim_matches(|c| c == '[' || c == ']').to_ascii_lowercase()
}

// ═══════════════════════════════════════════════════════════════
//  Stats
// ═══════════════════════════════════════════════════════════════

/// Локальные счётчики для [`SinkStats`] плюс handle'ы метрик,
/// разрешённые один раз при создании sink'а.
struct Counters {
    submitted: AtomicU64,
    fast_path: AtomicU64,
    overflowed: AtomicU64,
    pending_overflow: AtomicU64,
    rendered: AtomicU64,
    write_errors: AtomicU64,

    submitted_metric: Counter,
    overflowed_metric: Counter,
    rendered_metric: Counter,
    write_errors_metric: Counter,
    pending_metric: Gauge,
}

/// Снимок счётчиков sink'а.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Все вызовы `submit`.
    pub submitted: u64,
    /// Приняты неблокирующим try_send.
    pub fast_path: u64,
    /// Ушли по overflow пути.
    pub overflowed: u64,
    /// Overflow сообщения, ещё не попавшие в bounded очередь
    /// (detached send ждёт места, либо лежат в spill очереди).
    pub pending_overflow: u64,
    /// Успешно отрендерены writer'ом.
    pub rendered: u64,
    pub write_errors: u64,
}

impl Counters {
    fn new(tag: &str) -> Self {
        let sink = sink_label(tag);
        Self {
            submitted: AtomicU64::new(0),
            fast_path: AtomicU64::new(0),
            overflowed: AtomicU64::new(0),
            pending_overflow: AtomicU64::new(0),
            rendered: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            submitted_metric: counter!(SINK_SUBMITTED_TOTAL, "sink" => sink.clone()),
            overflowed_metric: counter!(SINK_OVERFLOWED_TOTAL, "sink" => sink.clone()),
            rendered_metric: counter!(SINK_RENDERED_TOTAL, "sink" => sink.clone()),
            write_errors_metric: counter!(SINK_WRITE_ERRORS_TOTAL, "sink" => sink.clone()),
            pending_metric: gauge!(SINK_PENDING_OVERFLOW, "sink" => sink),
        }
    }

    fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        self.submitted_metric.increment(1);
    }

    fn record_overflow(&self) {
        self.overflowed.fetch_add(1, Ordering::Relaxed);
        self.overflowed_metric.increment(1);
        self.pending_overflow.fetch_add(1, Ordering::Relaxed);
        self.pending_metric.increment(1.0);
    }

    /// Overflow сообщение покинуло pending: попало в bounded очередь,
    /// вынуто из spill очереди или признано недоставляемым.
    fn settle_overflow(&self) {
        self.pending_metric.decrement(1.0);
        self.pending_overflow.fetch_sub(1, Ordering::Relaxed);
    }

    // Метрика раньше атомика: кто дождался `stats()`, видит и метрику.
    fn record_rendered(&self) {
        self.rendered_metric.increment(1);
        self.rendered.fetch_add(1, Ordering::Relaxed);
    }

    fn record_write_error(&self) {
        self.write_errors_metric.increment(1);
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SinkStats {
        SinkStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            fast_path: self.fast_path.load(Ordering::Relaxed),
            overflowed: self.overflowed.load(Ordering::Relaxed),
            pending_overflow: self.pending_overflow.load(Ordering::Relaxed),
            rendered: self.rendered.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  AsyncSink
// ═══════════════════════════════════════════════════════════════

/// Bounded очередь + один consumer, рендерящий сообщения по порядку.
///
/// Consumer живёт на blocking pool runtime'а: `SinkWriter` синхронный,
/// и медленный writer не должен занимать async worker'ов.
///
/// `submit` сначала пробует `try_send`. Если очередь полна, сообщение
/// уходит по overflow пути согласно [`OverflowPolicy`]: вызывающий не
/// блокируется, сообщение не теряется, но порядок относительно более
/// поздних fast-path сообщений не гарантируется. Память под overflow
/// backlog не ограничена.
///
/// Явного shutdown нет. Когда последний handle sink'а (и все pending
/// overflow send'ы) освобождены, очередь закрывается, consumer
/// дорендеривает буфер и завершается.
pub struct AsyncSink {
    tag: Arc<str>,
    tx: mpsc::Sender<SinkMessage>,
    spill_tx: Option<mpsc::UnboundedSender<SinkMessage>>,
    overflow: OverflowPolicy,
    counters: Arc<Counters>,
    runtime: Handle,
    consumer: JoinHandle<()>,
}

impl std::fmt::Debug for AsyncSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncSink")
            .field("tag", &self.tag)
            .field("overflow", &self.overflow)
            .field("stats", &self.counters.snapshot())
            .finish_non_exhaustive()
    }
}

impl AsyncSink {
    /// Создать sink и запустить его consumer.
    ///
    /// Должен вызываться внутри tokio runtime: handle runtime'а
    /// запоминается, чтобы `submit` работал из любого потока.
    pub fn new(
        tag: impl Into<String>,
        capacity: usize,
        overflow: OverflowPolicy,
        writer: Arc<dyn SinkWriter>,
    ) -> Self {
        let tag: Arc<str> = Arc::from(tag.into());
        let capacity = if capacity == 0 {
            tracing::warn!(sink = %tag, "zero capacity requested, using 1");
            1
        } else {
            capacity
        };

        let (tx, rx) = mpsc::channel(capacity);
        let (spill_tx, spill_rx) = mpsc::unbounded_channel();
        // Без spill политики sender сразу дропается, и ветка spill в
        // consumer'е отключается после первого None.
        let spill_tx = match overflow {
            OverflowPolicy::Spill => Some(spill_tx),
            OverflowPolicy::BackPressure => None,
        };

        let counters = Arc::new(Counters::new(&tag));
        let runtime = Handle::current();
        let consumer = {
            let consumer_rt = runtime.clone();
            let tag = tag.clone();
            let counters = counters.clone();
            runtime.spawn_blocking(move || {
                consumer_rt.block_on(run_consumer(tag, rx, spill_rx, writer, counters))
            })
        };

        tracing::info!(sink = %tag, capacity, %overflow, "sink started");

        Self {
            tag,
            tx,
            spill_tx,
            overflow,
            counters,
            runtime,
            consumer,
        }
    }

    /// Создать sink из конфига с writer'ом из `config.writer`.
    pub fn from_config(tag: impl Into<String>, config: &SinkConfig) -> Self {
        Self::new(tag, config.buffer, config.overflow, config.writer.build())
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow
    }

    /// Поставить сообщение в очередь. Никогда не блокирует и не падает.
    ///
    /// Время сообщения фиксируется здесь, до попытки enqueue.
    pub fn submit(&self, text: impl Into<String>, producer_id: u64) {
        let msg = SinkMessage::new(text, producer_id);
        self.counters.record_submitted();

        match self.tx.try_send(msg) {
            Ok(()) => {
                self.counters.fast_path.fetch_add(1, Ordering::Relaxed);
            }
            Err(mpsc::error::TrySendError::Full(msg)) => self.submit_overflow(msg),
            Err(mpsc::error::TrySendError::Closed(msg)) => self.report_undeliverable(&msg),
        }
    }

    fn submit_overflow(&self, msg: SinkMessage) {
        self.counters.record_overflow();

        match &self.spill_tx {
            Some(spill) => {
                if let Err(mpsc::error::SendError(msg)) = spill.send(msg) {
                    self.counters.settle_overflow();
                    self.report_undeliverable(&msg);
                }
            }
            None => {
                let tx = self.tx.clone();
                let counters = self.counters.clone();
                let tag = self.tag.clone();
                self.runtime.spawn(async move {
                    let result = tx.send(msg).await;
                    counters.settle_overflow();
                    if let Err(mpsc::error::SendError(msg)) = result {
                        tracing::error!(
                            sink = %tag,
                            line = %msg.render(&tag),
                            "consumer stopped during overflow send, message undeliverable"
                        );
                    }
                });
            }
        }
    }

    fn report_undeliverable(&self, msg: &SinkMessage) {
        tracing::error!(
            sink = %self.tag,
            line = %msg.render(&self.tag),
            "consumer stopped, message undeliverable"
        );
    }

    pub fn stats(&self) -> SinkStats {
        self.counters.snapshot()
    }

    /// `false` если consumer завершился: дальше sink ничего не
    /// рендерит. Это надо мониторить снаружи, `submit` об этом не сообщает.
    pub fn is_consumer_alive(&self) -> bool {
        !self.consumer.is_finished()
    }
}

/// Consumer: крутится через `Handle::block_on` на blocking потоке,
/// по одному сообщению из bounded очереди (приоритетно) или
/// spill очереди, рендер через writer.
async fn run_consumer(
    tag: Arc<str>,
    mut rx: mpsc::Receiver<SinkMessage>,
    mut spill_rx: mpsc::UnboundedReceiver<SinkMessage>,
    writer: Arc<dyn SinkWriter>,
    counters: Arc<Counters>,
) {
    loop {
        let msg = tokio::select! {
            biased;

            Some(msg) = rx.recv() => msg,
            Some(msg) = spill_rx.recv() => {
                counters.settle_overflow();
                msg
            }
            else => break,
        };

        let line = msg.render(&tag);
        match writer.write_line(&line) {
            Ok(()) => counters.record_rendered(),
            Err(e) => {
                counters.record_write_error();
                tracing::error!(sink = %tag, error = %e, %line, "write error");
            }
        }
    }
    tracing::info!(sink = %tag, "consumer stopped");
}

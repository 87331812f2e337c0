//! Application service, the hexagonal core.
//!
//! [`Controller`] owns the configuration store, the effect engine and the
//! command engine.  Interrupt-side state lives in [`Shared`] and is lent
//! to each call; storage, the serial transmitter and the event sink come
//! in through port traits, so the whole loop runs on the host with mocks.
//!
//! ```text
//!  rx ring ──▶ ┌──────────────────────────┐ ──▶ Outbox (tx ring)
//!              │        Controller        │
//! StoragePort ◀│ Store · Effects · Engine │──▶ EventSink
//!              └────────────┬─────────────┘
//!                           ▼
//!                  Shared::duties (→ PWM)
//! ```

use log::{debug, info, warn};

use crate::config::CHECK_PERIOD;
use crate::effects::{DutyCycles, EffectEngine};
use crate::protocol::{CommandEngine, CommandHandler, Dispatch};
use crate::ring::Consumer;
use crate::serial::Outbox;
use crate::shared::Shared;
use crate::store::ConfigStore;
use crate::tick::StopwatchId;

use super::commands::{Command, Reply, Status};
use super::events::AppEvent;
use super::ports::{EventSink, SerialTx, StoragePort};

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

pub struct Controller<S: StoragePort> {
    store: ConfigStore<S>,
    effects: EffectEngine,
    engine: CommandEngine,
}

impl<S: StoragePort> Controller<S> {
    /// Construct around a storage adapter.
    ///
    /// Nothing is loaded yet; call [`start`](Self::start) next.
    pub fn new(storage: S) -> Self {
        Self {
            store: ConfigStore::new(storage),
            effects: EffectEngine::new(),
            engine: CommandEngine::new(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load the persisted record and make it active.
    pub fn start(&mut self, shared: &Shared, sink: &mut impl EventSink) {
        self.store.load();
        sink.emit(&AppEvent::StorageLoaded);
        promote(&mut self.store, &mut self.effects, shared, sink);
        shared.ticks.reset(StopwatchId::Check);
        sink.emit(&AppEvent::Started);
        info!(
            "Controller started: breakpoint={} dimmer={:?}",
            self.effects.breakpoint(),
            self.effects.dimmer()
        );
    }

    // ── Main-loop pass ────────────────────────────────────────

    /// One main-loop iteration: dispatch at most one command, run the
    /// coarse selection when due, then publish fresh duty cycles.
    pub fn run_once<const N: usize, const M: usize>(
        &mut self,
        shared: &Shared,
        rx: &mut Consumer<'_, N>,
        outbox: &mut Outbox<'_, '_, M>,
        port: &mut impl SerialTx,
        sink: &mut impl EventSink,
    ) -> DutyCycles {
        // 1. Serial commands
        let mut executor = Executor {
            store: &mut self.store,
            effects: &mut self.effects,
            shared,
            sink: &mut *sink,
        };
        let dispatch = self
            .engine
            .poll(rx, &mut executor, |bytes| outbox.send(bytes, port));
        match dispatch {
            Dispatch::Idle => {}
            Dispatch::Executed(opcode) => {
                debug!("command '{}' executed", opcode as u8 as char);
                sink.emit(&AppEvent::CommandExecuted(opcode));
            }
            Dispatch::Rejected(error) => {
                sink.emit(&AppEvent::FramingError(error));
            }
        }

        // 2. Coarse selection
        let ticks = &shared.ticks;
        if ticks.elapsed(StopwatchId::Check) > CHECK_PERIOD {
            if shared.rpm.check_stale(ticks) {
                sink.emit(&AppEvent::SignalLost);
            }
            self.effects
                .select(shared.rpm.rpm(), self.store.active(), ticks, sink);
            ticks.reset(StopwatchId::Check);
        }

        // 3. Per-pass values
        let rpm = shared.rpm.rpm();
        let starter_before = self.effects.starter_on();
        let duties = self.effects.compute(rpm, self.store.active(), ticks);
        if self.effects.starter_on() != starter_before {
            sink.emit(&AppEvent::StarterChanged {
                enabled: self.effects.starter_on(),
                rpm,
            });
        }
        shared.duties.set_pending(duties);
        duties
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn store(&self) -> &ConfigStore<S> {
        &self.store
    }

    pub fn effects(&self) -> &EffectEngine {
        &self.effects
    }

    /// Whether unknown opcodes are echoed back.
    pub fn echo_unknown(&self) -> bool {
        self.engine.echo_unknown()
    }
}

// ───────────────────────────────────────────────────────────────
// Command execution
// ───────────────────────────────────────────────────────────────

/// Borrowed view of the controller used while the command engine is
/// mutably borrowed.
struct Executor<'a, S: StoragePort, K: EventSink> {
    store: &'a mut ConfigStore<S>,
    effects: &'a mut EffectEngine,
    shared: &'a Shared,
    sink: &'a mut K,
}

impl<S: StoragePort, K: EventSink> CommandHandler for Executor<'_, S, K> {
    fn execute(&mut self, command: &Command) -> Reply {
        match command {
            Command::Save => {
                self.store.save();
                self.sink.emit(&AppEvent::StorageSaved);
            }
            Command::Read => {
                self.store.load();
                self.sink.emit(&AppEvent::StorageLoaded);
            }
            Command::LoadCache(record) => *self.store.cache_mut() = *record,
            Command::GetCache => return Reply::Data(*self.store.cache()),
            Command::Promote => promote(self.store, self.effects, self.shared, self.sink),
            Command::LoadDemo => self.store.cache_mut().apply_demo(),
            // Answered by the command engine itself.
            Command::SetEcho(_) => {}
        }
        Reply::Status(Status::Ok)
    }
}

/// Copy cache → active and re-derive everything that depends on it, with
/// interrupts held off so the tick path never sees a mixed state.
fn promote<S: StoragePort>(
    store: &mut ConfigStore<S>,
    effects: &mut EffectEngine,
    shared: &Shared,
    sink: &mut impl EventSink,
) {
    let active = critical_section::with(|_| {
        let active = *store.promote();
        effects.resync(&active);
        shared.rpm.set_filter_step(active.filter_step);
        active
    });

    sink.emit(&AppEvent::Promoted {
        breakpoint: active.active_breakpoint,
        dimmer: active.active_dimmer,
        dimmer_enabled: active.dimmer_enabled,
    });
    if let Some(index) = active.first_unordered_breakpoint() {
        warn!("breakpoint {} is below its predecessor", index);
        sink.emit(&AppEvent::UnorderedBreakpoints { index });
    }
}

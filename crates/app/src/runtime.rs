use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use anyhow::Context;
use stenod_chord::Chord;
use stenod_dict::{load_json_file, Dictionary};
use stenod_foundation::{AppState, StateManager};
use stenod_machine::{
    ChordQueue, ChordSource, GeminiMachine, MachineConfig, MachineError, SerialPort,
    SessionEvent, StenturaClient, Transport,
};
use stenod_translate::{Engine, EngineStats, Sink, DELETE};

use crate::cli::{Args, Protocol};

/// Demo sink: types to stdout, rendering each delete as
/// backspace-space-backspace so retraction is visible in a terminal.
pub struct StdoutSink {
    out: io::Stdout,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for StdoutSink {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut out = self.out.lock();
        for &byte in bytes {
            if byte == DELETE {
                out.write_all(b"\x08 \x08")?;
            } else {
                out.write_all(&[byte])?;
            }
        }
        out.flush()
    }
}

/// Load every dictionary file named on the command line, in order.
pub fn load_dictionaries(args: &Args) -> anyhow::Result<Dictionary> {
    let mut dict = Dictionary::new();
    for path in &args.dictionaries {
        load_json_file(&mut dict, path)
            .with_context(|| format!("loading dictionary {}", path.display()))?;
    }
    tracing::info!(entries = dict.len(), "dictionaries ready");
    Ok(dict)
}

/// Shutdown handle for a started machine. The chord source itself moves
/// into the driver thread; this stays with the main task.
pub enum Machine {
    Stenura(StenturaClient),
    Gemini(Arc<AtomicBool>),
}

impl Machine {
    /// Open the device and start the selected protocol. Returns the
    /// chord source for the driver plus the shutdown handle.
    pub fn open(args: &Args) -> anyhow::Result<(Box<dyn ChordSource>, Machine)> {
        let port = SerialPort::open(&args.device, args.baud)
            .with_context(|| format!("opening {}", args.device.display()))?;
        let transport: Arc<dyn Transport> = Arc::new(port);

        match args.protocol {
            Protocol::Stenura => {
                let config = MachineConfig {
                    baud: args.baud,
                    ..MachineConfig::default()
                };
                let mut client = StenturaClient::new(transport, config);
                client.start().context("starting Stenura session")?;
                let source = Box::new(QueueSource(client.chord_queue()));
                Ok((source, Machine::Stenura(client)))
            }
            Protocol::Gemini => {
                let machine = GeminiMachine::new(transport);
                let stop = machine.stop_handle();
                Ok((Box::new(machine), Machine::Gemini(stop)))
            }
        }
    }

    /// Take the Stentura session-event stream, if this machine has one.
    pub fn session_events(&mut self) -> Option<mpsc::Receiver<SessionEvent>> {
        match self {
            Machine::Stenura(client) => client.session_events(),
            Machine::Gemini(_) => None,
        }
    }

    pub fn stop(self) {
        match self {
            Machine::Stenura(mut client) => client.stop(),
            Machine::Gemini(stop) => stop.store(true, Ordering::SeqCst),
        }
    }
}

/// Folds protocol-client session events into the daemon lifecycle:
/// reconnect attempts show up as `Reconnecting`, recovery returns the
/// state to `Running`. Exits when the client drops its sender.
pub fn spawn_session_monitor(
    state: Arc<StateManager>,
    events: mpsc::Receiver<SessionEvent>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("session-monitor".to_string())
        .spawn(move || {
            for event in events {
                let result = match event {
                    SessionEvent::Reconnecting { attempt, reason } => {
                        state.transition(AppState::Reconnecting { attempt, reason })
                    }
                    SessionEvent::Reconnected => state.transition(AppState::Running),
                };
                // During shutdown the transition is no longer legal;
                // that is fine, the event is stale.
                if let Err(e) = result {
                    tracing::debug!(error = %e, "session event ignored");
                }
            }
        })
}

/// Consumer side of the Stentura chord queue.
struct QueueSource(Arc<ChordQueue>);

impl ChordSource for QueueSource {
    fn read(&mut self) -> Result<Option<Chord>, MachineError> {
        Ok(self.0.pop())
    }
}

/// The translation driver thread: pops chords and feeds the engine until
/// the source ends.
pub struct Driver {
    handle: JoinHandle<()>,
    pub stats: Arc<EngineStats>,
}

impl Driver {
    pub fn spawn<S: Sink + Send + 'static>(
        dict: Dictionary,
        sink: S,
        mut source: Box<dyn ChordSource>,
    ) -> io::Result<Self> {
        let mut engine = Engine::new(dict, sink);
        let stats = engine.stats();
        let handle = thread::Builder::new()
            .name("translation-driver".to_string())
            .spawn(move || loop {
                match source.read() {
                    Ok(Some(chord)) => {
                        if let Err(e) = engine.process(chord) {
                            tracing::error!(error = %e, "sink write failed");
                        }
                    }
                    Ok(None) => {
                        tracing::info!("chord stream ended");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "machine read failed");
                        break;
                    }
                }
            })?;
        Ok(Self { handle, stats })
    }

    pub fn join(self) {
        let _ = self.handle.join();
    }
}

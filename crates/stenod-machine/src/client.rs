use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use stenod_chord::Chord;
use stenod_foundation::{real_clock, SharedClock};

use crate::error::MachineError;
use crate::protocol::{Action, Request, Response, RESPONSE_HEADER_LEN, SOH};
use crate::queue::{ChordQueue, DEFAULT_QUEUE_CAPACITY};
use crate::source::ChordSource;
use crate::stroke::{decode_stenura, STENURA_FRAME_LEN};
use crate::transport::Transport;

/// Stentura block size; READC reads are addressed block/offset.
const BLOCK_SIZE: u32 = 512;

/// Name of the device file exposing newly pressed strokes.
const REALTIME_FILE: &[u8] = b"REALTIME.000";

/// Consecutive failed realtime reads before the poller declares the
/// session dead and reopens it.
const MAX_READ_FAILURES: u32 = 3;

/// Session health, emitted by the poller and consumed by the daemon's
/// lifecycle monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Consecutive realtime reads failed; the realtime file is being
    /// reopened.
    Reconnecting { attempt: u32, reason: String },
    /// A reopen succeeded and polling resumed.
    Reconnected,
}

#[derive(Debug, Clone)]
pub struct MachineConfig {
    pub baud: u32,
    pub retry_interval: Duration,
    pub max_tries: u32,
    pub poll_interval: Duration,
    pub queue_capacity: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            baud: 9600,
            retry_interval: Duration::from_secs(2),
            max_tries: 3,
            poll_interval: Duration::from_millis(100),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

type ResponseCallback = Box<dyn FnOnce(Response) + Send>;
type TimeoutCallback = Box<dyn FnOnce() + Send>;

/// A request awaiting its response. `sent_at` is the first transmission;
/// the retry threshold grows with each try, giving the backoff ramp.
struct Pending {
    seq: u8,
    frame: Vec<u8>,
    sent_at: Instant,
    tries: u32,
    on_response: Option<ResponseCallback>,
    on_timeout: Option<TimeoutCallback>,
}

struct Shared {
    transport: Arc<dyn Transport>,
    pending: Mutex<Vec<Pending>>,
    write_lock: Mutex<()>,
    seq: AtomicU8,
    stop: AtomicBool,
    clock: SharedClock,
    config: MachineConfig,
    events: Mutex<mpsc::Sender<SessionEvent>>,
}

struct SyncEvent {
    slot: Mutex<Option<Result<Response, MachineError>>>,
    cond: Condvar,
}

impl Shared {
    fn next_seq(&self) -> u8 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Register the pending entry, then put the frame on the wire. All
    /// writes to the shared descriptor go through the write lock so
    /// frames from different threads never interleave.
    fn send_request(
        &self,
        request: Request,
        on_response: ResponseCallback,
        on_timeout: TimeoutCallback,
    ) -> Result<(), MachineError> {
        let frame = request.encode();
        self.pending.lock().push(Pending {
            seq: request.seq,
            frame: frame.clone(),
            sent_at: self.clock.now(),
            tries: 1,
            on_response: Some(on_response),
            on_timeout: Some(on_timeout),
        });

        let result = {
            let _guard = self.write_lock.lock();
            self.transport.write_all(&frame)
        };
        if let Err(e) = result {
            self.pending.lock().retain(|m| m.seq != request.seq);
            return Err(e.into());
        }
        Ok(())
    }

    /// Send and block for the response. The reader thread fulfils the
    /// event; the retrier thread fails it after the retry budget.
    fn send_request_sync(
        &self,
        action: Action,
        params: [u16; 5],
        data: Option<Vec<u8>>,
    ) -> Result<Response, MachineError> {
        let mut request = Request::new(self.next_seq(), action, params);
        if let Some(data) = data {
            request = request.with_data(data);
        }

        let event = Arc::new(SyncEvent {
            slot: Mutex::new(None),
            cond: Condvar::new(),
        });

        let on_response = {
            let event = Arc::clone(&event);
            Box::new(move |response: Response| {
                *event.slot.lock() = Some(Ok(response));
                event.cond.notify_all();
            })
        };
        let on_timeout = {
            let event = Arc::clone(&event);
            Box::new(move || {
                *event.slot.lock() = Some(Err(MachineError::Timeout));
                event.cond.notify_all();
            })
        };
        self.send_request(request, on_response, on_timeout)?;

        let mut slot = event.slot.lock();
        loop {
            if let Some(result) = slot.take() {
                return result;
            }
            if self.stopped() {
                return Err(MachineError::Closed);
            }
            let _ = event.cond.wait_for(&mut slot, Duration::from_millis(200));
        }
    }

    /// READC for the realtime file at an absolute byte offset.
    fn read_block(&self, offset: u32) -> Result<Response, MachineError> {
        let block = (offset / BLOCK_SIZE) as u16;
        let byte = (offset % BLOCK_SIZE) as u16;
        self.send_request_sync(
            Action::ReadC,
            [1, 1, BLOCK_SIZE as u16, block, byte],
            None,
        )
    }

    /// Open the realtime file and advance past whatever the machine
    /// already buffered. Returns the offset polling continues from.
    /// Used at session start and again by the poller when it reopens a
    /// dead session.
    fn open_session(&self) -> Result<u32, MachineError> {
        let open = self.send_request_sync(
            Action::Open,
            [b'A' as u16, 0, 0, 0, 0],
            Some(REALTIME_FILE.to_vec()),
        )?;
        if open.error != 0 {
            tracing::warn!(error = open.error, "OPEN reported a device error");
        }

        let mut offset = 0u32;
        loop {
            let response = self.read_block(offset)?;
            offset += response.p1 as u32;
            if response.data.is_none() {
                return Ok(offset);
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.lock().send(event);
    }
}

/// Serial client for the Stenura protocol. Three worker threads share
/// the transport: a reader matching responses to pending requests, a
/// retrier re-emitting unanswered frames, and a poller converting
/// realtime-file reads into chords on the outbound queue.
pub struct StenturaClient {
    shared: Arc<Shared>,
    chords: Arc<ChordQueue>,
    events_rx: Option<mpsc::Receiver<SessionEvent>>,
    workers: Vec<JoinHandle<()>>,
}

impl StenturaClient {
    pub fn new(transport: Arc<dyn Transport>, config: MachineConfig) -> Self {
        Self::with_clock(transport, config, real_clock())
    }

    pub fn with_clock(
        transport: Arc<dyn Transport>,
        config: MachineConfig,
        clock: SharedClock,
    ) -> Self {
        let capacity = config.queue_capacity;
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            shared: Arc::new(Shared {
                transport,
                pending: Mutex::new(Vec::new()),
                write_lock: Mutex::new(()),
                seq: AtomicU8::new(0),
                stop: AtomicBool::new(false),
                clock,
                config,
                events: Mutex::new(events_tx),
            }),
            chords: Arc::new(ChordQueue::new(capacity)),
            events_rx: Some(events_rx),
            workers: Vec::new(),
        }
    }

    /// Bring the session up: open the realtime file, skip whatever the
    /// machine already buffered, and start the polling loop.
    pub fn start(&mut self) -> Result<(), MachineError> {
        self.spawn_reader()?;
        self.spawn_retrier()?;

        let offset = self.shared.open_session()?;
        tracing::info!(offset, "session open, starting realtime poll");
        self.spawn_poller(offset)?;
        Ok(())
    }

    /// Take the session-event receiver, once. The daemon's lifecycle
    /// monitor consumes it to track reconnects.
    pub fn session_events(&mut self) -> Option<mpsc::Receiver<SessionEvent>> {
        self.events_rx.take()
    }

    /// Request shutdown and join the worker threads. The chord queue is
    /// closed so the consumer drains and sees the end of the stream.
    pub fn stop(&mut self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        self.chords.close();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }

    pub fn chord_queue(&self) -> Arc<ChordQueue> {
        Arc::clone(&self.chords)
    }

    fn spawn_reader(&mut self) -> Result<(), MachineError> {
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("stenura-reader".to_string())
            .spawn(move || reader_loop(&shared))?;
        self.workers.push(handle);
        Ok(())
    }

    fn spawn_retrier(&mut self) -> Result<(), MachineError> {
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("stenura-retrier".to_string())
            .spawn(move || retrier_loop(&shared))?;
        self.workers.push(handle);
        Ok(())
    }

    fn spawn_poller(&mut self, offset: u32) -> Result<(), MachineError> {
        let shared = Arc::clone(&self.shared);
        let chords = Arc::clone(&self.chords);
        let handle = thread::Builder::new()
            .name("stenura-poller".to_string())
            .spawn(move || poller_loop(&shared, &chords, offset))?;
        self.workers.push(handle);
        Ok(())
    }
}

impl ChordSource for StenturaClient {
    fn read(&mut self) -> Result<Option<Chord>, MachineError> {
        Ok(self.chords.pop())
    }
}

impl Drop for StenturaClient {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Blocks reading whole response packets and dispatches each to its
/// pending request by sequence number.
fn reader_loop(shared: &Shared) {
    while !shared.stopped() {
        let mut byte = [0u8; 1];
        match shared.transport.read(&mut byte) {
            Ok(0) => continue,
            Ok(_) => {}
            Err(e) => {
                if shared.stopped() {
                    break;
                }
                tracing::warn!(error = %e, "reader failed, retrying");
                continue;
            }
        }
        if byte[0] != SOH {
            continue;
        }

        let mut header = [0u8; RESPONSE_HEADER_LEN];
        header[0] = SOH;
        if !read_full(shared, &mut header[1..]) {
            break;
        }

        let (mut response, trailing) = match Response::decode_header(&header) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed response");
                continue;
            }
        };
        if trailing > 0 {
            let mut section = vec![0u8; trailing];
            if !read_full(shared, &mut section) {
                break;
            }
            if let Err(e) = response.attach_data(&section) {
                tracing::warn!(error = %e, "dropping response with bad data CRC");
                continue;
            }
        }

        let callback = {
            let mut pending = shared.pending.lock();
            match pending.iter().position(|m| m.seq == response.seq) {
                Some(index) => pending.remove(index).on_response.take(),
                None => {
                    let e = MachineError::UnmatchedSeq(response.seq);
                    tracing::warn!(error = %e, "dropping response");
                    None
                }
            }
        };
        if let Some(callback) = callback {
            callback(response);
        }
    }
}

fn read_full(shared: &Shared, buf: &mut [u8]) -> bool {
    let mut filled = 0;
    while filled < buf.len() {
        if shared.stopped() {
            return false;
        }
        match shared.transport.read(&mut buf[filled..]) {
            Ok(0) => continue,
            Ok(n) => filled += n,
            Err(e) => {
                tracing::warn!(error = %e, "read failed mid-packet");
                return false;
            }
        }
    }
    true
}

/// Re-emits unanswered requests. A message is resent when its age
/// exceeds `tries x retry_interval`; after the retry budget the timeout
/// callback fires once and the message is dropped.
fn retrier_loop(shared: &Shared) {
    let retry_interval = shared.config.retry_interval;
    let max_tries = shared.config.max_tries;

    while !shared.stopped() {
        let now = shared.clock.now();
        let mut resend = Vec::new();
        let mut timeouts = Vec::new();
        let mut next_deadline: Option<Instant> = None;
        {
            let mut pending = shared.pending.lock();
            let mut index = 0;
            while index < pending.len() {
                let message = &mut pending[index];
                let deadline = message.sent_at + retry_interval * message.tries;
                if now >= deadline {
                    if message.tries < max_tries {
                        message.tries += 1;
                        resend.push(message.frame.clone());
                        let next = message.sent_at + retry_interval * message.tries;
                        next_deadline = Some(next_deadline.map_or(next, |d| d.min(next)));
                        index += 1;
                    } else {
                        let mut message = pending.remove(index);
                        tracing::warn!(seq = message.seq, "request exhausted its retries");
                        if let Some(callback) = message.on_timeout.take() {
                            timeouts.push(callback);
                        }
                    }
                } else {
                    next_deadline = Some(next_deadline.map_or(deadline, |d| d.min(deadline)));
                    index += 1;
                }
            }
        }

        for frame in resend {
            let _guard = shared.write_lock.lock();
            if let Err(e) = shared.transport.write_all(&frame) {
                tracing::warn!(error = %e, "retry write failed");
            }
        }
        for callback in timeouts {
            callback();
        }

        // Sleep to the nearest upcoming deadline, bounded so the stop
        // flag is observed promptly.
        let sleep = next_deadline
            .map(|deadline| deadline.saturating_duration_since(shared.clock.now()))
            .unwrap_or(retry_interval)
            .clamp(Duration::from_millis(5), Duration::from_millis(250));
        shared.clock.sleep(sleep);
    }
}

/// Polls the realtime file and demultiplexes stroke payloads onto the
/// chord queue. After enough consecutive dead reads the session is
/// declared lost and reopened in place, with health events emitted for
/// the daemon's lifecycle monitor.
fn poller_loop(shared: &Shared, chords: &ChordQueue, start_offset: u32) {
    let mut offset = start_offset;
    let mut failures = 0u32;
    let mut attempt = 0u32;
    let mut last_error = String::new();

    while !shared.stopped() {
        shared.clock.sleep(shared.config.poll_interval);
        if shared.stopped() {
            break;
        }

        match shared.read_block(offset) {
            Ok(response) if response.error != 0 => {
                tracing::warn!(error = response.error, "device reported read error");
                failures += 1;
                last_error = format!("device error {}", response.error);
            }
            Ok(response) => {
                failures = 0;
                // A good read after a failed reopen still means the
                // machine is back.
                if attempt > 0 {
                    attempt = 0;
                    shared.emit(SessionEvent::Reconnected);
                }
                offset += response.p1 as u32;
                let Some(data) = response.data else {
                    continue;
                };
                for frame in data.chunks_exact(STENURA_FRAME_LEN) {
                    let frame: &[u8; STENURA_FRAME_LEN] =
                        frame.try_into().expect("chunks_exact yields full frames");
                    let chord = decode_stenura(frame);
                    if chord.is_empty() {
                        tracing::trace!("skipping empty stroke frame");
                        continue;
                    }
                    tracing::debug!(%chord, "stroke from machine");
                    if !chords.push(chord) {
                        return;
                    }
                }
            }
            Err(MachineError::Closed) => break,
            Err(e) => {
                tracing::warn!(offset, error = %e, "realtime read failed");
                failures += 1;
                last_error = e.to_string();
            }
        }

        if failures >= MAX_READ_FAILURES {
            failures = 0;
            attempt += 1;
            tracing::warn!(attempt, "session presumed dead, reopening");
            shared.emit(SessionEvent::Reconnecting {
                attempt,
                reason: last_error.clone(),
            });
            match shared.open_session() {
                Ok(new_offset) => {
                    tracing::info!(offset = new_offset, "session reopened");
                    offset = new_offset;
                    attempt = 0;
                    shared.emit(SessionEvent::Reconnected);
                }
                Err(e) => {
                    // The failure counter restarts; the next dead round
                    // escalates the attempt number.
                    tracing::warn!(attempt, error = %e, "reopen failed");
                    last_error = e.to_string();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::encode_stenura;
    use std::collections::{HashMap, VecDeque};
    use std::io;

    /// Scripted loopback device: reads block briefly like a VTIME
    /// serial port, writes are captured and optionally answered.
    #[derive(Default)]
    struct MockTransport {
        incoming: Mutex<VecDeque<u8>>,
        arrived: Condvar,
        writes: Mutex<Vec<Vec<u8>>>,
        responder: Mutex<Option<Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>>>,
    }

    impl MockTransport {
        fn inject(&self, bytes: &[u8]) {
            self.incoming.lock().extend(bytes);
            self.arrived.notify_all();
        }

        fn writes(&self) -> Vec<Vec<u8>> {
            self.writes.lock().clone()
        }

        fn set_responder(&self, responder: impl FnMut(&[u8]) -> Vec<u8> + Send + 'static) {
            *self.responder.lock() = Some(Box::new(responder));
        }
    }

    impl Transport for MockTransport {
        fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
            let mut incoming = self.incoming.lock();
            if incoming.is_empty() {
                let _ = self
                    .arrived
                    .wait_for(&mut incoming, Duration::from_millis(5));
            }
            let count = incoming.len().min(buf.len());
            for slot in buf.iter_mut().take(count) {
                *slot = incoming.pop_front().expect("count bounded by len");
            }
            Ok(count)
        }

        fn write_all(&self, frame: &[u8]) -> io::Result<()> {
            self.writes.lock().push(frame.to_vec());
            let reply = self
                .responder
                .lock()
                .as_mut()
                .map(|responder| responder(frame));
            if let Some(reply) = reply {
                self.inject(&reply);
            }
            Ok(())
        }
    }

    fn test_config() -> MachineConfig {
        MachineConfig {
            baud: 9600,
            retry_interval: Duration::from_millis(30),
            max_tries: 3,
            poll_interval: Duration::from_millis(5),
            queue_capacity: 64,
        }
    }

    fn response_for(frame: &[u8], p1: u16, data: Option<Vec<u8>>) -> Vec<u8> {
        Response {
            seq: frame[1],
            action: u16::from_le_bytes([frame[4], frame[5]]),
            error: 0,
            p1,
            p2: 0,
            data,
        }
        .encode()
    }

    #[test]
    fn sync_send_gets_matching_response() {
        let mock = Arc::new(MockTransport::default());
        mock.set_responder(|frame| response_for(frame, 7, None));

        let mut client = StenturaClient::new(mock.clone(), test_config());
        client.spawn_reader().unwrap();

        let response = client
            .shared
            .send_request_sync(Action::GetDos, [0; 5], None)
            .unwrap();
        assert_eq!(response.p1, 7);
        assert_eq!(mock.writes().len(), 1);

        client.stop();
    }

    #[test]
    fn unanswered_request_retries_then_times_out() {
        let mock = Arc::new(MockTransport::default());
        let mut client = StenturaClient::new(mock.clone(), test_config());
        client.spawn_reader().unwrap();
        client.spawn_retrier().unwrap();

        let started = Instant::now();
        let result = client
            .shared
            .send_request_sync(Action::GetDos, [0; 5], None);
        assert!(matches!(result, Err(MachineError::Timeout)));
        // One initial transmission plus two retries.
        assert_eq!(mock.writes().len(), 3);
        assert!(started.elapsed() >= Duration::from_millis(60));
        assert!(client.shared.pending.lock().is_empty());

        client.stop();
    }

    #[test]
    fn corrupt_response_is_dropped_and_request_times_out() {
        let mock = Arc::new(MockTransport::default());
        mock.set_responder(|frame| {
            let mut reply = response_for(frame, 0, None);
            reply[8] ^= 0xFF;
            reply
        });

        let mut client = StenturaClient::new(mock.clone(), test_config());
        client.spawn_reader().unwrap();
        client.spawn_retrier().unwrap();

        let result = client
            .shared
            .send_request_sync(Action::GetDos, [0; 5], None);
        assert!(matches!(result, Err(MachineError::Timeout)));

        client.stop();
    }

    #[test]
    fn unmatched_response_is_ignored() {
        let mock = Arc::new(MockTransport::default());
        let mut client = StenturaClient::new(mock.clone(), test_config());
        client.spawn_reader().unwrap();

        // Noise and a response for a sequence nobody sent.
        mock.inject(&[0x00, 0x55]);
        mock.inject(&Response {
            seq: 200,
            action: 0x0B,
            error: 0,
            p1: 0,
            p2: 0,
            data: None,
        }
        .encode());
        thread::sleep(Duration::from_millis(20));

        // The reader is still alive and matching.
        mock.set_responder(|frame| response_for(frame, 1, None));
        let response = client
            .shared
            .send_request_sync(Action::GetDos, [0; 5], None)
            .unwrap();
        assert_eq!(response.p1, 1);

        client.stop();
    }

    #[test]
    fn session_drains_buffered_data_then_polls_strokes() {
        let mock = Arc::new(MockTransport::default());
        let drained = encode_stenura(Chord::parse("KAT").unwrap());
        let live = encode_stenura(Chord::parse("S").unwrap());

        let mut readc_calls = 0usize;
        mock.set_responder(move |frame| {
            let action = u16::from_le_bytes([frame[4], frame[5]]);
            match action {
                0x0A => response_for(frame, 0, None),
                0x0B => {
                    readc_calls += 1;
                    match readc_calls {
                        // Stale data the machine buffered before we
                        // connected: drained, never translated.
                        1 => response_for(frame, 4, Some(drained.to_vec())),
                        2 => response_for(frame, 0, None),
                        3 => response_for(frame, 4, Some(live.to_vec())),
                        _ => response_for(frame, 0, None),
                    }
                }
                _ => response_for(frame, 0, None),
            }
        });

        let mut client = StenturaClient::new(mock.clone(), test_config());
        client.start().unwrap();

        assert_eq!(client.read().unwrap(), Some(Chord::parse("S").unwrap()));

        client.stop();
        assert_eq!(client.read().unwrap(), None);
    }

    #[test]
    fn poller_advances_offset_by_bytes_read() {
        let mock = Arc::new(MockTransport::default());
        let live = encode_stenura(Chord::parse("T").unwrap());
        let offsets = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&offsets);
        let mut readc_calls = 0usize;
        mock.set_responder(move |frame| {
            let action = u16::from_le_bytes([frame[4], frame[5]]);
            if action != 0x0B {
                return response_for(frame, 0, None);
            }
            let block = u16::from_le_bytes([frame[12], frame[13]]) as u32;
            let byte = u16::from_le_bytes([frame[14], frame[15]]) as u32;
            seen.lock().push(block * BLOCK_SIZE + byte);
            readc_calls += 1;
            // First call answers the drain with no data; the next two
            // polls each deliver one stroke.
            if (2..=3).contains(&readc_calls) {
                response_for(frame, 4, Some(live.to_vec()))
            } else {
                response_for(frame, 0, None)
            }
        });

        let mut client = StenturaClient::new(mock.clone(), test_config());
        client.start().unwrap();
        for _ in 0..2 {
            client.read().unwrap();
        }
        client.stop();

        let offsets = offsets.lock();
        assert!(offsets.windows(2).all(|w| w[1] >= w[0]));
        // Polling advanced four bytes per delivered stroke.
        assert!(offsets.contains(&4) && offsets.contains(&8));
    }

    #[test]
    fn dead_session_is_reopened_and_polling_resumes() {
        let mock = Arc::new(MockTransport::default());
        let live = encode_stenura(Chord::parse("KAT").unwrap());

        // Decisions are keyed by sequence number so retransmissions of
        // an unanswered request stay unanswered.
        let mut decisions: HashMap<u8, usize> = HashMap::new();
        let mut readc_unique = 0usize;
        mock.set_responder(move |frame| {
            let action = u16::from_le_bytes([frame[4], frame[5]]);
            if action != 0x0B {
                return response_for(frame, 0, None);
            }
            let index = *decisions.entry(frame[1]).or_insert_with(|| {
                readc_unique += 1;
                readc_unique
            });
            match index {
                // Initial drain finds nothing buffered.
                1 => response_for(frame, 0, None),
                // The machine goes quiet: three reads die unanswered.
                2..=4 => Vec::new(),
                // Drain after the reopen, then a live stroke.
                5 => response_for(frame, 0, None),
                6 => response_for(frame, 4, Some(live.to_vec())),
                _ => response_for(frame, 0, None),
            }
        });

        let mut client = StenturaClient::new(mock.clone(), test_config());
        let events = client.session_events().unwrap();
        client.start().unwrap();

        assert_eq!(client.read().unwrap(), Some(Chord::parse("KAT").unwrap()));
        client.stop();

        let events: Vec<_> = events.try_iter().collect();
        assert!(
            matches!(
                events.first(),
                Some(SessionEvent::Reconnecting { attempt: 1, .. })
            ),
            "unexpected events: {events:?}"
        );
        assert!(events.contains(&SessionEvent::Reconnected));
    }
}

//! Blocking AMI client: one socket, one reader thread, synchronous actions.
//!
//! Responses are matched to callers by `ActionID`. Packets nobody is waiting
//! for are unsolicited events and go out on the event channel, followed by a
//! single [`TransportEvent::Disconnected`] once the socket closes.

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::collections::HashMap;
use std::io::{BufReader, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::message::{Message, MessageReader};
use crate::lock::lock_or_recover;
use crate::log_debug;

const BANNER_PREFIX: &str = "Asterisk Call Manager";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Asynchronous traffic from the AMI connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Event(Message),
    Disconnected,
}

/// Response to a list action plus the items that followed it.
#[derive(Debug, Clone)]
pub struct ListResponse {
    pub response: Message,
    pub items: Vec<Message>,
}

type PendingMap = Arc<Mutex<HashMap<String, Sender<Message>>>>;

pub struct AmiClient {
    stream: Mutex<TcpStream>,
    pending: PendingMap,
    next_action_id: AtomicU64,
    action_timeout: Duration,
    connected: Arc<AtomicBool>,
    banner: String,
}

impl AmiClient {
    /// Connect, read the banner, and start the reader thread.
    ///
    /// Unsolicited events are delivered on the returned channel, which holds at
    /// most `event_capacity` undelivered packets.
    pub fn connect(
        host: &str,
        port: u16,
        action_timeout: Duration,
        event_capacity: usize,
    ) -> Result<(Self, Receiver<TransportEvent>)> {
        let stream = open_stream(host, port)?;
        let _ = stream.set_nodelay(true);
        let read_half = stream
            .try_clone()
            .context("failed to clone AMI socket for reading")?;
        let mut reader = MessageReader::new(BufReader::new(read_half));
        let banner = reader
            .read_banner()
            .with_context(|| format!("no AMI banner from {host}:{port}"))?;
        if !banner.starts_with(BANNER_PREFIX) {
            bail!("{host}:{port} is not an Asterisk manager interface (banner: {banner:?})");
        }
        log_debug(&format!("AMI connected to {host}:{port}: {banner}"));

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let connected = Arc::new(AtomicBool::new(true));
        let (events_tx, events_rx) = bounded(event_capacity.max(1));
        let _reader_handle = spawn_reader_thread(
            reader,
            Arc::clone(&pending),
            events_tx,
            Arc::clone(&connected),
        );

        let client = Self {
            stream: Mutex::new(stream),
            pending,
            next_action_id: AtomicU64::new(1),
            action_timeout,
            connected,
            banner,
        };
        Ok((client, events_rx))
    }

    pub fn banner(&self) -> &str {
        &self.banner
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Authenticate. A rejected login is an error.
    pub fn login(&self, username: &str, secret: &str) -> Result<()> {
        let response = self.action(
            Message::action("Login")
                .with("Username", username)
                .with("Secret", secret),
        )?;
        if !response.is_success() {
            bail!(
                "Failed to log in with username {username}: {}",
                response.value("Message")
            );
        }
        log_debug(&format!("AMI login accepted for {username}"));
        Ok(())
    }

    /// Send an action and wait for its response.
    ///
    /// `Err` means the response never arrived (timeout or lost connection); a
    /// refused action comes back as `Ok` with `Response: Error`.
    pub fn action(&self, action: Message) -> Result<Message> {
        let name = action.action_name().unwrap_or("?").to_string();
        let started = Instant::now();
        let (id, rx) = self.register();
        let result = self
            .write_action(action, &id)
            .and_then(|()| self.wait_for(&rx, &id, &name));
        self.unregister(&id);
        match &result {
            Ok(response) => tracing::debug!(
                action = %name,
                action_id = %id,
                success = response.is_success(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "ami action completed"
            ),
            Err(err) => tracing::warn!(action = %name, action_id = %id, error = %err, "ami action failed"),
        }
        result
    }

    /// Send a list action and collect its items up to `complete_event`.
    pub fn list(&self, action: Message, complete_event: &str) -> Result<ListResponse> {
        let name = action.action_name().unwrap_or("?").to_string();
        let (id, rx) = self.register();
        let result = self.write_action(action, &id).and_then(|()| {
            let response = self.wait_for(&rx, &id, &name)?;
            let mut items = Vec::new();
            if !response.is_success() {
                return Ok(ListResponse { response, items });
            }
            loop {
                let message = self.wait_for(&rx, &id, &name)?;
                let done = message
                    .event_name()
                    .is_some_and(|event| event.eq_ignore_ascii_case(complete_event))
                    || message.is_list_complete();
                if done {
                    break;
                }
                if message.is_event() {
                    items.push(message);
                }
            }
            Ok(ListResponse { response, items })
        });
        self.unregister(&id);
        if let Ok(list) = &result {
            tracing::debug!(action = %name, action_id = %id, items = list.items.len(), "ami list completed");
        }
        result
    }

    /// Log off and close the socket. Errors are ignored; the process is leaving.
    pub fn logoff(&self) {
        if self.is_connected() {
            let _ = self.action(Message::action("Logoff"));
        }
        self.disconnect();
    }

    pub fn disconnect(&self) {
        let stream = lock_or_recover(&self.stream, "ami stream");
        let _ = stream.shutdown(Shutdown::Both);
    }

    fn register(&self) -> (String, Receiver<Message>) {
        let id = self.next_action_id.fetch_add(1, Ordering::Relaxed).to_string();
        let (tx, rx) = unbounded();
        lock_or_recover(&self.pending, "ami pending").insert(id.clone(), tx);
        (id, rx)
    }

    fn unregister(&self, id: &str) {
        lock_or_recover(&self.pending, "ami pending").remove(id);
    }

    fn write_action(&self, mut action: Message, id: &str) -> Result<()> {
        if !self.is_connected() {
            bail!("AMI connection is closed");
        }
        action.set("ActionID", id);
        let wire = action.to_wire();
        let mut stream = lock_or_recover(&self.stream, "ami stream");
        stream
            .write_all(wire.as_bytes())
            .and_then(|()| stream.flush())
            .context("failed to write AMI action")
    }

    fn wait_for(&self, rx: &Receiver<Message>, id: &str, name: &str) -> Result<Message> {
        match rx.recv_timeout(self.action_timeout) {
            Ok(message) => Ok(message),
            Err(RecvTimeoutError::Timeout) => Err(anyhow!(
                "timed out after {} ms waiting for {name} response (ActionID {id})",
                self.action_timeout.as_millis()
            )),
            Err(RecvTimeoutError::Disconnected) => {
                Err(anyhow!("AMI connection closed while waiting for {name}"))
            }
        }
    }
}

impl Drop for AmiClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn open_stream(host: &str, port: u16) -> Result<TcpStream> {
    use std::net::ToSocketAddrs;

    let addrs = (host, port)
        .to_socket_addrs()
        .with_context(|| format!("failed to resolve AMI host {host}"))?;
    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    match last_err {
        Some(err) => Err(err).with_context(|| format!("failed to connect to AMI at {host}:{port}")),
        None => bail!("AMI host {host} resolved to no addresses"),
    }
}

fn spawn_reader_thread(
    mut reader: MessageReader<BufReader<TcpStream>>,
    pending: PendingMap,
    events_tx: Sender<TransportEvent>,
    connected: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        loop {
            match reader.read_message() {
                Ok(Some(message)) => route_message(message, &pending, &events_tx),
                Ok(None) => {
                    log_debug("AMI connection closed by peer");
                    break;
                }
                Err(err) => {
                    log_debug(&format!("AMI read error: {err}"));
                    break;
                }
            }
        }
        connected.store(false, Ordering::SeqCst);
        // Dropping the senders wakes every waiter with a disconnect.
        lock_or_recover(&pending, "ami pending").clear();
        let _ = events_tx.send(TransportEvent::Disconnected);
    })
}

fn route_message(message: Message, pending: &PendingMap, events_tx: &Sender<TransportEvent>) {
    if let Some(id) = message.action_id() {
        let waiter = lock_or_recover(pending, "ami pending").get(id).cloned();
        if let Some(waiter) = waiter {
            let _ = waiter.send(message);
            return;
        }
        if message.is_response() {
            log_debug(&format!("dropping late AMI response for ActionID {id}"));
            return;
        }
    }
    if message.is_event() {
        // A dropped receiver means nobody relays events any more; keep reading
        // so responses still reach their callers.
        let _ = events_tx.send(TransportEvent::Event(message));
    } else {
        log_debug("dropping unsolicited AMI packet without Event header");
    }
}

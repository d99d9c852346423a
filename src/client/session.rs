//! Client session
//!
//! Two concurrent activities share one socket and one message log:
//! - the receiver task decodes frames, renders them and refreshes the screen
//! - the input loop classifies prompt lines and writes envelopes
//!
//! The receiver owns the read half and the input loop owns the write half,
//! so there is never more than one writer. The log, username and running
//! flag live in `ClientState` behind locks/atomics.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::command::{Command, Input};
use crate::client::log::MessageLog;
use crate::client::render::{format_envelope, right_align};
use crate::codec::EnvelopeCodec;
use crate::config::ClientConfig;
use crate::error::AppError;
use crate::message::Envelope;
use crate::types::timestamp_now;

/// Username shown before the first rename
pub const DEFAULT_USERNAME: &str = "Anonymous";

const LOST_CONNECTION: &str = "[ERROR] Lost connection to server";
const SEND_FAILED: &str = "[ERROR] Failed to send message";
const RENAME_FAILED: &str = "[ERROR] Failed to change name";
const DISCONNECTING: &str = "[INFO] Disconnecting from chat...";

/// Something that can redraw the chat view from the shared state
pub trait Screen: Send + Sync + 'static {
    fn refresh(&self, state: &ClientState);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared by the receiver and the input loop
#[derive(Debug)]
pub struct ClientState {
    log: Mutex<MessageLog>,
    username: Mutex<String>,
    running: AtomicBool,
    /// Cancelled once the session stops, waking anything waiting on it
    shutdown: CancellationToken,
    width: usize,
    height: usize,
}

impl ClientState {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            log: Mutex::new(MessageLog::new()),
            username: Mutex::new(DEFAULT_USERNAME.to_string()),
            running: AtomicBool::new(true),
            shutdown: CancellationToken::new(),
            width,
            height,
        }
    }

    pub fn push(&self, line: impl Into<String>) {
        lock(&self.log).push(line);
    }

    pub fn clear_log(&self) {
        lock(&self.log).clear();
    }

    /// Copy of the newest `count` log lines
    pub fn recent(&self, count: usize) -> Vec<String> {
        lock(&self.log).recent(count).to_vec()
    }

    /// Copy of the whole log
    pub fn entries(&self) -> Vec<String> {
        lock(&self.log).entries().to_vec()
    }

    pub fn username(&self) -> String {
        lock(&self.username).clone()
    }

    pub fn set_username(&self, name: impl Into<String>) {
        *lock(&self.username) = name.into();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.cancel();
    }

    /// Resolves once `stop` has been called, immediately if it already was
    pub async fn stopped(&self) {
        self.shutdown.cancelled().await
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Append a line pushed against the right edge
    fn push_right(&self, text: &str) {
        self.push(right_align(text, self.width));
    }
}

/// Decode, render and log incoming envelopes until the stream ends
///
/// On end of stream or transport error a lost-connection entry is added
/// and the session stops, unless it was already stopping.
pub async fn receive_loop<R, S>(reader: R, state: Arc<ClientState>, screen: Arc<S>)
where
    R: AsyncRead + Unpin,
    S: Screen,
{
    let mut frames = FramedRead::new(reader, EnvelopeCodec::new());

    while let Some(result) = frames.next().await {
        let envelope = match result {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("Receive error: {}", e);
                break;
            }
        };

        let is_own = envelope.is_chat_from(&state.username());
        if let Some(line) = format_envelope(&envelope, is_own, state.width()) {
            state.push(line);
            screen.refresh(&state);
        }
    }

    if state.is_running() {
        state.push(LOST_CONNECTION);
        screen.refresh(&state);
        state.stop();
    }
}

/// Outcome of one input cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Handles prompt lines and owns the write side of the connection
pub struct InputHandler<W, S> {
    writer: FramedWrite<W, EnvelopeCodec>,
    state: Arc<ClientState>,
    screen: Arc<S>,
}

impl<W, S> InputHandler<W, S>
where
    W: AsyncWrite + Unpin,
    S: Screen,
{
    pub fn new(writer: W, state: Arc<ClientState>, screen: Arc<S>) -> Self {
        Self {
            writer: FramedWrite::new(writer, EnvelopeCodec::new()),
            state,
            screen,
        }
    }

    /// Process one line typed at the prompt, then refresh the screen
    pub async fn handle_line(&mut self, line: &str) -> Flow {
        let flow = match Input::parse(line) {
            Ok(Input::Empty) => Flow::Continue,
            Ok(Input::Chat(text)) => {
                self.transmit(Envelope::outbound_chat(text), SEND_FAILED).await;
                Flow::Continue
            }
            Ok(Input::Command(command)) => {
                self.echo(line);
                self.run_command(command).await
            }
            Err(e) => {
                self.echo(line);
                self.state.push_right(&e.to_string());
                Flow::Continue
            }
        };

        self.screen.refresh(&self.state);
        flow
    }

    async fn run_command(&mut self, command: Command) -> Flow {
        match command {
            Command::Quit => return Flow::Quit,
            Command::Clear => self.state.clear_log(),
            Command::Rename(name) => {
                let old = self.state.username();
                if self.transmit(Envelope::rename(name.clone()), RENAME_FAILED).await {
                    self.state.set_username(name.clone());
                    self.state
                        .push_right(&format!("[SUCCESS] Name changed from {} to {}", old, name));
                }
            }
        }
        Flow::Continue
    }

    /// Local echo of a typed command
    fn echo(&self, line: &str) {
        self.state
            .push_right(&format!("You: {} [{}]", line.trim(), timestamp_now()));
    }

    /// Write one envelope; on failure log `failure` and stop the session
    async fn transmit(&mut self, envelope: Envelope, failure: &str) -> bool {
        if !self.state.is_running() {
            return false;
        }
        match self.writer.send(envelope).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Send failed: {}", e);
                self.state.push(failure);
                self.state.stop();
                false
            }
        }
    }

    /// Flush and shut down the write side
    pub async fn close(&mut self) {
        if let Err(e) = self.writer.close().await {
            debug!("Error closing connection: {}", e);
        }
    }
}

/// Feed prompt lines to `handler` until quit, end of input, interrupt or
/// loss of the connection
pub async fn input_loop<W, S>(lines: &mut mpsc::Receiver<String>, handler: &mut InputHandler<W, S>)
where
    W: AsyncWrite + Unpin,
    S: Screen,
{
    let state = handler.state.clone();
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    while state.is_running() {
        tokio::select! {
            line = lines.recv() => match line {
                Some(line) => {
                    if handler.handle_line(&line).await == Flow::Quit {
                        break;
                    }
                }
                None => {
                    debug!("End of input");
                    break;
                }
            },
            _ = &mut interrupt => {
                debug!("Interrupted");
                break;
            }
            _ = state.stopped() => {
                debug!("Session stopped");
                break;
            }
        }
    }
}

/// Read stdin on a dedicated thread and forward lines over a channel
///
/// Blocking stdin reads stay off the runtime so shutdown never waits on
/// them. The channel closes at end of input.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// A connected chat client
pub struct ChatClient<S> {
    state: Arc<ClientState>,
    screen: Arc<S>,
}

impl<S: Screen> ChatClient<S> {
    pub fn new(state: Arc<ClientState>, screen: Arc<S>) -> Self {
        Self { state, screen }
    }

    /// Open the TCP connection described by `config`
    pub async fn connect(config: &ClientConfig) -> Result<TcpStream, AppError> {
        let addr = config.server_addr();
        let stream = TcpStream::connect(&addr).await?;
        info!("Connected to {}", addr);
        Ok(stream)
    }

    /// Run receiver and input loop until the session ends, then disconnect
    pub async fn run(self, stream: TcpStream, mut lines: mpsc::Receiver<String>) {
        let (read_half, write_half) = stream.into_split();

        let receiver = tokio::spawn(receive_loop(
            read_half,
            self.state.clone(),
            self.screen.clone(),
        ));
        self.screen.refresh(&self.state);

        let mut handler = InputHandler::new(write_half, self.state.clone(), self.screen.clone());
        input_loop(&mut lines, &mut handler).await;

        // Graceful disconnect: nothing more is sent
        self.state.push(DISCONNECTING);
        self.state.stop();
        handler.close().await;
        receiver.abort();

        info!("Disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    use crate::codec;

    #[derive(Default)]
    struct CountingScreen {
        refreshes: AtomicUsize,
    }

    impl Screen for CountingScreen {
        fn refresh(&self, _state: &ClientState) {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn setup() -> (Arc<ClientState>, Arc<CountingScreen>) {
        (
            Arc::new(ClientState::new(80, 24)),
            Arc::new(CountingScreen::default()),
        )
    }

    async fn frames_written(mut remote: tokio::io::DuplexStream) -> Vec<Envelope> {
        let mut raw = Vec::new();
        remote.read_to_end(&mut raw).await.unwrap();
        raw.split(|b| *b == b'\n')
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| codec::decode(chunk).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_rename_validation_gates_the_wire() {
        let (state, screen) = setup();
        let (local, remote) = duplex(4096);
        let mut handler = InputHandler::new(local, state.clone(), screen.clone());

        // Rejected: missing, too long
        handler.handle_line("/name").await;
        handler.handle_line(&format!("/name {}", "x".repeat(21))).await;
        assert_eq!(state.username(), DEFAULT_USERNAME);

        let entries = state.entries();
        assert!(entries.iter().any(|e| e.contains("[ERROR] Usage: /name <new_name>")));
        assert!(entries.iter().any(|e| e.contains("valid name (1-20 characters)")));

        // Accepted: 1 and 20 characters
        handler.handle_line("/name a").await;
        assert_eq!(state.username(), "a");
        let twenty = "b".repeat(20);
        handler.handle_line(&format!("/name {}", twenty)).await;
        assert_eq!(state.username(), twenty);
        assert!(state
            .entries()
            .iter()
            .any(|e| e.contains(&format!("[SUCCESS] Name changed from a to {}", twenty))));

        handler.close().await;
        drop(handler);

        let sent = frames_written(remote).await;
        assert_eq!(sent, vec![Envelope::rename("a"), Envelope::rename(twenty)]);
        assert_eq!(screen.refreshes.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_chat_and_local_commands() {
        let (state, screen) = setup();
        let (local, remote) = duplex(4096);
        let mut handler = InputHandler::new(local, state.clone(), screen);

        assert_eq!(handler.handle_line("  hello  ").await, Flow::Continue);
        assert_eq!(handler.handle_line("").await, Flow::Continue);

        handler.handle_line("/bogus").await;
        assert!(state
            .entries()
            .iter()
            .any(|e| e.ends_with("[ERROR] Unknown command: /bogus. Available: /name, /clear, /quit")));

        handler.handle_line("/clear").await;
        assert!(state.entries().is_empty());

        assert_eq!(handler.handle_line("/quit").await, Flow::Quit);
        assert_eq!(handler.handle_line("/EXIT").await, Flow::Quit);

        handler.close().await;
        drop(handler);

        // Only the chat line reached the wire
        assert_eq!(frames_written(remote).await, vec![Envelope::outbound_chat("hello")]);
    }

    #[tokio::test]
    async fn test_send_failure_stops_session() {
        let (state, screen) = setup();
        let (local, remote) = duplex(64);
        drop(remote);
        let mut handler = InputHandler::new(local, state.clone(), screen);

        handler.handle_line("anyone there?").await;

        assert!(!state.is_running());
        assert!(state.entries().contains(&SEND_FAILED.to_string()));
    }

    #[tokio::test]
    async fn test_receive_loop_renders_and_reports_loss() {
        let (state, screen) = setup();
        let (local, mut remote) = duplex(4096);

        let mut wire = Vec::new();
        wire.extend_from_slice(&codec::encode(&Envelope::system("Welcome")).unwrap());
        wire.extend_from_slice(b"garbage\n");
        wire.extend_from_slice(&codec::encode(&Envelope::broadcast_chat(DEFAULT_USERNAME, "mine")).unwrap());
        wire.extend_from_slice(&codec::encode(&Envelope::broadcast_chat("Bob", "theirs")).unwrap());
        remote.write_all(&wire).await.unwrap();
        drop(remote);

        receive_loop(local, state.clone(), screen.clone()).await;

        let entries = state.entries();
        assert_eq!(entries.len(), 4);
        assert!(entries[0].contains("[SYSTEM]") && entries[0].contains("Welcome"));
        assert!(entries[1].contains("You: mine"));
        assert!(entries[2].contains("theirs") && !entries[2].contains("You:"));
        assert_eq!(entries[3], LOST_CONNECTION);
        assert!(!state.is_running());
        assert_eq!(screen.refreshes.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_receive_loop_quiet_when_already_stopped() {
        let (state, screen) = setup();
        let (local, remote) = duplex(64);
        state.stop();
        drop(remote);

        receive_loop(local, state.clone(), screen).await;
        assert!(state.entries().is_empty());
    }

    #[tokio::test]
    async fn test_input_loop_ends_at_end_of_input() {
        let (state, screen) = setup();
        let (local, remote) = duplex(4096);
        let mut handler = InputHandler::new(local, state.clone(), screen);

        let (tx, mut rx) = mpsc::channel(4);
        tx.send("first".to_string()).await.unwrap();
        tx.send("second".to_string()).await.unwrap();
        drop(tx);

        input_loop(&mut rx, &mut handler).await;
        handler.close().await;
        drop(handler);

        assert_eq!(
            frames_written(remote).await,
            vec![Envelope::outbound_chat("first"), Envelope::outbound_chat("second")]
        );
    }

    #[tokio::test]
    async fn test_input_loop_stops_on_quit() {
        let (state, screen) = setup();
        let (local, _remote) = duplex(4096);
        let mut handler = InputHandler::new(local, state.clone(), screen);

        let (tx, mut rx) = mpsc::channel(4);
        tx.send("/quit".to_string()).await.unwrap();

        // Sender still open: only the quit command can end the loop
        input_loop(&mut rx, &mut handler).await;
        assert!(state.is_running());
    }

    #[tokio::test]
    async fn test_input_loop_ends_when_session_stops() {
        let (state, screen) = setup();
        let (local, _remote) = duplex(4096);
        let mut handler = InputHandler::new(local, state.clone(), screen);

        // Input stays open and idle; only the stop can end the loop
        let (_tx, mut rx) = mpsc::channel::<String>(4);
        let stopper = state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stopper.stop();
        });

        timeout(Duration::from_secs(3), input_loop(&mut rx, &mut handler))
            .await
            .expect("input loop kept waiting after stop");
    }

    #[tokio::test]
    async fn test_run_ends_when_connection_drops() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (accepted, _) = listener.accept().await.unwrap();
        drop(accepted);

        let (state, screen) = setup();
        let (_tx, rx) = mpsc::channel::<String>(4);

        timeout(
            Duration::from_secs(3),
            ChatClient::new(state.clone(), screen).run(stream, rx),
        )
        .await
        .expect("client kept running after the relay went away");

        assert!(!state.is_running());
        assert!(state.entries().contains(&LOST_CONNECTION.to_string()));
    }
}

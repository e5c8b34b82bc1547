//! A gateway session: connect/identify/resume, the payload loop, and
//! reconnection.

pub mod manager;

mod heartbeat;
mod socket_forwarder;

pub use self::{
    heartbeat::Latency,
    manager::{Outcome, Signal},
};

use self::{
    heartbeat::Heartbeats,
    manager::{classify, Context, TaskGroup},
    socket_forwarder::SocketForwarder,
};
use crate::{
    compression::Inflater,
    config::Config,
    error::{SessionError, SessionErrorType},
    handler::Registry,
    stage::Stage,
};
use accord_http::Client;
use accord_model::id::ApplicationId;
use accord_model::gateway::{
    event::{Event, EventType},
    payload::{
        incoming::{Hello, Ready},
        outgoing::{Identify, IdentifyInfo, IdentifyProperties, Resume},
        Envelope,
    },
    CloseCode, OpCode,
};
use serde::Serialize;
use serde_json::value::RawValue;
use std::{
    env::consts::OS,
    sync::{
        atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering},
        Arc, Mutex as SyncMutex,
    },
    time::Duration,
};
use tokio::{
    sync::mpsc::{self, Sender, UnboundedReceiver, UnboundedSender},
    time,
};
use tokio_tungstenite::tungstenite::{
    protocol::{frame::coding::CloseCode as FrameCloseCode, CloseFrame},
    Message,
};

/// How long to wait after an `Invalid Session` before acting on it.
const INVALID_SESSION_WAIT: Duration = Duration::from_secs(1);

/// How long to wait after a reconnect-close before redialing, so the
/// platform can fully tear down the prior connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Cap on the exponential redial backoff.
const RECONNECT_BACKOFF_CAP: Duration = Duration::from_secs(128);

/// Connection state shared between the session handle and its tasks.
#[derive(Debug)]
struct SessionState {
    acks: Arc<AtomicU32>,
    application_id: AtomicU64,
    endpoint: SyncMutex<Option<String>>,
    heartbeats: Arc<Heartbeats>,
    id: SyncMutex<Option<Box<str>>>,
    seq: Arc<AtomicU64>,
    stage: AtomicU8,
    tx: SyncMutex<Option<UnboundedSender<Message>>>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            acks: Arc::new(AtomicU32::new(0)),
            application_id: AtomicU64::new(0),
            endpoint: SyncMutex::new(None),
            heartbeats: Arc::new(Heartbeats::default()),
            id: SyncMutex::new(None),
            seq: Arc::new(AtomicU64::new(0)),
            stage: AtomicU8::new(Stage::default() as u8),
            tx: SyncMutex::new(None),
        }
    }

    fn id(&self) -> Option<Box<str>> {
        self.id.lock().expect("id poisoned").clone()
    }

    fn set_id(&self, new_id: Option<Box<str>>) {
        *self.id.lock().expect("id poisoned") = new_id;
    }

    fn seq(&self) -> u64 {
        self.seq.load(Ordering::Acquire)
    }

    fn set_seq(&self, seq: u64) {
        self.seq.store(seq, Ordering::Release);
    }

    fn stage(&self) -> Stage {
        Stage::try_from(self.stage.load(Ordering::Relaxed)).unwrap_or_default()
    }

    fn set_stage(&self, stage: Stage) {
        self.stage.store(stage as u8, Ordering::Release);
    }

    /// Serialize and send a payload over the current socket.
    fn send(&self, payload: &impl Serialize) -> Result<(), SessionError> {
        let json = serde_json::to_string(payload)
            .map_err(|source| SessionError::with_source(SessionErrorType::Sending, source))?;

        let tx = self
            .tx
            .lock()
            .expect("tx poisoned")
            .clone()
            .ok_or_else(|| SessionError::new(SessionErrorType::Sending))?;

        tx.send(Message::Text(json))
            .map_err(|_| SessionError::new(SessionErrorType::Sending))
    }

    /// Send a close frame over the current socket.
    fn close(&self, frame: Option<CloseFrame<'static>>) {
        let tx = self.tx.lock().expect("tx poisoned").clone();

        if let Some(tx) = tx {
            let _ = tx.send(Message::Close(frame));
        }
    }
}

/// A gateway session.
///
/// A session owns the connect/identify/resume state machine, the heartbeat
/// protocol, and a registry of typed event handlers. All tasks run under one
/// cancel context; [`Session::wait`] resolves when they have all exited and
/// classifies why.
#[derive(Debug)]
pub struct Session {
    client: Client,
    config: Config,
    context: SyncMutex<Context>,
    manager: SyncMutex<TaskGroup>,
    registry: Arc<Registry>,
    state: Arc<SessionState>,
}

impl Session {
    /// Create a disconnected session from a REST client and configuration.
    pub fn new(client: Client, config: Config) -> Self {
        let manager = TaskGroup::new();

        Self {
            client,
            config,
            context: SyncMutex::new(manager.context()),
            manager: SyncMutex::new(manager),
            registry: Arc::new(Registry::new()),
            state: Arc::new(SessionState::new()),
        }
    }

    /// The handlers registry of this session.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register a typed event handler. See [`Registry::on`].
    pub fn on<E, F>(&self, handler: F) -> crate::handler::HandlerId
    where
        E: crate::handler::FromEvent,
        F: Fn(E) + Send + Sync + 'static,
    {
        self.registry.on::<E, F>(handler)
    }

    /// Current connection stage.
    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    /// Sequence number of the most recent dispatch.
    pub fn seq(&self) -> u64 {
        self.state.seq()
    }

    /// Session id assigned by the platform, once `Ready` has been received.
    pub fn session_id(&self) -> Option<Box<str>> {
        self.state.id()
    }

    /// Heartbeat latency statistics for this session.
    pub fn latency(&self) -> Latency {
        self.state.heartbeats.latency()
    }

    /// Application id recorded from `Ready`, once one has been received.
    pub fn application_id(&self) -> Option<ApplicationId> {
        let id = self.state.application_id.load(Ordering::Relaxed);

        (id != 0).then_some(ApplicationId(id))
    }

    /// Connect to the gateway, identifying or resuming as appropriate.
    ///
    /// Returns once `Ready` or `Resumed` has been handled and the reader,
    /// pulse, and heartbeater tasks have all entered their loops.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionErrorType::FetchingGatewayUrl`] error type when no
    /// endpoint is known and the REST call for one fails.
    ///
    /// Returns a [`SessionErrorType::InvalidSession`] error type when the
    /// platform rejects the session twice.
    pub async fn connect(&self) -> Result<(), SessionError> {
        let resumable = self.state.id().is_some() && self.state.seq() > 0;
        let url = self.resolve_url(resumable).await?;

        self.state.set_stage(Stage::Handshaking);

        #[cfg(feature = "tracing")]
        tracing::debug!(%url, resumable, "connecting to the gateway");

        let parsed = url::Url::parse(&url).map_err(|source| {
            SessionError::with_source(SessionErrorType::Connecting { url: url.clone() }, source)
        })?;

        let (stream, _) = tokio_tungstenite::connect_async(parsed)
            .await
            .map_err(|source| {
                SessionError::with_source(SessionErrorType::Connecting { url: url.clone() }, source)
            })?;

        let (forwarder, mut rx, tx) = SocketForwarder::new(stream);
        tokio::spawn(forwarder.run());
        *self.state.tx.lock().expect("tx poisoned") = Some(tx.clone());

        let mut inflater = Inflater::new();

        // The first frame must be a Hello carrying the heartbeat interval.
        let envelope = read_envelope(&mut rx, &mut inflater).await?;
        let interval = match envelope.op() {
            Some(OpCode::Hello) => parse_data::<Hello>(&envelope)?.heartbeat_interval,
            _ => {
                return Err(SessionError::new(SessionErrorType::Protocol {
                    op: envelope.op,
                }))
            }
        };

        // A fresh link counts as alive until the first beat goes out.
        self.state.acks.store(1, Ordering::Release);

        if resumable {
            self.state.set_stage(Stage::Resuming);

            let id = self.state.id().unwrap_or_default();
            self.state
                .send(&build_resume(&self.config, self.state.seq(), &id))?;
        } else {
            self.identify()?;
        }

        self.handshake(&mut rx, &mut inflater).await?;

        self.start_tasks(rx, inflater, interval).await;

        Ok(())
    }

    /// Ask the session to disconnect.
    ///
    /// The closing handshake and task shutdown proceed in the background;
    /// await [`Session::wait`] to observe them finish.
    pub fn disconnect(&self) {
        self.context
            .lock()
            .expect("context poisoned")
            .cancel(Signal::Disconnect);
        self.state.close(Some(CloseFrame {
            code: FrameCloseCode::Normal,
            reason: "".into(),
        }));
        self.state.set_stage(Stage::Disconnected);
    }

    /// Cancel the running session with a reconnect signal, wait for its
    /// tasks to exit, and connect again.
    pub async fn reconnect(&self) -> Result<(), SessionError> {
        self.context
            .lock()
            .expect("context poisoned")
            .cancel(Signal::Reconnect);
        let _outcome = self.wait().await;

        // Give the platform a moment to fully tear down the old session.
        time::sleep(RECONNECT_DELAY).await;

        self.connect().await
    }

    /// Wait for every session task to exit, classifying the shutdown.
    pub async fn wait(&self) -> Outcome {
        let (context, handles) = {
            let mut manager = self.manager.lock().expect("manager poisoned");

            (manager.context(), manager.take_handles())
        };

        let ran = !handles.is_empty();
        let mut first_error = None;

        for handle in handles {
            match handle.await {
                Ok(Ok(())) | Err(_) => {}
                Ok(Err(error)) => {
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }

        classify(context.signal(), first_error, ran)
    }

    /// Drive the session until it disconnects or fails.
    ///
    /// Reconnect outcomes are handled internally: the session redials with
    /// exponential backoff and resumes where possible.
    pub async fn run(&self) -> Result<(), SessionError> {
        loop {
            match self.wait().await {
                Outcome::Reconnect => {
                    let mut wait = RECONNECT_DELAY;

                    loop {
                        time::sleep(wait).await;

                        match self.connect().await {
                            Ok(()) => break,
                            Err(_source) => {
                                #[cfg(feature = "tracing")]
                                tracing::warn!("reconnecting failed: {_source}");

                                if wait < RECONNECT_BACKOFF_CAP {
                                    wait *= 2;
                                }
                            }
                        }
                    }
                }
                Outcome::None | Outcome::Disconnect | Outcome::Undefined => return Ok(()),
                Outcome::Error(error) | Outcome::DisconnectError(error) => return Err(error),
            }
        }
    }

    /// Resolve the URL to dial, fetching the endpoint over REST when none is
    /// cached or the session is not resumable.
    async fn resolve_url(&self, resumable: bool) -> Result<String, SessionError> {
        let cached = self.state.endpoint.lock().expect("endpoint poisoned").clone();

        let base = if let Some(configured) = self.config.gateway_url.clone() {
            configured
        } else if let Some(cached) = cached.filter(|_| resumable) {
            cached
        } else {
            let info = self
                .client
                .gateway_authed()
                .await
                .map_err(|source| {
                    SessionError::with_source(SessionErrorType::FetchingGatewayUrl, source)
                })?;

            info.url
        };

        *self.state.endpoint.lock().expect("endpoint poisoned") = Some(base.clone());

        Ok(format!(
            "{base}?v={version}&encoding=json",
            version = accord_http::API_VERSION
        ))
    }

    /// Send an Identify for a fresh session.
    fn identify(&self) -> Result<(), SessionError> {
        self.state.set_stage(Stage::Identifying);

        self.state
            .send(&build_identify(&self.config, &self.registry))
    }

    /// Read frames after Identify/Resume until the session is live.
    ///
    /// Handles `Ready`, `Resumed`, replayed dispatches, and a single bounded
    /// `Invalid Session` retry.
    async fn handshake(
        &self,
        rx: &mut UnboundedReceiver<Message>,
        inflater: &mut Inflater,
    ) -> Result<(), SessionError> {
        let mut invalid_retries = 1_u8;

        loop {
            let envelope = read_envelope(rx, inflater).await?;

            match envelope.op() {
                Some(OpCode::Dispatch) => {
                    let name = envelope.t.as_deref().unwrap_or_default();

                    if name == EventType::Ready.name() {
                        let ready = parse_data::<Ready>(&envelope)?;

                        self.state.set_seq(envelope.s.unwrap_or(0));
                        self.state.set_id(Some(ready.session_id.clone().into()));
                        self.state
                            .application_id
                            .store(ready.application.id.get(), Ordering::Relaxed);
                        self.state.set_stage(Stage::Connected);

                        #[cfg(feature = "tracing")]
                        tracing::debug!(session_id = %ready.session_id, "session is ready");

                        self.registry.dispatch(Event::Ready(Box::new(ready)));

                        return Ok(());
                    }

                    if name == EventType::Resumed.name() {
                        if let Some(seq) = envelope.s {
                            self.state.set_seq(seq);
                        }

                        self.state.set_stage(Stage::Connected);
                        self.registry.dispatch(Event::Resumed);

                        return Ok(());
                    }

                    // A replay is in progress; deliver events in order until
                    // the finalizing Resumed arrives.
                    if let Some(seq) = envelope.s {
                        self.state.set_seq(seq);
                    }

                    dispatch_raw(&self.registry, name, envelope.d.as_deref());
                }
                Some(OpCode::InvalidSession) => {
                    if invalid_retries == 0 {
                        return Err(SessionError::new(SessionErrorType::InvalidSession));
                    }

                    invalid_retries -= 1;

                    #[cfg(feature = "tracing")]
                    tracing::info!("session invalidated during connect; re-identifying");

                    time::sleep(INVALID_SESSION_WAIT).await;

                    self.state.set_id(None);
                    self.state.set_seq(0);
                    self.identify()?;
                }
                _ => {
                    return Err(SessionError::new(SessionErrorType::Protocol {
                        op: envelope.op,
                    }))
                }
            }
        }
    }

    /// Spawn the reader, pulse, and heartbeater under a fresh cancel
    /// context, returning once each has entered its loop.
    async fn start_tasks(
        &self,
        rx: UnboundedReceiver<Message>,
        inflater: Inflater,
        interval_ms: u64,
    ) {
        let group = TaskGroup::new();
        let context = group.context();

        let (beats_tx, beats_rx) = mpsc::channel(8);
        let (ready_tx, mut ready_rx) = mpsc::channel(3);

        {
            let mut manager = self.manager.lock().expect("manager poisoned");
            *manager = group;
            *self.context.lock().expect("context poisoned") = context.clone();

            let interval = Duration::from_millis(interval_ms);

            manager.spawn(heartbeat::pulse(
                interval,
                Arc::clone(&self.state.seq),
                beats_tx.clone(),
                context.clone(),
                ready_tx.clone(),
            ));

            let tx = self
                .state
                .tx
                .lock()
                .expect("tx poisoned")
                .clone()
                .expect("socket is live during connect");

            manager.spawn(heartbeat::heartbeater(
                beats_rx,
                Arc::clone(&self.state.acks),
                Arc::clone(&self.state.heartbeats),
                tx,
                context.clone(),
                ready_tx.clone(),
            ));

            let reader = Reader {
                beats: beats_tx,
                config: self.config.clone(),
                context,
                inflater,
                registry: Arc::clone(&self.registry),
                rx,
                state: Arc::clone(&self.state),
            };

            manager.spawn(reader.run(ready_tx));
        }

        // Connect resolves only after every task is in its loop.
        for _ in 0..3 {
            let _ = ready_rx.recv().await;
        }
    }
}

/// The reader task: one framed payload at a time, dispatched by op code.
struct Reader {
    beats: Sender<u64>,
    config: Config,
    context: Context,
    inflater: Inflater,
    registry: Arc<Registry>,
    rx: UnboundedReceiver<Message>,
    state: Arc<SessionState>,
}

impl Reader {
    async fn run(mut self, ready: Sender<()>) -> Result<(), SessionError> {
        let _ = ready.send(()).await;
        drop(ready);

        let mut done_context = self.context.clone();

        loop {
            let msg = tokio::select! {
                () = done_context.done() => return Ok(()),
                msg = self.rx.recv() => msg,
            };

            let msg = match msg {
                Some(msg) => msg,
                None => {
                    // Transport ended without a close frame; reopen.
                    self.context.cancel(Signal::Reconnect);

                    return Ok(());
                }
            };

            match msg {
                Message::Text(json) => self.process(json.as_bytes())?,
                Message::Binary(bytes) => {
                    match self.inflater.inflate(&bytes) {
                        Ok(inflated) => {
                            // The slice aliases the inflater's buffer.
                            let frame = inflated.to_vec();
                            self.process(&frame)?;
                        }
                        Err(source) => {
                            self.context.cancel_on_error();

                            return Err(SessionError::with_source(
                                SessionErrorType::Decompressing,
                                source,
                            ));
                        }
                    }
                }
                Message::Close(frame) => {
                    if let Some(error) = self.handle_close(frame.as_ref()) {
                        self.context.cancel_on_error();

                        return Err(error);
                    }
                }
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    }

    fn process(&mut self, json: &[u8]) -> Result<(), SessionError> {
        let envelope = match Envelope::from_json(json) {
            Ok(envelope) => envelope,
            Err(_source) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("received unparsable payload: {_source}");

                return Ok(());
            }
        };

        match envelope.op() {
            Some(OpCode::Dispatch) => {
                // Store the sequence before handing off, so a beat enqueued
                // mid-dispatch already sees it.
                if let Some(seq) = envelope.s {
                    self.state.set_seq(seq);
                }

                let name = envelope.t.as_deref().unwrap_or_default();
                dispatch_raw(&self.registry, name, envelope.d.as_deref());
            }
            Some(OpCode::Heartbeat) => {
                // The server asked for an immediate beat; answer off-thread
                // so the reader can advance.
                let seq = envelope
                    .d
                    .as_deref()
                    .and_then(|raw| serde_json::from_str::<Option<u64>>(raw.get()).ok())
                    .flatten();

                let state = Arc::clone(&self.state);
                let beats = self.beats.clone();

                tokio::spawn(async move {
                    if let Some(seq) = seq {
                        state.set_seq(seq);
                    }

                    // The request itself is evidence the link is alive.
                    state.acks.fetch_add(1, Ordering::AcqRel);
                    let _ = beats.try_send(state.seq());
                });
            }
            Some(OpCode::HeartbeatAck) => {
                self.state.acks.fetch_add(1, Ordering::AcqRel);
                self.state.heartbeats.receive();
            }
            Some(OpCode::Reconnect) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("got request to reconnect");

                self.context.cancel(Signal::Reconnect);
            }
            Some(OpCode::InvalidSession) => {
                let resumable = envelope
                    .d
                    .as_deref()
                    .and_then(|raw| serde_json::from_str::<bool>(raw.get()).ok())
                    .unwrap_or_default();

                return self.handle_invalid_session(resumable);
            }
            _ => {
                #[cfg(feature = "tracing")]
                tracing::warn!(op = envelope.op, "ignoring unexpected op code");
            }
        }

        Ok(())
    }

    /// Re-run the identify/resume path over the live socket after an
    /// `Invalid Session`.
    fn handle_invalid_session(&self, resumable: bool) -> Result<(), SessionError> {
        #[cfg(feature = "tracing")]
        tracing::info!(resumable, "session invalidated");

        let state = Arc::clone(&self.state);
        let config = self.config.clone();
        let registry = Arc::clone(&self.registry);
        let context = self.context.clone();

        tokio::spawn(async move {
            time::sleep(INVALID_SESSION_WAIT).await;

            let result = if resumable && state.id().is_some() {
                state.set_stage(Stage::Resuming);
                let id = state.id().unwrap_or_default();

                state.send(&build_resume(&config, state.seq(), &id))
            } else {
                state.set_id(None);
                state.set_seq(0);
                state.set_stage(Stage::Identifying);

                state.send(&build_identify(&config, &registry))
            };

            if result.is_err() {
                context.cancel(Signal::Reconnect);
            }
        });

        Ok(())
    }

    /// Classify a close frame. Returns an error only for fatal codes.
    fn handle_close(&self, frame: Option<&CloseFrame<'_>>) -> Option<SessionError> {
        // A session already shutting down produced this close itself.
        if self.context.is_cancelled() {
            return None;
        }

        let code = frame.map(|frame| u16::from(frame.code));

        #[cfg(feature = "tracing")]
        tracing::info!(?code, "got close frame");

        match code.and_then(CloseCode::from_code) {
            Some(known) if known.can_reconnect() => {
                self.context.cancel(Signal::Reconnect);

                None
            }
            Some(known) => Some(SessionError::new(SessionErrorType::Close {
                code,
                description: Some(known.description()),
            })),
            None => match code {
                // Normal closure without a prior signal: reopen.
                Some(1000 | 1001) | None => {
                    self.context.cancel(Signal::Reconnect);

                    None
                }
                Some(_) => Some(SessionError::new(SessionErrorType::Close {
                    code,
                    description: None,
                })),
            },
        }
    }
}

/// Read one envelope during the handshake, skipping control frames.
async fn read_envelope(
    rx: &mut UnboundedReceiver<Message>,
    inflater: &mut Inflater,
) -> Result<Envelope, SessionError> {
    loop {
        let msg = rx.recv().await.ok_or_else(|| {
            SessionError::new(SessionErrorType::Close {
                code: None,
                description: None,
            })
        })?;

        match msg {
            Message::Text(json) => {
                return Envelope::from_json(json.as_bytes()).map_err(|source| {
                    SessionError::with_source(SessionErrorType::ParsingPayload, source)
                })
            }
            Message::Binary(bytes) => {
                let inflated = inflater.inflate(&bytes).map_err(|source| {
                    SessionError::with_source(SessionErrorType::Decompressing, source)
                })?;

                return Envelope::from_json(inflated).map_err(|source| {
                    SessionError::with_source(SessionErrorType::ParsingPayload, source)
                });
            }
            Message::Close(frame) => {
                let code = frame.as_ref().map(|frame| u16::from(frame.code));
                let description = code
                    .and_then(CloseCode::from_code)
                    .map(CloseCode::description);

                return Err(SessionError::new(SessionErrorType::Close {
                    code,
                    description,
                }));
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

/// Parse an envelope's data into a payload type.
fn parse_data<T: serde::de::DeserializeOwned>(envelope: &Envelope) -> Result<T, SessionError> {
    let raw = envelope
        .d
        .as_deref()
        .ok_or_else(|| SessionError::new(SessionErrorType::ParsingPayload))?;

    serde_json::from_str(raw.get())
        .map_err(|source| SessionError::with_source(SessionErrorType::ParsingPayload, source))
}

/// Deserialize a dispatch and deliver it to the registry.
///
/// Unknown event names are dropped with a log.
fn dispatch_raw(registry: &Registry, name: &str, data: Option<&RawValue>) {
    let Some(kind) = EventType::from_name(name) else {
        #[cfg(feature = "tracing")]
        tracing::warn!(name, "dropping unknown event");

        return;
    };

    let event = if kind == EventType::Resumed {
        Event::Resumed
    } else {
        let Some(data) = data else {
            #[cfg(feature = "tracing")]
            tracing::warn!(name, "dispatch carried no data");

            return;
        };

        match Event::from_parts(kind, data) {
            Ok(event) => event,
            Err(_source) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(name, "failed to deserialize event: {_source}");

                return;
            }
        }
    };

    registry.dispatch(event);
}

/// Build the identify payload from the configuration and the registry's
/// inferred intents.
fn build_identify(config: &Config, registry: &Registry) -> Identify {
    let properties = config
        .identify_properties
        .clone()
        .unwrap_or_else(default_identify_properties);

    Identify::new(IdentifyInfo {
        token: config.token.clone(),
        properties,
        compress: config.compress,
        large_threshold: config.large_threshold,
        shard: config.shard,
        presence: config.presence.clone(),
        intents: config.intents | registry.intents(),
    })
}

/// Build the resume payload for a preserved session.
fn build_resume(config: &Config, seq: u64, session_id: &str) -> Resume {
    Resume::new(seq, session_id, config.token.clone())
}

/// Runtime labels reported when the user has not customized them.
fn default_identify_properties() -> IdentifyProperties {
    IdentifyProperties::new("accord.rs", "accord.rs", OS)
}

//! Authenticated session and its token refresh.
//!
//! All session mutations (login, sign-up, refresh, avatar change, logout) are
//! applied by one actor task that owns the state. Readers see snapshots
//! through a `watch` channel, so `current()` and `authorize()` never wait on
//! the actor.
//!
//! Every installed session gets a generation number and exactly one refresh
//! task. Installing a new session cancels the previous task and waits for it
//! to exit before spawning the next one; a refresh result tagged with an old
//! generation is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use goodtrip_types::api::AuthenticationResponse;
use goodtrip_types::models::UserId;

use crate::auth::{AuthApi, Credentials, SignUpForm};
use crate::error::{ClientError, ClientResult};

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub handle: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub token: String,
}

impl Session {
    fn from_response(response: AuthenticationResponse) -> ClientResult<Self> {
        if response.token.trim().is_empty() {
            return Err(ClientError::decode("authentication response carried an empty token"));
        }
        Ok(Self {
            user_id: response.id,
            display_name: format!("{} {}", response.name, response.surname),
            handle: response.handle,
            avatar_url: response.url,
            token: response.token,
        })
    }
}

/// What an authenticated call needs: who, with which token, and the
/// session-scoped cancellation token (cancelled on logout or re-login).
#[derive(Debug, Clone)]
pub struct Authorization {
    pub user_id: UserId,
    pub token: String,
    pub cancel: CancellationToken,
}

#[derive(Clone)]
struct Current {
    session: Session,
    generation: u64,
    cancel: CancellationToken,
}

enum Command {
    Install {
        session: Session,
        credentials: Credentials,
        reply: oneshot::Sender<Session>,
    },
    Refreshed {
        generation: u64,
        response: AuthenticationResponse,
    },
    SetAvatar {
        generation: u64,
        url: String,
        reply: oneshot::Sender<Option<Session>>,
    },
    Logout {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to the session actor. Cheap to clone; the actor stops once the
/// last handle is dropped.
#[derive(Clone)]
pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    commands: mpsc::Sender<Command>,
    current: watch::Receiver<Option<Current>>,
    live_refresh_tasks: Arc<AtomicUsize>,
}

impl SessionManager {
    /// Spawns the actor on the current Tokio runtime.
    pub fn new(api: Arc<dyn AuthApi>, refresh_interval: Duration) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (current_tx, current_rx) = watch::channel(None);
        let live_refresh_tasks = Arc::new(AtomicUsize::new(0));

        let actor = SessionActor {
            api: api.clone(),
            refresh_interval,
            commands_tx: commands_tx.downgrade(),
            current: current_tx,
            active: None,
            next_generation: 1,
            live_refresh_tasks: live_refresh_tasks.clone(),
        };
        tokio::spawn(actor.run(commands_rx));

        Self {
            api,
            commands: commands_tx,
            current: current_rx,
            live_refresh_tasks,
        }
    }

    pub async fn login(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> ClientResult<Session> {
        let credentials = Credentials::new(username, password);
        let response = self.api.login(&credentials).await?;
        let session = Session::from_response(response)?;
        info!("Logged in as {} ({})", session.handle, session.user_id);
        self.install(session, credentials).await
    }

    pub async fn sign_up(&self, form: SignUpForm) -> ClientResult<Session> {
        let response = self.api.register(&form).await?;
        let session = Session::from_response(response)?;
        info!("Registered {} ({})", session.handle, session.user_id);
        self.install(session, form.credentials).await
    }

    /// Clears the session, cancels its refresh task and aborts in-flight
    /// authenticated calls. A no-op when nobody is logged in.
    pub async fn logout(&self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(Command::Logout { reply }).await.is_ok() {
            let _ = done.await;
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.current.borrow().is_some()
    }

    pub fn current(&self) -> Option<Session> {
        self.current.borrow().as_ref().map(|c| c.session.clone())
    }

    /// Fails with `NotAuthenticated` when there is no session, so callers can
    /// bail out before building a request.
    pub fn authorize(&self) -> ClientResult<Authorization> {
        self.current
            .borrow()
            .as_ref()
            .map(|c| Authorization {
                user_id: c.session.user_id,
                token: c.session.token.clone(),
                cancel: c.cancel.clone(),
            })
            .ok_or(ClientError::NotAuthenticated)
    }

    /// Subscribe to session changes (login, refresh, logout).
    pub fn watch(&self) -> watch::Receiver<Option<Session>> {
        let mut source = self.current.clone();
        let initial = source.borrow_and_update().as_ref().map(|c| c.session.clone());
        let (tx, rx) = watch::channel(initial);
        tokio::spawn(async move {
            while source.changed().await.is_ok() {
                let snapshot = source.borrow_and_update().as_ref().map(|c| c.session.clone());
                if tx.send(snapshot).is_err() {
                    break;
                }
            }
        });
        rx
    }

    /// Number of refresh tasks currently alive. At most one while logged in.
    pub fn active_refresh_tasks(&self) -> usize {
        self.live_refresh_tasks.load(Ordering::SeqCst)
    }

    pub async fn update_photo(&self, url: impl Into<String>) -> ClientResult<Session> {
        let url = url.into();
        let (auth, generation) = {
            let current = self.current.borrow();
            let c = current.as_ref().ok_or(ClientError::NotAuthenticated)?;
            (
                Authorization {
                    user_id: c.session.user_id,
                    token: c.session.token.clone(),
                    cancel: c.cancel.clone(),
                },
                c.generation,
            )
        };

        self.api
            .update_photo(auth.user_id, &url, &auth.token, &auth.cancel)
            .await?;

        let (reply, updated) = oneshot::channel();
        self.send(Command::SetAvatar { generation, url, reply }).await?;
        updated
            .await
            .map_err(|_| ClientError::Cancelled)?
            .ok_or(ClientError::NotAuthenticated)
    }

    async fn install(&self, session: Session, credentials: Credentials) -> ClientResult<Session> {
        let (reply, installed) = oneshot::channel();
        self.send(Command::Install { session, credentials, reply }).await?;
        installed.await.map_err(|_| ClientError::Cancelled)
    }

    async fn send(&self, command: Command) -> ClientResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ClientError::Cancelled)
    }
}

struct ActiveSession {
    current: Current,
    refresh: JoinHandle<()>,
}

struct SessionActor {
    api: Arc<dyn AuthApi>,
    refresh_interval: Duration,
    /// Weak so that refresh tasks don't keep the actor alive.
    commands_tx: mpsc::WeakSender<Command>,
    current: watch::Sender<Option<Current>>,
    active: Option<ActiveSession>,
    next_generation: u64,
    live_refresh_tasks: Arc<AtomicUsize>,
}

impl SessionActor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Install {
                    session,
                    credentials,
                    reply,
                } => {
                    // The old snapshot stays published until the new one
                    // replaces it, so readers never see a gap.
                    self.retire_active().await;
                    let installed = self.start(session, credentials);
                    let _ = reply.send(installed);
                }
                Command::Refreshed {
                    generation,
                    response,
                } => self.apply_refresh(generation, response),
                Command::SetAvatar {
                    generation,
                    url,
                    reply,
                } => {
                    let _ = reply.send(self.set_avatar(generation, url));
                }
                Command::Logout { reply } => {
                    if let Some(active) = &self.active {
                        info!("Logging out {}", active.current.session.handle);
                    }
                    self.end_active().await;
                    let _ = reply.send(());
                }
            }
        }

        self.end_active().await;
        debug!("Session actor stopped");
    }

    fn start(&mut self, session: Session, credentials: Credentials) -> Session {
        let generation = self.next_generation;
        self.next_generation += 1;

        let cancel = CancellationToken::new();
        let guard = LiveTask::enter(&self.live_refresh_tasks);
        let refresh = tokio::spawn(run_refresh_loop(
            self.api.clone(),
            credentials,
            generation,
            self.refresh_interval,
            cancel.clone(),
            self.commands_tx.clone(),
            guard,
        ));

        let current = Current {
            session: session.clone(),
            generation,
            cancel,
        };
        self.current.send_replace(Some(current.clone()));
        self.active = Some(ActiveSession { current, refresh });

        debug!("Session generation {} installed", generation);
        session
    }

    /// Publish the logged-out state, then retire the active session.
    async fn end_active(&mut self) {
        if self.active.is_none() {
            return;
        }
        self.current.send_replace(None);
        self.retire_active().await;
    }

    /// Cancel the active session and wait for its refresh task to exit.
    /// The published snapshot is left as it is.
    async fn retire_active(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        active.current.cancel.cancel();
        if let Err(e) = active.refresh.await {
            warn!("Refresh task for generation {} ended abnormally: {}", active.current.generation, e);
        }
    }

    fn apply_refresh(&mut self, generation: u64, response: AuthenticationResponse) {
        let Some(active) = self.active.as_mut() else {
            debug!("Discarding refresh for generation {}: logged out", generation);
            return;
        };
        if active.current.generation != generation {
            debug!(
                "Discarding refresh for generation {}: generation {} is active",
                generation, active.current.generation
            );
            return;
        }

        match Session::from_response(response) {
            Ok(session) => {
                active.current.session = session;
                self.current.send_replace(Some(active.current.clone()));
                debug!("Token refreshed for generation {}", generation);
            }
            Err(e) => warn!("Ignoring refresh for generation {}: {}", generation, e),
        }
    }

    fn set_avatar(&mut self, generation: u64, url: String) -> Option<Session> {
        let active = self.active.as_mut()?;
        if active.current.generation != generation {
            return None;
        }
        active.current.session.avatar_url = Some(url);
        self.current.send_replace(Some(active.current.clone()));
        Some(active.current.session.clone())
    }
}

/// Counts a refresh task as alive for as long as it is held.
struct LiveTask(Arc<AtomicUsize>);

impl LiveTask {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for LiveTask {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Re-run login every `interval` until cancelled. A failed refresh is
/// logged and retried on the next tick.
async fn run_refresh_loop(
    api: Arc<dyn AuthApi>,
    credentials: Credentials,
    generation: u64,
    interval: Duration,
    cancel: CancellationToken,
    commands: mpsc::WeakSender<Command>,
    _live: LiveTask,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = api.login(&credentials) => result,
        };

        match result {
            Ok(response) => {
                let Some(commands) = commands.upgrade() else {
                    break;
                };
                // The actor may be waiting on this task after cancelling it.
                let sent = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = commands.send(Command::Refreshed { generation, response }) => sent,
                };
                if sent.is_err() {
                    break;
                }
            }
            Err(e) => warn!("Token refresh for generation {} failed: {}", generation, e),
        }
    }

    debug!("Refresh task for generation {} stopped", generation);
}

//! Periodic fetch-and-reconcile loop.
//!
//! Each pass fetches the current user, all messages and all groups, resolves
//! the user identities the pass needs (cached for [`DIRECTORY_TTL`]), and
//! hands everything to [`ChatStore::reconcile_pass`] under a single write
//! lock. Passes are numbered; the store drops the result of any pass older
//! than one it already applied.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::CoreError;
use crate::constants::DIRECTORY_TTL_SECS;
use crate::models::{Identity, UserProfile};
use crate::reconcile::{identities_to_resolve, IdentityResolver};
use crate::store::{ChatStore, TokenStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    Reconciled { pass: u64 },
    /// Transient failure; prior state is kept and the next tick retries
    PassFailed { pass: u64, error: String },
    NotAuthenticated,
}

/// How long a resolved profile is trusted before it is looked up again
pub const DIRECTORY_TTL: Duration = Duration::from_secs(DIRECTORY_TTL_SECS);

/// Resolved user profiles with the time they were fetched.
///
/// Expired entries are still served; they only make the next pass look the
/// identity up again, and a failed refresh keeps the old profile.
#[derive(Debug, Default)]
struct Directory {
    entries: HashMap<Identity, (UserProfile, Instant)>,
}

impl Directory {
    fn is_fresh(&self, id: &Identity, ttl: Duration) -> bool {
        self.entries
            .get(id)
            .is_some_and(|(_, fetched)| fetched.elapsed() < ttl)
    }

    fn insert(&mut self, id: Identity, profile: UserProfile) {
        self.entries.insert(id, (profile, Instant::now()));
    }
}

impl IdentityResolver for Directory {
    fn resolve(&self, id: &Identity) -> Option<UserProfile> {
        self.entries.get(id).map(|(profile, _)| profile.clone())
    }
}

pub struct Poller {
    api: ApiClient,
    store: Arc<RwLock<ChatStore>>,
    tokens: TokenStore,
    next_pass: AtomicU64,
    directory: Mutex<Directory>,
    directory_ttl: Duration,
}

impl Poller {
    pub fn new(api: ApiClient, store: Arc<RwLock<ChatStore>>, tokens: TokenStore) -> Self {
        Self {
            api,
            store,
            tokens,
            next_pass: AtomicU64::new(0),
            directory: Mutex::new(Directory::default()),
            directory_ttl: DIRECTORY_TTL,
        }
    }

    pub fn with_directory_ttl(mut self, ttl: Duration) -> Self {
        self.directory_ttl = ttl;
        self
    }

    pub fn store(&self) -> &Arc<RwLock<ChatStore>> {
        &self.store
    }

    /// Run one pass. `Ok(false)` means the result was superseded by a newer
    /// pass and discarded.
    pub async fn run_pass_once(&self) -> Result<bool, CoreError> {
        let pass = self.next_pass.fetch_add(1, Ordering::SeqCst) + 1;
        self.run_pass(pass).await
    }

    async fn run_pass(&self, pass: u64) -> Result<bool, CoreError> {
        let token = self.tokens.token()?.ok_or(CoreError::NotAuthenticated)?;
        let api = self.api.clone().with_token(token);

        let me = api.current_user().await?;
        let (messages, groups) = tokio::try_join!(api.messages(), api.groups())?;
        debug!(
            pass,
            messages = messages.len(),
            groups = groups.len(),
            "fetched poll data"
        );

        self.resolve_identities(&api, identities_to_resolve(&me.id, &messages, &groups))
            .await;

        let directory = self.directory.lock();
        let applied = self
            .store
            .write()
            .reconcile_pass(pass, me, &messages, &groups, &*directory);
        Ok(applied)
    }

    /// Look up every identity without a fresh directory entry, concurrently.
    /// A failed lookup keeps whatever profile was cached (or none, and the
    /// reconciler falls back to the raw id); the next pass tries again.
    async fn resolve_identities(&self, api: &ApiClient, ids: Vec<Identity>) {
        let missing: Vec<Identity> = {
            let directory = self.directory.lock();
            ids.into_iter()
                .filter(|id| !directory.is_fresh(id, self.directory_ttl))
                .collect()
        };
        if missing.is_empty() {
            return;
        }

        let results = api.get_users(&missing).await;
        let mut directory = self.directory.lock();
        for (id, result) in missing.into_iter().zip(results) {
            match result {
                Ok(user) => {
                    directory.insert(id, user.profile());
                }
                Err(e) => warn!("could not resolve user {}: {}", id, e),
            }
        }
    }

    /// Start polling: one pass right away, then one per `interval`.
    pub fn spawn(self, interval: Duration) -> PollerHandle {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let poller = Arc::new(self);
        let task = tokio::spawn(async move {
            info!(interval_ms = interval.as_millis() as u64, "poller started");
            let mut tick = tokio::time::interval(interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                let pass = poller.next_pass.fetch_add(1, Ordering::SeqCst) + 1;
                let event = match poller.run_pass(pass).await {
                    Ok(true) => PollEvent::Reconciled { pass },
                    Ok(false) => continue,
                    Err(e) if e.is_auth_failure() => {
                        debug!(pass, "skipping pass: {}", e);
                        PollEvent::NotAuthenticated
                    }
                    Err(e) => {
                        warn!(pass, "poll pass failed: {}", e);
                        PollEvent::PassFailed {
                            pass,
                            error: e.to_string(),
                        }
                    }
                };
                if event_tx.send(event).is_err() {
                    break;
                }
            }
            info!("poller stopped");
        });
        PollerHandle {
            task,
            events: event_rx,
        }
    }
}

/// Owns the polling task. Dropping the handle stops polling.
pub struct PollerHandle {
    task: JoinHandle<()>,
    events: mpsc::UnboundedReceiver<PollEvent>,
}

impl PollerHandle {
    /// Stop the timer. A pass caught mid-fetch is abandoned before it
    /// touches the store.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Next event, or `None` once the poller has stopped
    pub async fn next_event(&mut self) -> Option<PollEvent> {
        self.events.recv().await
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

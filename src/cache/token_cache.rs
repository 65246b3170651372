use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::token::Token;
use crate::error::Error;
use crate::observability::metrics::get_metrics;
use crate::sources::FetchToken;

/// Outcome published by the fetch task; `None` until it lands.
type FetchOutcome = Option<Result<Token, Error>>;

enum Slot {
    Absent,
    /// A fetch is running; waiters subscribe to its outcome.
    Fetching(watch::Receiver<FetchOutcome>),
    Present(Token),
}

struct Inner<S> {
    source: S,
    slot: Mutex<Slot>,
    invalidations: AtomicU64,
}

/// Holds at most one token and collapses concurrent misses into one fetch.
///
/// Cloning shares the same slot.
pub struct TokenCache<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for TokenCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: FetchToken> TokenCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                slot: Mutex::new(Slot::Absent),
                invalidations: AtomicU64::new(0),
            }),
        }
    }

    /// Current token, fetching one if the cache is empty.
    ///
    /// Callers arriving while a fetch is in flight wait for that fetch and get
    /// its result, success or failure; only one request reaches the provider.
    pub async fn get(&self) -> Result<Token, Error> {
        let mut rx = {
            let mut slot = lock(&self.inner.slot);
            let in_flight = match &*slot {
                Slot::Present(token) => return Ok(token.clone()),
                Slot::Fetching(rx) => Some(rx.clone()),
                Slot::Absent => None,
            };
            match in_flight {
                Some(rx) => {
                    debug!("joining in-flight token fetch");
                    rx
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    *slot = Slot::Fetching(rx.clone());
                    self.spawn_fetch(tx);
                    rx
                }
            }
        };

        let outcome = match rx.wait_for(|outcome| outcome.is_some()).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };

        match outcome {
            Some(result) => result,
            None => {
                // fetch task went away without reporting
                self.abandon(&rx);
                Err(Error::ProviderUnavailable("token fetch aborted".into()))
            }
        }
    }

    /// Drop the present token. No-op when the cache is empty.
    ///
    /// While a fetch is in flight this does nothing: the fetch keeps running
    /// and its token is stored as fresh when it lands.
    pub fn invalidate(&self) {
        let mut slot = lock(&self.inner.slot);
        let present = match &*slot {
            Slot::Present(_) => true,
            Slot::Fetching(_) => {
                debug!("invalidate during in-flight fetch, its result will be kept");
                false
            }
            Slot::Absent => false,
        };
        if present {
            self.clear(&mut slot);
        }
    }

    /// Drop the present token only if it is `rejected`.
    ///
    /// A caller whose request failed with an older token must not wipe the
    /// one another caller has already fetched in its place.
    pub fn invalidate_if(&self, rejected: &Token) {
        let mut slot = lock(&self.inner.slot);
        let stale = match &*slot {
            Slot::Present(token) => token == rejected,
            Slot::Fetching(_) | Slot::Absent => false,
        };
        if stale {
            self.clear(&mut slot);
        } else {
            debug!("rejected token already replaced");
        }
    }

    /// Number of tokens dropped so far.
    pub fn invalidations(&self) -> u64 {
        self.inner.invalidations.load(Ordering::Relaxed)
    }

    /// Peek at the present token without fetching.
    pub fn current(&self) -> Option<Token> {
        match &*lock(&self.inner.slot) {
            Slot::Present(token) => Some(token.clone()),
            Slot::Absent | Slot::Fetching(_) => None,
        }
    }

    /// Run the fetch on its own task so a cancelled caller cannot strand the
    /// other waiters.
    fn spawn_fetch(&self, tx: watch::Sender<FetchOutcome>) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            info!("fetching token from identity provider");
            let outcome = inner.source.fetch().await;

            let next = match &outcome {
                Ok(token) => {
                    info!("token fetched");
                    Slot::Present(token.clone())
                }
                Err(err) => {
                    warn!("token fetch failed: {}", err);
                    Slot::Absent
                }
            };
            // state change and publication under one lock
            {
                let mut slot = lock(&inner.slot);
                *slot = next;
                tx.send_replace(Some(outcome));
            }
        });
    }

    fn clear(&self, slot: &mut Slot) {
        *slot = Slot::Absent;
        self.inner.invalidations.fetch_add(1, Ordering::Relaxed);
        get_metrics().token_invalidations.inc();
        info!("cached token invalidated");
    }

    fn abandon(&self, rx: &watch::Receiver<FetchOutcome>) {
        let mut slot = lock(&self.inner.slot);
        if let Slot::Fetching(current) = &*slot {
            if current.same_channel(rx) {
                *slot = Slot::Absent;
            }
        }
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

//! Channel-driven mocks for the streaming transport and the historical
//! mention query. Tests script a stream by pushing items through its
//! controller; a dropped or silent controller behaves like a dead socket.

use futures::future::BoxFuture;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use streamwarden::{
    AccountId, FeedStream, MentionHistory, MentionRecord, RawFeedEvent, StreamFilter, StreamItem,
    StreamTransport, TrackedAccount, TransportError,
};
use tokio::sync::mpsc;

/// Test-side handle for one opened stream.
#[derive(Clone)]
pub struct StreamController {
    tx: mpsc::UnboundedSender<StreamItem>,
    aborted: Arc<AtomicBool>,
    idle_hint: Arc<Mutex<Option<Duration>>>,
}

impl StreamController {
    pub fn send(&self, event: RawFeedEvent) {
        let _ = self.tx.send(StreamItem::Event(event));
    }

    pub fn end(&self, status: u16) {
        let _ = self.tx.send(StreamItem::End(status));
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    pub fn idle_hint(&self) -> Option<Duration> {
        *self.idle_hint.lock().expect("idle hint mutex poisoned")
    }
}

struct ScriptedStream {
    rx: mpsc::UnboundedReceiver<StreamItem>,
    aborted: Arc<AtomicBool>,
    idle_hint: Arc<Mutex<Option<Duration>>>,
}

impl FeedStream for ScriptedStream {
    fn next_event(&mut self) -> BoxFuture<'_, StreamItem> {
        Box::pin(async move {
            match self.rx.recv().await {
                Some(item) => item,
                // All controller handles dropped without an explicit end:
                // the connection has gone silent.
                None => std::future::pending().await,
            }
        })
    }

    fn set_idle_timeout(&mut self, timeout: Duration) {
        *self.idle_hint.lock().expect("idle hint mutex poisoned") = Some(timeout);
    }

    fn abort(&mut self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.rx.close();
    }
}

#[derive(Default)]
pub struct MockTransport {
    controllers: Mutex<HashMap<AccountId, Vec<StreamController>>>,
    open_failures: Mutex<HashMap<AccountId, VecDeque<TransportError>>>,
    opens: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Total number of open attempts, successful or not.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn opens_for(&self, account: &AccountId) -> usize {
        self.controllers
            .lock()
            .expect("controller map mutex poisoned")
            .get(account)
            .map_or(0, Vec::len)
    }

    /// Queues a failure for the account's next open attempt.
    pub fn fail_next_open(&self, account: &AccountId, status: Option<u16>, message: &str) {
        let error = match status {
            Some(code) => TransportError::with_status(code, message),
            None => TransportError::new(message),
        };
        self.open_failures
            .lock()
            .expect("open failure map mutex poisoned")
            .entry(account.clone())
            .or_default()
            .push_back(error);
    }

    /// Controller of the account's most recently opened stream.
    pub fn controller(&self, account: &AccountId) -> Option<StreamController> {
        self.controllers
            .lock()
            .expect("controller map mutex poisoned")
            .get(account)
            .and_then(|streams| streams.last().cloned())
    }

    pub async fn wait_for_stream(
        &self,
        account: &AccountId,
        timeout: Duration,
    ) -> StreamController {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(controller) = self.controller(account) {
                return controller;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("no stream opened for {account} within {timeout:?}");
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl StreamTransport for MockTransport {
    fn open<'a>(
        &'a self,
        account: &'a TrackedAccount,
        _filter: &'a StreamFilter,
    ) -> BoxFuture<'a, Result<Box<dyn FeedStream>, TransportError>> {
        Box::pin(async move {
            self.opens.fetch_add(1, Ordering::SeqCst);

            let scripted_failure = self
                .open_failures
                .lock()
                .expect("open failure map mutex poisoned")
                .get_mut(&account.id)
                .and_then(VecDeque::pop_front);
            if let Some(error) = scripted_failure {
                return Err(error);
            }

            let (tx, rx) = mpsc::unbounded_channel();
            let aborted = Arc::new(AtomicBool::new(false));
            let idle_hint = Arc::new(Mutex::new(None));
            let controller = StreamController {
                tx,
                aborted: aborted.clone(),
                idle_hint: idle_hint.clone(),
            };
            self.controllers
                .lock()
                .expect("controller map mutex poisoned")
                .entry(account.id.clone())
                .or_default()
                .push(controller);

            Ok(Box::new(ScriptedStream {
                rx,
                aborted,
                idle_hint,
            }) as Box<dyn FeedStream>)
        })
    }
}

#[derive(Default)]
pub struct MockHistory {
    pages: Mutex<HashMap<AccountId, Vec<MentionRecord>>>,
    queries: AtomicUsize,
}

impl MockHistory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_page(&self, account: &AccountId, records: Vec<MentionRecord>) {
        self.pages
            .lock()
            .expect("history page mutex poisoned")
            .insert(account.clone(), records);
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl MentionHistory for MockHistory {
    fn fetch_recent_mentions<'a>(
        &'a self,
        account: &'a TrackedAccount,
        limit: usize,
    ) -> BoxFuture<'a, anyhow::Result<Vec<MentionRecord>>> {
        Box::pin(async move {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let page = self
                .pages
                .lock()
                .expect("history page mutex poisoned")
                .get(&account.id)
                .cloned()
                .unwrap_or_default();
            Ok(page.into_iter().take(limit).collect())
        })
    }
}

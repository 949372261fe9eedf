//! In-process fake backend for unit tests
//!
//! [`FakeCompanionApi`] keeps a tiny server-side model in memory: a companion
//! catalog and per-(companion, session) message lists. Sends append the user
//! message plus a canned reply and return the full thread, exactly like the
//! real backend.
//!
//! Knobs for exercising failure and timing paths:
//!
//! - [`FakeCompanionApi::fail_sends`] / [`FakeCompanionApi::fail_loads`]
//!   make the matching calls return errors.
//! - [`FakeCompanionApi::hold_sends`] parks every send until
//!   [`FakeCompanionApi::release_sends`] is called;
//!   [`FakeCompanionApi::hold_loads`] and [`FakeCompanionApi::hold_probes`]
//!   do the same for history fetches and probes.
//! - [`FakeCompanionApi::script_probes`] queues probe outcomes.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use tokio::sync::Semaphore;

use crate::api::{ChatRequest, Companion, CompanionApi, CompanionInput, SendResponse};
use crate::error::{ConfidantError, Result};
use crate::message::{DeliveryState, Message, Role};

type ThreadStore = HashMap<(String, String), Vec<Message>>;

/// Parks callers while held
#[derive(Debug)]
struct Gate {
    held: AtomicBool,
    permits: Semaphore,
}

impl Gate {
    fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
            permits: Semaphore::new(0),
        }
    }

    fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.permits.add_permits(1024);
    }

    async fn pass(&self) {
        if self.held.load(Ordering::SeqCst) {
            let _permit = self.permits.acquire().await;
        }
    }
}

/// In-memory fake for [`CompanionApi`]
#[derive(Debug)]
pub struct FakeCompanionApi {
    companions: Mutex<Vec<Companion>>,
    threads: Mutex<ThreadStore>,
    reply: Mutex<String>,
    probes: Mutex<VecDeque<bool>>,
    probe_default: AtomicBool,
    fail_sends: AtomicBool,
    fail_loads: AtomicBool,
    send_gate: Gate,
    load_gate: Gate,
    probe_gate: Gate,
    send_calls: AtomicUsize,
    load_calls: AtomicUsize,
    probe_calls: AtomicUsize,
}

impl Default for FakeCompanionApi {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCompanionApi {
    /// Creates a fake that replies "Hi there!" and reports the backend online
    pub fn new() -> Self {
        Self {
            companions: Mutex::new(Vec::new()),
            threads: Mutex::new(HashMap::new()),
            reply: Mutex::new("Hi there!".to_string()),
            probes: Mutex::new(VecDeque::new()),
            probe_default: AtomicBool::new(true),
            fail_sends: AtomicBool::new(false),
            fail_loads: AtomicBool::new(false),
            send_gate: Gate::new(),
            load_gate: Gate::new(),
            probe_gate: Gate::new(),
            send_calls: AtomicUsize::new(0),
            load_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
        }
    }

    /// Adds a companion to the catalog
    pub fn with_companion(self, companion: Companion) -> Self {
        self.companions
            .lock()
            .expect("companions lock")
            .push(companion);
        self
    }

    /// Seeds the stored history of a (companion, session) pair
    pub fn seed_thread(&self, companion_id: &str, session_id: &str, messages: Vec<Message>) {
        self.threads
            .lock()
            .expect("threads lock")
            .insert((companion_id.to_string(), session_id.to_string()), messages);
    }

    /// Changes the canned companion reply
    pub fn set_reply(&self, reply: &str) {
        *self.reply.lock().expect("reply lock") = reply.to_string();
    }

    /// Makes subsequent sends fail (or succeed again)
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent loads fail (or succeed again)
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Parks every subsequent send until [`Self::release_sends`]
    pub fn hold_sends(&self) {
        self.send_gate.hold();
    }

    /// Lets all parked and future sends through
    pub fn release_sends(&self) {
        self.send_gate.release();
    }

    /// Parks every subsequent load until [`Self::release_loads`]
    pub fn hold_loads(&self) {
        self.load_gate.hold();
    }

    /// Lets all parked and future loads through
    pub fn release_loads(&self) {
        self.load_gate.release();
    }

    /// Parks every subsequent probe until [`Self::release_probes`]
    pub fn hold_probes(&self) {
        self.probe_gate.hold();
    }

    /// Lets all parked and future probes through
    pub fn release_probes(&self) {
        self.probe_gate.release();
    }

    /// Queues probe outcomes; once drained, probes return `default`
    pub fn script_probes(&self, outcomes: &[bool], default: bool) {
        self.probes
            .lock()
            .expect("probes lock")
            .extend(outcomes.iter().copied());
        self.probe_default.store(default, Ordering::SeqCst);
    }

    /// Number of send requests received
    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    /// Number of load requests received
    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    /// Number of probes received
    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    fn stored_thread(&self, companion_id: &str, session_id: &str) -> Vec<Message> {
        self.threads
            .lock()
            .expect("threads lock")
            .get(&(companion_id.to_string(), session_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl CompanionApi for FakeCompanionApi {
    async fn probe(&self) -> Result<()> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.probe_gate.pass().await;
        let outcome = self
            .probes
            .lock()
            .expect("probes lock")
            .pop_front()
            .unwrap_or_else(|| self.probe_default.load(Ordering::SeqCst));
        if outcome {
            Ok(())
        } else {
            Err(ConfidantError::HealthCheck("HTTP 503 Service Unavailable".to_string()).into())
        }
    }

    async fn list_companions(&self) -> Result<Vec<Companion>> {
        Ok(self.companions.lock().expect("companions lock").clone())
    }

    async fn get_companion(&self, id: &str) -> Result<Companion> {
        self.companions
            .lock()
            .expect("companions lock")
            .iter()
            .find(|c| c.key() == id || c.slug == id)
            .cloned()
            .ok_or_else(|| ConfidantError::CompanionNotFound(id.to_string()).into())
    }

    async fn create_companion(&self, input: &CompanionInput) -> Result<Companion> {
        let mut companion = Companion::new(&input.slug, &input.name, &input.short_bio);
        companion.traits = input.traits.clone();
        self.companions
            .lock()
            .expect("companions lock")
            .push(companion.clone());
        Ok(companion)
    }

    async fn update_companion(&self, id: &str, input: &CompanionInput) -> Result<Companion> {
        let mut companions = self.companions.lock().expect("companions lock");
        let existing = companions
            .iter_mut()
            .find(|c| c.key() == id)
            .ok_or_else(|| ConfidantError::CompanionNotFound(id.to_string()))?;
        existing.name = input.name.clone();
        existing.short_bio = input.short_bio.clone();
        existing.traits = input.traits.clone();
        Ok(existing.clone())
    }

    async fn delete_companion(&self, id: &str) -> Result<()> {
        let mut companions = self.companions.lock().expect("companions lock");
        let before = companions.len();
        companions.retain(|c| c.key() != id);
        if companions.len() == before {
            return Err(ConfidantError::CompanionNotFound(id.to_string()).into());
        }
        Ok(())
    }

    async fn load_thread(&self, companion_id: &str, session_id: &str) -> Result<Vec<Message>> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        self.load_gate.pass().await;
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(ConfidantError::ThreadLoad {
                companion_id: companion_id.to_string(),
                message: "HTTP 500 Internal Server Error".to_string(),
            }
            .into());
        }
        Ok(self.stored_thread(companion_id, session_id))
    }

    async fn send_message(&self, request: &ChatRequest) -> Result<SendResponse> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);

        self.send_gate.pass().await;

        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ConfidantError::Send("connection reset by peer".to_string()).into());
        }

        let reply = self.reply.lock().expect("reply lock").clone();
        let key = (request.companion_id.clone(), request.session_id.clone());
        let now = Utc::now();

        let mut threads = self.threads.lock().expect("threads lock");
        let thread = threads.entry(key).or_default();
        thread.push(Message {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            content: request.message.clone(),
            timestamp: now,
            delivery_state: Some(DeliveryState::Confirmed),
        });
        thread.push(Message {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::Companion,
            content: reply.clone(),
            timestamp: now,
            delivery_state: None,
        });

        Ok(SendResponse {
            reply: Some(reply),
            thread: thread.clone(),
        })
    }
}

//! In-memory [`RemoteSessionProvider`] for tests of the layers above.
//!
//! Every operation answers from a script that tests adjust through
//! `&self` methods, and every call is counted so tests can assert that an
//! operation was (or was not) attempted. Failures are scripted as
//! messages and surface as [`TransportError::Rejected`]; "hang" scripts
//! never resolve, which is how a timeout is simulated under
//! `tokio::time::pause`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lanyard_protocol::{
    AchievementRecord, CompanionEndpoint, Notification, StatRecord, UserInfo,
    ValidateReply, ValidateRequest,
};

use crate::{CredentialRequirements, RemoteSessionProvider, TransportError};

/// An operation of [`RemoteSessionProvider`], for call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Validate,
    Liveness,
    UserInfo,
    Unlock,
    ListAchievements,
    RequestStats,
    StoreStats,
    Notify,
}

/// How a scripted liveness probe answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Alive,
    NotAlive,
    /// Never resolves, so the caller's timeout fires.
    Hang,
}

#[derive(Debug)]
struct Script {
    validate: Result<ValidateReply, String>,
    validate_delay: Option<Duration>,
    validate_hangs: bool,
    /// Answer for the n-th probe (1-based); unlisted probes are `Alive`.
    probes: HashMap<usize, Probe>,
    /// Answer for every probe from this one on.
    probes_from: Option<(usize, Probe)>,
    user: UserInfo,
    stats: Result<Vec<StatRecord>, String>,
    store_failure: Option<String>,
    achievements: Result<Vec<AchievementRecord>, String>,
    unlock_failure: Option<String>,
    op_delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct Log {
    calls: HashMap<MockOp, usize>,
    validate_requests: Vec<(Option<CompanionEndpoint>, ValidateRequest)>,
    stored: Vec<Vec<StatRecord>>,
    unlocked: Vec<String>,
    notifications: Vec<Notification>,
}

/// Scriptable provider. See the module docs.
#[derive(Debug)]
pub struct MockProvider {
    requirements: CredentialRequirements,
    script: Mutex<Script>,
    log: Mutex<Log>,
}

fn rejected(message: &str) -> TransportError {
    TransportError::Rejected {
        status: 500,
        message: message.to_string(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockProvider {
    /// A provider that validates any token as `game_id` / `user_id`.
    pub fn accepting(game_id: &str, user_id: &str) -> Self {
        Self::with_validate(Ok(ValidateReply {
            game_id: game_id.to_string(),
            user_id: user_id.to_string(),
        }))
    }

    /// A provider that rejects validation with `message`.
    pub fn rejecting(message: &str) -> Self {
        Self::with_validate(Err(message.to_string()))
    }

    fn with_validate(validate: Result<ValidateReply, String>) -> Self {
        Self {
            requirements: CredentialRequirements::default(),
            script: Mutex::new(Script {
                validate,
                validate_delay: None,
                validate_hangs: false,
                probes: HashMap::new(),
                probes_from: None,
                user: UserInfo {
                    id: "u1".into(),
                    name: "Player One".into(),
                    email: "one@example.com".into(),
                },
                stats: Ok(Vec::new()),
                store_failure: None,
                achievements: Ok(Vec::new()),
                unlock_failure: None,
                op_delay: None,
            }),
            log: Mutex::new(Log::default()),
        }
    }

    pub fn with_requirements(mut self, requirements: CredentialRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    // -- Script ----------------------------------------------------------

    /// Validation waits `delay` before answering.
    pub fn delay_validate(&self, delay: Duration) {
        lock(&self.script).validate_delay = Some(delay);
    }

    /// Validation never answers.
    pub fn hang_validate(&self) {
        lock(&self.script).validate_hangs = true;
    }

    /// The `n`-th liveness probe (1-based) answers `probe`.
    pub fn script_probe(&self, n: usize, probe: Probe) {
        lock(&self.script).probes.insert(n, probe);
    }

    /// Every probe from the `n`-th on answers `probe`.
    pub fn script_probes_from(&self, n: usize, probe: Probe) {
        lock(&self.script).probes_from = Some((n, probe));
    }

    pub fn set_stats(&self, stats: Vec<StatRecord>) {
        lock(&self.script).stats = Ok(stats);
    }

    pub fn fail_stats(&self, message: &str) {
        lock(&self.script).stats = Err(message.to_string());
    }

    /// `Some(message)` makes every store fail; `None` restores success.
    pub fn fail_store(&self, message: Option<&str>) {
        lock(&self.script).store_failure = message.map(str::to_string);
    }

    pub fn set_achievements(&self, achievements: Vec<AchievementRecord>) {
        lock(&self.script).achievements = Ok(achievements);
    }

    pub fn fail_achievements(&self, message: &str) {
        lock(&self.script).achievements = Err(message.to_string());
    }

    /// `Some(message)` makes every unlock fail; `None` restores success.
    pub fn fail_unlock(&self, message: Option<&str>) {
        lock(&self.script).unlock_failure = message.map(str::to_string);
    }

    /// Stats, store, list and unlock calls wait `delay` before answering.
    pub fn delay_ops(&self, delay: Duration) {
        lock(&self.script).op_delay = Some(delay);
    }

    // -- Log -------------------------------------------------------------

    /// How many times `op` was invoked.
    pub fn calls(&self, op: MockOp) -> usize {
        lock(&self.log).calls.get(&op).copied().unwrap_or(0)
    }

    /// Total calls across all operations.
    pub fn total_calls(&self) -> usize {
        lock(&self.log).calls.values().sum()
    }

    pub fn validate_requests(
        &self,
    ) -> Vec<(Option<CompanionEndpoint>, ValidateRequest)> {
        lock(&self.log).validate_requests.clone()
    }

    /// Every batch passed to a successful `store_stats`, oldest first.
    pub fn stored(&self) -> Vec<Vec<StatRecord>> {
        lock(&self.log).stored.clone()
    }

    /// Ids passed to successful unlocks, oldest first.
    pub fn unlocked(&self) -> Vec<String> {
        lock(&self.log).unlocked.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.log).notifications.clone()
    }

    fn record(&self, op: MockOp) -> usize {
        let mut log = lock(&self.log);
        let count = log.calls.entry(op).or_insert(0);
        *count += 1;
        *count
    }

    async fn op_delay(&self) {
        let delay = lock(&self.script).op_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl RemoteSessionProvider for MockProvider {
    fn requirements(&self) -> CredentialRequirements {
        self.requirements
    }

    async fn validate(
        &self,
        endpoint: Option<&CompanionEndpoint>,
        request: &ValidateRequest,
    ) -> Result<ValidateReply, TransportError> {
        self.record(MockOp::Validate);
        lock(&self.log)
            .validate_requests
            .push((endpoint.cloned(), request.clone()));

        let (answer, delay, hangs) = {
            let script = lock(&self.script);
            (
                script.validate.clone(),
                script.validate_delay,
                script.validate_hangs,
            )
        };
        if hangs {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        answer.map_err(|message| TransportError::Rejected {
            status: 401,
            message,
        })
    }

    async fn check_liveness(&self) -> Result<(), TransportError> {
        let n = self.record(MockOp::Liveness);
        let probe = {
            let script = lock(&self.script);
            match (script.probes.get(&n), script.probes_from) {
                (Some(probe), _) => *probe,
                (None, Some((from, probe))) if n >= from => probe,
                _ => Probe::Alive,
            }
        };
        match probe {
            Probe::Alive => Ok(()),
            Probe::NotAlive => Err(TransportError::NotAlive),
            Probe::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    async fn user_info(&self) -> Result<UserInfo, TransportError> {
        self.record(MockOp::UserInfo);
        Ok(lock(&self.script).user.clone())
    }

    async fn unlock_achievement(&self, id: &str) -> Result<(), TransportError> {
        self.record(MockOp::Unlock);
        self.op_delay().await;
        let failure = lock(&self.script).unlock_failure.clone();
        if let Some(message) = failure {
            return Err(rejected(&message));
        }
        lock(&self.log).unlocked.push(id.to_string());
        Ok(())
    }

    async fn list_achievements(
        &self,
    ) -> Result<Vec<AchievementRecord>, TransportError> {
        self.record(MockOp::ListAchievements);
        self.op_delay().await;
        let answer = lock(&self.script).achievements.clone();
        answer.map_err(|m| rejected(&m))
    }

    async fn request_stats(&self) -> Result<Vec<StatRecord>, TransportError> {
        self.record(MockOp::RequestStats);
        self.op_delay().await;
        let answer = lock(&self.script).stats.clone();
        answer.map_err(|m| rejected(&m))
    }

    async fn store_stats(
        &self,
        stats: &[StatRecord],
    ) -> Result<(), TransportError> {
        self.record(MockOp::StoreStats);
        self.op_delay().await;
        let failure = lock(&self.script).store_failure.clone();
        if let Some(message) = failure {
            return Err(rejected(&message));
        }
        lock(&self.log).stored.push(stats.to_vec());
        Ok(())
    }

    fn notify(&self, notification: Notification) {
        self.record(MockOp::Notify);
        lock(&self.log).notifications.push(notification);
    }
}

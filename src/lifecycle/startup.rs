//! Startup orchestration.
//!
//! Builds the whitelist, limiter and gate either from the last snapshot or,
//! on first start, from the configuration seeds.

use alloy::primitives::Address;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::config::validation::{parse_principal, resolve_limits};
use crate::config::{validate_config, GateConfig, ValidationError};
use crate::error::GateError;
use crate::events::EventBus;
use crate::gate::LedgerGate;
use crate::lifecycle::Shutdown;
use crate::limiter::{LimitConfig, RateLimiter};
use crate::persistence::{ServiceSnapshot, SnapshotStore, StoreError, SNAPSHOT_VERSION};
use crate::whitelist::WhitelistRegistry;

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Config(Vec<ValidationError>),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to seed state: {0}")]
    Seed(#[from] GateError),
}

impl From<Vec<ValidationError>> for StartupError {
    fn from(errors: Vec<ValidationError>) -> Self {
        StartupError::Config(errors)
    }
}

/// Parsed configuration seeds.
struct SeedPlan {
    identity: Address,
    admin: Address,
    fallback: LimitConfig,
    minters: Vec<Address>,
    members: Vec<Address>,
    whitelisters: Vec<Address>,
    managers: Vec<Address>,
    assets: Vec<(Address, LimitConfig)>,
    exemptions: Vec<(Address, Address)>,
}

fn principals(field: &str, values: &[String]) -> Result<Vec<Address>, Vec<ValidationError>> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| parse_principal(&format!("{field}[{i}]"), v))
        .collect::<Result<_, _>>()
        .map_err(|e| vec![e])
}

impl SeedPlan {
    fn from_config(config: &GateConfig) -> Result<Self, Vec<ValidationError>> {
        validate_config(config)?;
        let one = |e: ValidationError| vec![e];

        let assets = config
            .limits
            .assets
            .iter()
            .enumerate()
            .map(|(i, a)| -> Result<(Address, LimitConfig), Vec<ValidationError>> {
                let field = format!("limits.assets[{i}]");
                let asset = parse_principal(&format!("{field}.asset"), &a.asset).map_err(one)?;
                Ok((asset, resolve_limits(&field, &a.limits)?))
            })
            .collect::<Result<_, Vec<ValidationError>>>()?;

        let exemptions = config
            .limits
            .exemptions
            .iter()
            .enumerate()
            .map(|(i, e)| -> Result<(Address, Address), ValidationError> {
                let field = format!("limits.exemptions[{i}]");
                Ok((
                    parse_principal(&format!("{field}.asset"), &e.asset)?,
                    parse_principal(&format!("{field}.account"), &e.account)?,
                ))
            })
            .collect::<Result<_, ValidationError>>()
            .map_err(one)?;

        Ok(Self {
            identity: parse_principal("service.identity", &config.service.identity).map_err(one)?,
            admin: parse_principal("service.admin", &config.service.admin).map_err(one)?,
            fallback: resolve_limits("limits.fallback", &config.limits.fallback)?,
            minters: principals("gate.minters", &config.gate.minters)?,
            members: principals("whitelist.members", &config.whitelist.members)?,
            whitelisters: principals("whitelist.whitelisters", &config.whitelist.whitelisters)?,
            managers: principals("limits.managers", &config.limits.managers)?,
            assets,
            exemptions,
        })
    }
}

/// The running gate plus everything needed to persist it.
#[derive(Debug)]
pub struct GateService {
    gate: Arc<LedgerGate>,
    events: EventBus,
    store: Option<SnapshotStore>,
    clock: Arc<dyn Clock>,
    /// Held for the whole capture and write, so saves land in order.
    save_lock: Mutex<()>,
}

impl GateService {
    /// Restore from the snapshot if one exists, otherwise seed from config.
    pub fn bootstrap(config: &GateConfig, clock: Arc<dyn Clock>) -> Result<Self, StartupError> {
        let plan = SeedPlan::from_config(config)?;
        let events = EventBus::new();
        let store = config
            .persistence
            .enabled
            .then(|| SnapshotStore::new(&config.persistence.snapshot_path));

        let restored = match &store {
            Some(store) => store.load()?,
            None => None,
        };

        let gate = match restored {
            Some(snapshot) => {
                tracing::info!(taken_at = snapshot.taken_at, "Restoring state from snapshot; config seeds ignored");
                restore(&plan, snapshot, clock.clone(), &events)?
            }
            None => {
                tracing::info!(
                    assets = plan.assets.len(),
                    members = plan.members.len(),
                    "No snapshot found; seeding state from config"
                );
                seed(&plan, config, clock.clone(), &events)?
            }
        };

        tracing::info!(
            identity = %gate.identity(),
            settings_version = gate.settings().version,
            "Gate ready"
        );

        Ok(Self {
            gate: Arc::new(gate),
            events,
            store,
            clock,
            save_lock: Mutex::new(()),
        })
    }

    pub fn gate(&self) -> &Arc<LedgerGate> {
        &self.gate
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn store(&self) -> Option<&SnapshotStore> {
        self.store.as_ref()
    }

    /// Capture the current whitelist, limiter and gate state as one
    /// consistent cut.
    pub fn snapshot(&self) -> ServiceSnapshot {
        let (whitelist, limiter, gate) = self.gate.capture();
        ServiceSnapshot {
            version: SNAPSHOT_VERSION,
            taken_at: self.clock.now(),
            whitelist,
            limiter,
            gate,
        }
    }

    /// Persist a snapshot. Returns the file written, or `None` when
    /// persistence is disabled.
    ///
    /// Concurrent callers are serialized.
    pub fn save(&self) -> Result<Option<PathBuf>, StoreError> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let _guard = self.save_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        store.save(&self.snapshot())?;
        Ok(Some(store.path().to_path_buf()))
    }
}

fn restore(
    plan: &SeedPlan,
    snapshot: ServiceSnapshot,
    clock: Arc<dyn Clock>,
    events: &EventBus,
) -> Result<LedgerGate, GateError> {
    let whitelist = Arc::new(WhitelistRegistry::from_snapshot(snapshot.whitelist, events.clone()));
    let limiter = Arc::new(RateLimiter::from_snapshot(
        snapshot.limiter,
        plan.fallback,
        clock,
        events.clone(),
    ));
    LedgerGate::from_snapshot(plan.identity, snapshot.gate, whitelist, limiter, events.clone())
}

fn seed(plan: &SeedPlan, config: &GateConfig, clock: Arc<dyn Clock>, events: &EventBus) -> Result<LedgerGate, GateError> {
    let admin = plan.admin;

    let whitelist = Arc::new(WhitelistRegistry::new(admin, events.clone())?);
    for account in &plan.whitelisters {
        whitelist.add_whitelister(admin, *account)?;
    }
    if !plan.members.is_empty() {
        // Members are written under the admin's own WHITELISTER grant.
        whitelist.add_whitelister(admin, admin)?;
        whitelist.batch_set_whitelisted(admin, &plan.members, true)?;
    }
    whitelist.toggle_whitelisting(admin, config.whitelist.enabled)?;

    let limiter = Arc::new(RateLimiter::new(admin, plan.fallback, clock, events.clone())?);
    limiter.authorize_caller(admin, plan.identity)?;
    for account in &plan.managers {
        limiter.add_limit_manager(admin, *account)?;
    }
    for (asset, limits) in &plan.assets {
        limiter.set_all_default_limits(admin, *asset, *limits)?;
    }
    for (asset, account) in &plan.exemptions {
        limiter.set_exemption(admin, *asset, *account, true)?;
    }

    let gate = LedgerGate::new(plan.identity, admin, whitelist, limiter, events.clone())?;
    for account in &plan.minters {
        gate.add_minter(admin, *account)?;
    }
    gate.update_config(
        admin,
        config.gate.limit_checks_enabled,
        config.gate.whitelist_checks_enabled,
    )?;
    if config.gate.paused {
        gate.pause(admin)?;
    }
    Ok(gate)
}

/// Save a snapshot every `interval` until shutdown.
pub fn spawn_periodic_snapshots(service: Arc<GateService>, interval: Duration, shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let service = service.clone();
                    match tokio::task::spawn_blocking(move || service.save()).await {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => tracing::error!(error = %e, "Periodic snapshot failed"),
                        Err(e) => tracing::error!(error = %e, "Periodic snapshot task panicked"),
                    }
                }
                _ = shutdown.wait() => break,
            }
        }
        tracing::debug!("Periodic snapshot task stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use crate::clock::MockClock;
    use crate::config::{AssetLimitConfig, ExemptionConfig, LimitSettings};
    use alloy::primitives::U256;

    const IDENTITY: &str = "0x6a6a6a6a6a6a6a6a6a6a6a6a6a6a6a6a6a6a6a6a";
    const ADMIN: &str = "0xadadadadadadadadadadadadadadadadadadadad";
    const ASSET: &str = "0x7070707070707070707070707070707070707070";
    const ALICE: &str = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1";

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    fn config() -> GateConfig {
        let mut config = GateConfig::default();
        config.service.identity = IDENTITY.to_string();
        config.service.admin = ADMIN.to_string();
        config.persistence.enabled = false;
        config.whitelist.members = vec![ALICE.to_string()];
        config.gate.minters = vec![ADMIN.to_string()];
        config.limits.assets.push(AssetLimitConfig {
            asset: ASSET.to_string(),
            limits: LimitSettings {
                max_transfer_amount: "1000".to_string(),
                cooldown_secs: 60,
                period_limit: "2000".to_string(),
                period_duration_secs: 86_400,
            },
        });
        config.limits.exemptions.push(ExemptionConfig {
            asset: ASSET.to_string(),
            account: ADMIN.to_string(),
        });
        config
    }

    #[test]
    fn test_seed_from_config() {
        let service = GateService::bootstrap(&config(), Arc::new(MockClock::new(1_000))).unwrap();
        let gate = service.gate();

        assert!(gate.whitelist().is_member(addr(ALICE)));
        assert!(gate.limiter().access().has_role(Role::Caller, addr(IDENTITY)));
        assert!(gate.access().has_role(Role::Minter, addr(ADMIN)));
        assert!(gate.limiter().is_exempt(addr(ASSET), addr(ADMIN)));
        assert_eq!(
            gate.limiter().default_limits(addr(ASSET)).max_transfer_amount,
            U256::from(1000)
        );
        assert!(!gate.settings().paused);
        assert!(service.save().unwrap().is_none());
    }

    #[test]
    fn test_paused_seed() {
        let mut config = config();
        config.gate.paused = true;
        let service = GateService::bootstrap(&config, Arc::new(MockClock::new(0))).unwrap();
        assert!(service.gate().settings().paused);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = config();
        config.service.identity = String::new();
        let err = GateService::bootstrap(&config, Arc::new(MockClock::new(0))).unwrap_err();
        assert!(matches!(err, StartupError::Config(_)));
    }

    #[test]
    fn test_snapshot_takes_clock_time() {
        let clock = MockClock::new(5_000);
        let service = GateService::bootstrap(&config(), Arc::new(clock.clone())).unwrap();
        clock.advance(10);
        assert_eq!(service.snapshot().taken_at, 5_010);
    }

    #[test]
    fn test_concurrent_saves_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut config = config();
        config.persistence.enabled = true;
        config.persistence.snapshot_path = path.to_string_lossy().into_owned();
        let service = Arc::new(GateService::bootstrap(&config, Arc::new(MockClock::new(1_000))).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        assert_eq!(service.save().unwrap(), Some(path_of(&service)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let loaded = service.store().unwrap().load().unwrap().unwrap();
        assert_eq!(loaded, service.snapshot());
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    fn path_of(service: &GateService) -> PathBuf {
        service.store().unwrap().path().to_path_buf()
    }
}

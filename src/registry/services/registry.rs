//! Capability registry: name → implementation, with lazy singletons.

use crate::ability::{
    domain::{AbilityDescriptor, AbilityName, DescriptorError, InvocationRequest, Parameters},
    ports::{Ability, AbilityFault},
    services::{AbilityInstance, LifecycleError},
};
use crate::events::{
    domain::{EventKind, EventPayload},
    services::EventBus,
};
use crate::registry::{
    domain::{DiscoveryFailure, DiscoveryReport, EntryState, RegisteredAbility},
    ports::{AbilityFactory, PluginLocator},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::OnceCell;

/// Request payload for registering an ability.
#[derive(Clone)]
pub struct RegisterAbilityRequest {
    /// Declared descriptor; its name is the registry key.
    pub descriptor: AbilityDescriptor,
    /// Constructor invoked lazily on first use.
    pub factory: Arc<dyn AbilityFactory>,
    /// Free-form registration metadata.
    pub metadata: Parameters,
    /// Replace an existing registration with the same name.
    pub replace: bool,
}

impl std::fmt::Debug for RegisterAbilityRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterAbilityRequest")
            .field("ability", self.descriptor.name())
            .field("replace", &self.replace)
            .finish_non_exhaustive()
    }
}

impl RegisterAbilityRequest {
    /// Creates a registration request.
    #[must_use]
    pub fn new(descriptor: AbilityDescriptor, factory: Arc<dyn AbilityFactory>) -> Self {
        Self {
            descriptor,
            factory,
            metadata: Parameters::new(),
            replace: false,
        }
    }

    /// Registers an already constructed ability.
    ///
    /// Every singleton built for this entry wraps the same implementation.
    #[must_use]
    pub fn from_ability(ability: Arc<dyn Ability>) -> Self {
        let descriptor = ability.descriptor().clone();
        let factory = move || -> Result<Arc<dyn Ability>, AbilityFault> {
            Ok(Arc::clone(&ability))
        };
        Self::new(descriptor, Arc::new(factory))
    }

    /// Sets the registration metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Parameters) -> Self {
        self.metadata = metadata;
        self
    }

    /// Allows replacing an existing registration.
    #[must_use]
    pub const fn replacing(mut self) -> Self {
        self.replace = true;
        self
    }
}

/// Registry errors.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The name is already registered and replacement was not requested.
    #[error("ability {0} is already registered")]
    DuplicateName(AbilityName),

    /// The descriptor failed structural validation.
    #[error("invalid ability implementation: {0}")]
    InvalidImplementation(#[from] DescriptorError),

    /// No entry exists for the name.
    #[error("ability {0} is not registered")]
    NotFound(AbilityName),

    /// Constructing or initialising the singleton failed.
    #[error("failed to instantiate ability {ability}: {reason}")]
    Instantiation {
        /// Ability name.
        ability: AbilityName,
        /// Constructor or initialisation failure.
        reason: String,
    },

    /// The entry was shut down and must be reset before reuse.
    #[error("ability {0} has been shut down")]
    EntryShutdown(AbilityName),

    /// An instance lifecycle hook failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Registry state lock was poisoned.
    #[error("registry state unavailable: {0}")]
    Lock(Arc<dyn std::error::Error + Send + Sync>),
}

impl RegistryError {
    /// Wraps a lock failure.
    #[must_use]
    pub fn lock(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Lock(Arc::new(err))
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

type InstanceCell = Arc<OnceCell<Arc<AbilityInstance>>>;

/// What `get_instance` found when it went back to the entry after
/// construction.
enum InstanceClaim {
    /// The entry is unchanged; the instance may be handed out.
    Live { first_use: bool },
    /// The entry changed underneath; `None` means look the entry up again.
    Stale(Option<RegistryError>),
}

struct RegistryEntry {
    descriptor: Arc<AbilityDescriptor>,
    factory: Arc<dyn AbilityFactory>,
    metadata: Parameters,
    registered_at: DateTime<Utc>,
    state: EntryState,
    instance: InstanceCell,
    generation: u64,
}

impl RegistryEntry {
    fn snapshot(&self) -> RegisteredAbility {
        RegisteredAbility::new(
            self.descriptor.as_ref().clone(),
            self.state,
            self.metadata.clone(),
            self.registered_at,
        )
    }
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<AbilityName, RegistryEntry>,
    generation: u64,
}

/// Maps ability names to implementations and caches one instance per name.
///
/// `get_instance` is safe under concurrent first calls: exactly one
/// constructor runs, and every caller receives the same instance.
pub struct CapabilityRegistry<C>
where
    C: Clock + Send + Sync,
{
    state: RwLock<RegistryState>,
    events: Option<Arc<EventBus<C>>>,
    clock: Arc<C>,
}

impl<C> std::fmt::Debug for CapabilityRegistry<C>
where
    C: Clock + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("events", &self.events.is_some())
            .finish_non_exhaustive()
    }
}

impl<C> CapabilityRegistry<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new(clock: Arc<C>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            events: None,
            clock,
        }
    }

    /// Publishes registry events on `bus`.
    #[must_use]
    pub fn with_event_bus(mut self, bus: Arc<EventBus<C>>) -> Self {
        self.events = Some(bus);
        self
    }

    /// Registers an ability under its descriptor name.
    ///
    /// When replacing, a live instance of the previous registration is shut
    /// down.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidImplementation`] for malformed
    /// descriptors and [`RegistryError::DuplicateName`] when the name is
    /// taken and `replace` is not set.
    pub async fn register(&self, request: RegisterAbilityRequest) -> RegistryResult<()> {
        request.descriptor.check_structure()?;
        let name = request.descriptor.name().clone();

        let replaced = {
            let mut state = self.write_state()?;
            if state.entries.contains_key(&name) && !request.replace {
                return Err(RegistryError::DuplicateName(name));
            }
            state.generation += 1;
            let entry = RegistryEntry {
                descriptor: Arc::new(request.descriptor),
                factory: request.factory,
                metadata: request.metadata,
                registered_at: self.clock.utc(),
                state: EntryState::Registered,
                instance: Arc::new(OnceCell::new()),
                generation: state.generation,
            };
            state.entries.insert(name.clone(), entry)
        };

        if let Some(previous) = replaced {
            tracing::debug!(ability = %name, "replacing existing registration");
            shutdown_cached(&name, &previous.instance).await;
        }

        self.emit(
            EventKind::AbilityRegistered,
            EventPayload::new().with_ability(name),
        );
        Ok(())
    }

    /// Returns the factory registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown names.
    pub fn resolve(&self, name: &AbilityName) -> RegistryResult<Arc<dyn AbilityFactory>> {
        let state = self.read_state()?;
        state
            .entries
            .get(name)
            .map(|entry| Arc::clone(&entry.factory))
            .ok_or_else(|| RegistryError::NotFound(name.clone()))
    }

    /// Returns a snapshot of the entry registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown names.
    pub fn describe(&self, name: &AbilityName) -> RegistryResult<RegisteredAbility> {
        let state = self.read_state()?;
        state
            .entries
            .get(name)
            .map(RegistryEntry::snapshot)
            .ok_or_else(|| RegistryError::NotFound(name.clone()))
    }

    /// Returns the cached singleton, constructing and initialising it on
    /// first use.
    ///
    /// An instance whose entry was shut down, reset or replaced while it was
    /// being constructed is shut down instead of being handed out; after a
    /// reset or replacement the lookup starts over against the new entry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`], [`RegistryError::EntryShutdown`]
    /// or [`RegistryError::Instantiation`].
    pub async fn get_instance(&self, name: &AbilityName) -> RegistryResult<Arc<AbilityInstance>> {
        loop {
            let (cell, factory, generation) = {
                let state = self.read_state()?;
                let entry = state
                    .entries
                    .get(name)
                    .ok_or_else(|| RegistryError::NotFound(name.clone()))?;
                if entry.state == EntryState::Shutdown {
                    return Err(RegistryError::EntryShutdown(name.clone()));
                }
                (
                    Arc::clone(&entry.instance),
                    Arc::clone(&entry.factory),
                    entry.generation,
                )
            };

            let instance = cell
                .get_or_try_init(|| construct(name, factory.as_ref()))
                .await?
                .clone();

            let claim = {
                let mut state = self.write_state()?;
                match state.entries.get_mut(name) {
                    None => InstanceClaim::Stale(Some(RegistryError::NotFound(name.clone()))),
                    Some(entry) if entry.generation != generation => InstanceClaim::Stale(None),
                    Some(entry) if entry.state == EntryState::Shutdown => InstanceClaim::Stale(
                        Some(RegistryError::EntryShutdown(name.clone())),
                    ),
                    Some(entry) => {
                        let first_use = entry.state == EntryState::Registered;
                        entry.state = EntryState::Initialized;
                        InstanceClaim::Live { first_use }
                    }
                }
            };

            match claim {
                InstanceClaim::Live { first_use } => {
                    if first_use {
                        self.emit(
                            EventKind::AbilityInitialized,
                            EventPayload::new().with_ability(name.clone()),
                        );
                    }
                    return Ok(instance);
                }
                InstanceClaim::Stale(outcome) => {
                    tracing::debug!(ability = %name, "discarding instance built for a stale entry");
                    if let Err(err) = instance.shutdown().await {
                        tracing::warn!(ability = %name, error = %err, "shutdown hook failed");
                    }
                    if let Some(err) = outcome {
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Shuts down and drops the cached singleton; the entry returns to
    /// `registered` and the next `get_instance` builds a fresh instance.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown names.
    pub async fn reset_instance(&self, name: &AbilityName) -> RegistryResult<()> {
        let previous = {
            let mut state = self.write_state()?;
            state.generation += 1;
            let generation = state.generation;
            let entry = state
                .entries
                .get_mut(name)
                .ok_or_else(|| RegistryError::NotFound(name.clone()))?;
            entry.state = EntryState::Registered;
            entry.generation = generation;
            std::mem::replace(&mut entry.instance, Arc::new(OnceCell::new()))
        };

        shutdown_cached(name, &previous).await;
        Ok(())
    }

    /// Removes an entry, shutting down its live instance.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown names.
    pub async fn deregister(&self, name: &AbilityName) -> RegistryResult<()> {
        let removed = self
            .write_state()?
            .entries
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.clone()))?;

        shutdown_cached(name, &removed.instance).await;
        self.emit(
            EventKind::AbilityDeregistered,
            EventPayload::new().with_ability(name.clone()),
        );
        Ok(())
    }

    /// Shuts down the entry's singleton and marks the entry shut down.
    ///
    /// The entry is marked shut down even when the hook fails.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown names and
    /// [`RegistryError::Lifecycle`] when the shutdown hook fails.
    pub async fn shutdown(&self, name: &AbilityName) -> RegistryResult<()> {
        let cell = {
            let mut state = self.write_state()?;
            let entry = state
                .entries
                .get_mut(name)
                .ok_or_else(|| RegistryError::NotFound(name.clone()))?;
            if entry.state == EntryState::Shutdown {
                return Ok(());
            }
            entry.state = EntryState::Shutdown;
            Arc::clone(&entry.instance)
        };

        let outcome = match cell.get() {
            Some(instance) => instance.shutdown().await,
            None => Ok(()),
        };
        self.emit(
            EventKind::AbilityShutdown,
            EventPayload::new().with_ability(name.clone()),
        );
        outcome.map_err(RegistryError::from)
    }

    /// Shuts down every entry; returns the failures encountered.
    pub async fn shutdown_all(&self) -> Vec<RegistryError> {
        let names = match self.read_state() {
            Ok(state) => state.entries.keys().cloned().collect::<Vec<_>>(),
            Err(err) => return vec![err],
        };

        let mut failures = Vec::new();
        for name in names {
            match self.shutdown(&name).await {
                Ok(()) | Err(RegistryError::NotFound(_)) => {}
                Err(err) => failures.push(err),
            }
        }
        failures
    }

    /// Returns whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &AbilityName) -> bool {
        self.read_state()
            .is_ok_and(|state| state.entries.contains_key(name))
    }

    /// Returns the entry state, or `None` when unregistered.
    #[must_use]
    pub fn entry_state(&self, name: &AbilityName) -> Option<EntryState> {
        self.read_state()
            .ok()
            .and_then(|state| state.entries.get(name).map(|entry| entry.state))
    }

    /// Lists registered entries sorted by name.
    ///
    /// The returned iterator is a snapshot; clone it to iterate again.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Lock`] when registry state is poisoned.
    pub fn list_registered(
        &self,
    ) -> RegistryResult<impl Iterator<Item = RegisteredAbility> + Clone + use<C>> {
        let state = self.read_state()?;
        let mut snapshot: Vec<RegisteredAbility> =
            state.entries.values().map(RegistryEntry::snapshot).collect();
        snapshot.sort_by(|left, right| left.name().cmp(right.name()));
        Ok(snapshot.into_iter())
    }

    /// Returns the names of entries that accept `request`, sorted.
    ///
    /// Live instances answer through their own `can_handle`; entries not
    /// yet instantiated answer from their descriptor, so no constructor or
    /// hook runs. Shut-down entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Lock`] when registry state is poisoned.
    pub fn find_handlers(&self, request: &InvocationRequest) -> RegistryResult<Vec<AbilityName>> {
        let candidates: Vec<(AbilityName, Arc<AbilityDescriptor>, Option<Arc<AbilityInstance>>)> = {
            let state = self.read_state()?;
            state
                .entries
                .iter()
                .filter(|(_, entry)| entry.state != EntryState::Shutdown)
                .map(|(name, entry)| {
                    (
                        name.clone(),
                        Arc::clone(&entry.descriptor),
                        entry.instance.get().cloned(),
                    )
                })
                .collect()
        };

        let mut handlers: Vec<AbilityName> = candidates
            .into_iter()
            .filter(|(_, descriptor, instance)| {
                instance.as_ref().map_or_else(
                    || {
                        request.ability() == descriptor.name()
                            && descriptor.supports_action(request.action())
                    },
                    |live| live.can_handle(request),
                )
            })
            .map(|(name, _, _)| name)
            .collect();
        handlers.sort();
        Ok(handlers)
    }

    /// Registers every candidate produced by `locator`.
    ///
    /// Never fails: malformed candidates, rejected registrations and
    /// enumeration failures are recorded in the report.
    pub async fn discover(&self, locator: &dyn PluginLocator) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        let entries = match locator.locate() {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(error = %err, "plugin enumeration failed");
                self.emit(
                    EventKind::DiscoveryFailed,
                    EventPayload::new().with_message(err.to_string()),
                );
                report.enumeration_error = Some(err.to_string());
                return report;
            }
        };

        for entry in entries {
            let candidate = match entry {
                Ok(candidate) => candidate,
                Err(err) => {
                    self.record_discovery_failure(&mut report, None, err.to_string());
                    continue;
                }
            };

            let name = candidate.descriptor.name().clone();
            let request = RegisterAbilityRequest::new(candidate.descriptor, candidate.factory)
                .with_metadata(candidate.metadata);
            match self.register(request).await {
                Ok(()) => report.registered.push(name),
                Err(err) => self.record_discovery_failure(&mut report, Some(name), err.to_string()),
            }
        }

        tracing::info!(
            registered = report.registered.len(),
            failed = report.failures.len(),
            "plugin discovery finished"
        );
        report
    }

    fn record_discovery_failure(
        &self,
        report: &mut DiscoveryReport,
        ability: Option<AbilityName>,
        reason: String,
    ) {
        let mut payload = EventPayload::new().with_message(reason.clone());
        if let Some(name) = &ability {
            payload = payload
                .with_ability(name.clone())
                .with_data("candidate", json!(name.as_str()));
        }
        self.emit(EventKind::DiscoveryFailed, payload);
        report.failures.push(DiscoveryFailure { ability, reason });
    }

    fn emit(&self, kind: EventKind, payload: EventPayload) {
        if let Some(bus) = &self.events {
            bus.emit(kind, payload);
        }
    }

    fn read_state(&self) -> RegistryResult<RwLockReadGuard<'_, RegistryState>> {
        self.state
            .read()
            .map_err(|err| RegistryError::lock(std::io::Error::other(err.to_string())))
    }

    fn write_state(&self) -> RegistryResult<RwLockWriteGuard<'_, RegistryState>> {
        self.state
            .write()
            .map_err(|err| RegistryError::lock(std::io::Error::other(err.to_string())))
    }
}

async fn construct(
    name: &AbilityName,
    factory: &dyn AbilityFactory,
) -> RegistryResult<Arc<AbilityInstance>> {
    let ability = factory
        .create()
        .map_err(|fault| RegistryError::Instantiation {
            ability: name.clone(),
            reason: fault.to_string(),
        })?;

    let built = ability.descriptor().name();
    if built != name {
        return Err(RegistryError::Instantiation {
            ability: name.clone(),
            reason: format!("factory produced ability {built}"),
        });
    }

    let instance = AbilityInstance::new(ability);
    instance
        .initialize()
        .await
        .map_err(|err| RegistryError::Instantiation {
            ability: name.clone(),
            reason: err.to_string(),
        })?;
    tracing::debug!(ability = %name, "ability instance constructed");
    Ok(Arc::new(instance))
}

async fn shutdown_cached(name: &AbilityName, cell: &InstanceCell) {
    if let Some(instance) = cell.get()
        && let Err(err) = instance.shutdown().await
    {
        tracing::warn!(ability = %name, error = %err, "shutdown hook failed");
    }
}

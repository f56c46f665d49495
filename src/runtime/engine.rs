//! The resolution engine.
//!
//! The Engine owns the registry, the dependent index, the task table and
//! the deferred notification queue. It turns `define`/`require` requests
//! into units, counts their outstanding dependencies, fetches modules it
//! has not seen, and runs each unit's callback exactly once when its last
//! dependency executes.
//!
//! Everything runs on one thread. Ready signals from an executed module to
//! its dependents are queued and delivered only after the current pass (a
//! `define`/`require` call, or the activation of a fetched source) returns,
//! so every unit registering in that pass is registered before any counter
//! moves.
//!
//! # Example
//!
//! ```ignore
//! use deft::loader::MemoryLoader;
//! use deft::runtime::{Definition, Engine, Requirement};
//! use serde_json::json;
//!
//! let mut engine = Engine::new(MemoryLoader::new().allow_missing());
//! engine.define(Definition::new("config", &[], |_| json!({"port": 8080})))?;
//! engine.require(Requirement::new(&["config"], |args| args[0]["port"].clone()))?;
//! let report = engine.run().await?;
//! ```

use std::collections::{BTreeMap, VecDeque};

use futures::future::{FutureExt, LocalBoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::core::{
    find_cycle, Decrement, Dependent, DependentIndex, ModuleId, TaskId, Unit, UnitKey, UnitStatus,
};
use crate::error::{Error, FetchError, Result};
use crate::loader::{FetchRequest, ResourceLoader, Source};
use crate::paths::PathRules;
use crate::runtime::definition::{Declaration, Definition, Requirement};
use crate::runtime::event::EngineEvent;
use crate::runtime::registry::Registry;
use crate::runtime::report::{RunReport, StalledUnit, TaskExport};
use crate::{dlog, dlog_debug, dlog_error, dlog_trace, dlog_warn};

/// Engine behaviour switches.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Refuse definitions that close a dependency cycle.
    ///
    /// When off, a cycle simply never executes and shows up as stalled.
    pub detect_cycles: bool,
    /// Name/locator translation.
    pub rules: PathRules,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            detect_cycles: true,
            rules: PathRules::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            detect_cycles: config.detect_cycles,
            rules: PathRules::new(config.effective_suffix())?,
        })
    }
}

/// A deferred ready signal for one dependent slot.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Job {
    unit: UnitKey,
    generation: u64,
    dependency: String,
}

struct FetchOutcome {
    id: ModuleId,
    result: std::result::Result<Source, FetchError>,
}

pub struct Engine {
    config: EngineConfig,
    loader: Box<dyn ResourceLoader>,
    registry: Registry,
    dependents: DependentIndex,
    tasks: BTreeMap<TaskId, Unit>,
    next_task: u64,
    jobs: VecDeque<Job>,
    in_flight: FuturesUnordered<LocalBoxFuture<'static, FetchOutcome>>,
    /// Names of modules whose sources are being activated, innermost last.
    activating: Vec<String>,
    subscribers: Vec<mpsc::UnboundedSender<EngineEvent>>,
}

impl Engine {
    /// Create an engine with default configuration.
    pub fn new(loader: impl ResourceLoader + 'static) -> Self {
        Self::with_config(loader, EngineConfig::default())
    }

    pub fn with_config(loader: impl ResourceLoader + 'static, config: EngineConfig) -> Self {
        Self {
            config,
            loader: Box::new(loader),
            registry: Registry::new(),
            dependents: DependentIndex::new(),
            tasks: BTreeMap::new(),
            next_task: 0,
            jobs: VecDeque::new(),
            in_flight: FuturesUnordered::new(),
            activating: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<EngineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: EngineEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    // ========== Definition protocol ==========

    /// Define a module.
    ///
    /// An existing module of the same name (typically a placeholder created
    /// because something depends on it) is updated in place: same id, no
    /// second fetch. Modules that already started executing, or whose fetch
    /// failed, cannot be redefined.
    ///
    /// A module with no dependencies executes before this returns.
    pub fn define(&mut self, definition: Definition) -> Result<ModuleId> {
        let Definition {
            name,
            dependencies,
            on_success,
            on_error,
        } = definition;

        let name = match name {
            Some(name) => name,
            None => self
                .activating
                .last()
                .cloned()
                .ok_or(Error::AnonymousDefinition)?,
        };

        let existing = self.registry.id_of(&name);
        if let Some(unit) = existing.and_then(|id| self.registry.get(id)) {
            let status = unit.status();
            if status.has_started() || status.is_terminal() {
                return Err(Error::Redefinition { name, status });
            }
        }

        if self.config.detect_cycles {
            if let Some(cycle) = find_cycle(self.registry.declarations(), &name, &dependencies) {
                dlog_warn!("define {}: refusing cycle {}", name, cycle.join(" -> "));
                return Err(Error::CyclicDependency { cycle });
            }
        }

        let id = match existing {
            Some(id) => {
                dlog_debug!("define {}: updating {} in place", name, id);
                id
            }
            None => {
                let locator = self.config.rules.to_locator(&name);
                self.create_module(&name, &locator)?
            }
        };
        self.registry
            .get_mut(id)
            .ok_or_else(|| Error::UnknownUnit(id.to_string()))?
            .redefine(dependencies, on_success, on_error);

        self.resolve(UnitKey::Module(id))?;
        Ok(id)
    }

    /// Run code once `dependencies` are ready, as an anonymous task.
    ///
    /// A task with no dependencies executes before this returns.
    pub fn require(&mut self, requirement: Requirement) -> Result<TaskId> {
        let Requirement {
            dependencies,
            on_success,
            on_error,
        } = requirement;

        self.next_task += 1;
        let id = TaskId(self.next_task);
        self.tasks
            .insert(id, Unit::task(id, dependencies, on_success, on_error));
        dlog_debug!("require: created {}", id);
        self.emit(EngineEvent::TaskCreated { id });

        self.resolve(UnitKey::Task(id))?;
        Ok(id)
    }

    /// Load the entry module named by `entry` (a bare name or a locator).
    pub fn load_entry(&mut self, entry: &str) -> Result<ModuleId> {
        let name = self.config.rules.to_name(entry);
        if let Some(id) = self.registry.id_of(&name) {
            return Ok(id);
        }
        let locator = self.config.rules.to_locator(entry);
        dlog!("Entry module {} ({})", name, locator);
        self.create_module(&name, &locator)
    }

    fn create_module(&mut self, name: &str, locator: &str) -> Result<ModuleId> {
        let id = self
            .registry
            .insert(name, locator)
            .ok_or_else(|| Error::Validation(format!("module {} already registered", name)))?;
        dlog_debug!("Created {} for {}", id, name);
        self.emit(EngineEvent::ModuleCreated {
            id,
            name: name.to_string(),
        });
        self.start_fetch(id)?;
        Ok(id)
    }

    fn start_fetch(&mut self, id: ModuleId) -> Result<()> {
        let request = {
            let unit = self
                .registry
                .get_mut(id)
                .ok_or_else(|| Error::UnknownUnit(id.to_string()))?;
            unit.transition(UnitStatus::Fetching)?;
            FetchRequest {
                name: unit.label(),
                locator: unit.locator().unwrap_or_default().to_string(),
            }
        };

        dlog_debug!("Fetching {} from {}", request.name, request.locator);
        let fetch = self
            .loader
            .fetch(&request)
            .map(move |result| FetchOutcome { id, result })
            .boxed_local();
        self.in_flight.push(fetch);
        self.emit(EngineEvent::FetchStarted {
            id,
            locator: request.locator,
        });
        Ok(())
    }

    // ========== Resolution and execution ==========

    /// Count `key`'s dependencies and register it as waiting on each.
    fn resolve(&mut self, key: UnitKey) -> Result<()> {
        let (generation, dependencies) = {
            let unit = self.unit_mut(key)?;
            let generation = unit.begin_pass();
            (generation, unit.dependencies().to_vec())
        };
        // Slots from an earlier pass of a redefined module no longer count.
        self.dependents.remove_unit(key);

        dlog_debug!(
            "Resolving {}: {} pending [{}]",
            key,
            dependencies.len(),
            dependencies.join(", ")
        );
        self.emit(EngineEvent::Resolved {
            unit: key,
            pending: dependencies.len(),
        });

        if dependencies.is_empty() {
            return self.execute(key);
        }

        for dependency in &dependencies {
            let id = match self.registry.id_of(dependency) {
                Some(id) => id,
                None => {
                    let locator = self.config.rules.to_locator(dependency);
                    self.create_module(dependency, &locator)?
                }
            };

            let executed = self
                .registry
                .get(id)
                .map(|unit| unit.status() == UnitStatus::Executed)
                .unwrap_or(false);
            if executed {
                // It will never notify again; deliver its signal next turn.
                self.enqueue(key, generation, dependency);
            } else {
                self.dependents.register(dependency, key, generation);
            }
        }
        Ok(())
    }

    fn execute(&mut self, key: UnitKey) -> Result<()> {
        let (dependencies, callback) = {
            let unit = self.unit_mut(key)?;
            unit.transition(UnitStatus::Executing)?;
            (unit.dependencies().to_vec(), unit.take_callback())
        };

        let args: Vec<Value> = dependencies
            .iter()
            .map(|dependency| {
                self.registry
                    .by_name(dependency)
                    .and_then(Unit::export)
                    .cloned()
                    .unwrap_or(Value::Null)
            })
            .collect();
        let export = callback.map(|f| f(args.as_slice())).unwrap_or(Value::Null);

        let name = {
            let unit = self.unit_mut(key)?;
            unit.set_export(export)?;
            unit.transition(UnitStatus::Executed)?;
            unit.name().map(str::to_string)
        };
        dlog_debug!("Executed {}", key);
        self.emit(EngineEvent::Executed { unit: key });

        if let Some(name) = name {
            self.notify_dependents(&name);
        }
        Ok(())
    }

    /// Queue one ready signal for every slot waiting on `name`.
    fn notify_dependents(&mut self, name: &str) {
        let waiting = self.dependents.take(name);
        dlog_trace!("{} executed, notifying {} dependents", name, waiting.len());
        for Dependent { unit, generation } in waiting {
            self.enqueue(unit, generation, name);
        }
    }

    fn enqueue(&mut self, unit: UnitKey, generation: u64, dependency: &str) {
        dlog_trace!("Queued signal {} -> {}", dependency, unit);
        self.jobs.push_back(Job {
            unit,
            generation,
            dependency: dependency.to_string(),
        });
    }

    fn apply(&mut self, job: Job) -> Result<()> {
        let unit = self.unit_mut(job.unit)?;
        if unit.status().is_terminal() {
            dlog_warn!(
                "Dropping signal {} -> {}: unit is {}",
                job.dependency,
                job.unit,
                unit.status()
            );
            return Ok(());
        }

        match unit.decrement(job.generation) {
            Decrement::Stale => {
                dlog_trace!("Stale signal {} -> {}", job.dependency, job.unit);
                Ok(())
            }
            Decrement::Underflow => {
                dlog_warn!(
                    "Dropping signal {} -> {}: nothing pending",
                    job.dependency,
                    job.unit
                );
                Ok(())
            }
            Decrement::Waiting(remaining) => {
                dlog_trace!(
                    "{} ready for {}, {} remaining",
                    job.dependency,
                    job.unit,
                    remaining
                );
                Ok(())
            }
            Decrement::Ready => self.execute(job.unit),
        }
    }

    /// Deliver every queued ready signal, including signals queued by the
    /// executions they trigger. Returns how many were applied.
    pub fn flush(&mut self) -> Result<usize> {
        let mut applied = 0;
        while let Some(job) = self.jobs.pop_front() {
            self.apply(job)?;
            applied += 1;
        }
        Ok(applied)
    }

    // ========== Fetch completion ==========

    fn on_fetched(&mut self, outcome: FetchOutcome) -> Result<()> {
        match outcome.result {
            Ok(source) => self.activate(outcome.id, source),
            Err(error) => self.fetch_failed(outcome.id, error),
        }
    }

    fn activate(&mut self, id: ModuleId, source: Source) -> Result<()> {
        let name = {
            let unit = self
                .registry
                .get_mut(id)
                .ok_or_else(|| Error::UnknownUnit(id.to_string()))?;
            if unit.status() == UnitStatus::Fetching {
                unit.transition(UnitStatus::Fetched)?;
            }
            unit.label()
        };
        dlog_debug!(
            "Fetched {}, activating {} declarations",
            name,
            source.declarations.len()
        );
        self.emit(EngineEvent::Fetched { id });

        self.activating.push(name);
        let result = self.apply_declarations(source);
        self.activating.pop();
        result
    }

    fn apply_declarations(&mut self, source: Source) -> Result<()> {
        for declaration in source.declarations {
            let applied = match declaration {
                Declaration::Define(definition) => self.define(definition).map(|_| ()),
                Declaration::Require(requirement) => self.require(requirement).map(|_| ()),
            };
            match applied {
                Ok(()) => {}
                Err(Error::Redefinition { name, status }) => {
                    dlog_warn!("Ignoring redefinition of {} ({})", name, status);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn fetch_failed(&mut self, id: ModuleId, error: FetchError) -> Result<()> {
        let unit = self
            .registry
            .get_mut(id)
            .ok_or_else(|| Error::UnknownUnit(id.to_string()))?;
        let name = unit.label();

        if unit.status() != UnitStatus::Fetching {
            dlog_warn!(
                "Fetch of {} failed after it was {}: {}",
                name,
                unit.status(),
                error
            );
            return Ok(());
        }

        unit.transition(UnitStatus::Error)?;
        let handler = unit.take_error_handler();
        self.emit(EngineEvent::FetchFailed {
            id,
            error: error.to_string(),
        });

        match handler {
            Some(handler) => {
                dlog_warn!("Fetch of {} failed, handled: {}", name, error);
                handler(&error);
                self.emit(EngineEvent::FetchRecovered {
                    id,
                    error: error.to_string(),
                });
                Ok(())
            }
            None => {
                dlog_error!("Fetch of {} failed: {}", name, error);
                Err(Error::Fetch {
                    name,
                    source: error,
                })
            }
        }
    }

    // ========== Event loop ==========

    /// Drive fetches and notifications until nothing is left to do.
    ///
    /// Returns once no fetch is in flight and no signal is queued. Units
    /// still waiting at that point are reported as stalled; they are never
    /// failed. An unhandled fetch failure aborts the run.
    pub async fn run(&mut self) -> Result<RunReport> {
        loop {
            self.flush()?;
            match self.in_flight.next().await {
                Some(outcome) => self.on_fetched(outcome)?,
                None => break,
            }
        }

        let report = self.report();
        dlog!(
            "Run idle: {} modules, {} tasks, {} executed, {} stalled",
            report.modules,
            report.tasks,
            report.executed,
            report.stalled.len()
        );
        Ok(report)
    }

    // ========== Queries ==========

    fn unit_mut(&mut self, key: UnitKey) -> Result<&mut Unit> {
        let unit = match key {
            UnitKey::Module(id) => self.registry.get_mut(id),
            UnitKey::Task(id) => self.tasks.get_mut(&id),
        };
        unit.ok_or_else(|| Error::UnknownUnit(key.to_string()))
    }

    pub fn unit(&self, key: UnitKey) -> Option<&Unit> {
        match key {
            UnitKey::Module(id) => self.registry.get(id),
            UnitKey::Task(id) => self.tasks.get(&id),
        }
    }

    pub fn module(&self, name: &str) -> Option<&Unit> {
        self.registry.by_name(name)
    }

    pub fn module_by_id(&self, id: ModuleId) -> Option<&Unit> {
        self.registry.get(id)
    }

    pub fn task(&self, id: TaskId) -> Option<&Unit> {
        self.tasks.get(&id)
    }

    /// Export of a module, once it has executed.
    pub fn export(&self, name: &str) -> Option<&Value> {
        self.module(name).and_then(Unit::export)
    }

    pub fn task_export(&self, id: TaskId) -> Option<&Value> {
        self.task(id).and_then(Unit::export)
    }

    pub fn status(&self, name: &str) -> Option<UnitStatus> {
        self.module(name).map(Unit::status)
    }

    pub fn pending(&self, key: UnitKey) -> Option<usize> {
        self.unit(key).map(Unit::pending)
    }

    /// Slots currently waiting on `name`.
    pub fn dependents(&self, name: &str) -> &[Dependent] {
        self.dependents.get(name)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Unit> {
        self.registry.iter()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Unit> {
        self.tasks.values()
    }

    pub fn module_count(&self) -> usize {
        self.registry.len()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Signals queued for the next turn.
    pub fn queued(&self) -> usize {
        self.jobs.len()
    }

    /// Fetches not yet completed.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Resolved units still waiting on at least one dependency.
    pub fn stalled(&self) -> Vec<StalledUnit> {
        self.modules()
            .chain(self.tasks())
            .filter(|unit| {
                unit.generation() > 0
                    && unit.pending() > 0
                    && !unit.status().has_started()
                    && unit.status() != UnitStatus::Error
            })
            .map(|unit| {
                let mut waiting_on: Vec<String> = Vec::new();
                for dependency in unit.dependencies() {
                    let executed = self.status(dependency) == Some(UnitStatus::Executed);
                    if !executed && !waiting_on.contains(dependency) {
                        waiting_on.push(dependency.clone());
                    }
                }
                StalledUnit {
                    unit: unit.key(),
                    label: unit.label(),
                    pending: unit.pending(),
                    waiting_on,
                }
            })
            .collect()
    }

    /// Snapshot of the current state.
    pub fn report(&self) -> RunReport {
        let executed = self
            .modules()
            .chain(self.tasks())
            .filter(|unit| unit.status() == UnitStatus::Executed)
            .count();
        let undefined = self
            .modules()
            .filter(|unit| !unit.is_defined() && unit.status() == UnitStatus::Fetched)
            .map(Unit::label)
            .collect();
        let failed = self
            .modules()
            .filter(|unit| unit.status() == UnitStatus::Error)
            .map(Unit::label)
            .collect();
        let task_exports = self
            .tasks
            .iter()
            .filter_map(|(id, unit)| {
                unit.export().map(|export| TaskExport {
                    id: *id,
                    export: export.clone(),
                })
            })
            .collect();

        RunReport {
            modules: self.module_count(),
            tasks: self.task_count(),
            executed,
            stalled: self.stalled(),
            undefined,
            failed,
            task_exports,
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("modules", &self.module_count())
            .field("tasks", &self.task_count())
            .field("queued", &self.queued())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

//! # Runtime context
//!
//! Holds the managers of one process. Components and connections are set up
//! through it instead of through process-wide singletons, so several
//! runtimes can share one global manager inside a single test.

use crate::RuntimeConfig;
use components::{Component, ComponentError};
use core_types::ErrorKind;
use interfaces::InterfaceError;
use ipc::{IpcError, TypeRegistry};
use services_global_manager::{GlobalManager, GlobalManagerError, TimeoutSweeper};
use services_local_manager::{LocalManager, LocalManagerError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Runtime error types
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error(transparent)]
    Global(#[from] GlobalManagerError),

    #[error(transparent)]
    Local(#[from] LocalManagerError),

    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error(transparent)]
    Interface(#[from] InterfaceError),

    #[error(transparent)]
    Ipc(#[from] IpcError),
}

impl RuntimeError {
    /// Maps the error onto the shared taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::Io { .. } => ErrorKind::Io,
            RuntimeError::InvalidConfig(_) | RuntimeError::Parse(_) | RuntimeError::Logging(_) => {
                ErrorKind::PolicyViolation
            }
            RuntimeError::Global(err) => err.kind(),
            RuntimeError::Local(err) => err.kind(),
            RuntimeError::Component(err) => err.kind(),
            RuntimeError::Interface(err) => err.kind(),
            RuntimeError::Ipc(err) => err.kind(),
        }
    }
}

/// Managers and settings of one process
pub struct Runtime {
    config: RuntimeConfig,
    global: Arc<GlobalManager>,
    local: Arc<LocalManager>,
    types: TypeRegistry,
    sweeper: Option<TimeoutSweeper>,
}

impl Runtime {
    /// Starts a runtime with its own global manager and timeout sweep
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let global = Arc::new(GlobalManager::new(config.global_manager_config()));
        let sweeper = TimeoutSweeper::spawn(&global, config.sweep_period())?;
        let mut runtime = Self::attach(config, global)?;
        runtime.sweeper = Some(sweeper);
        Ok(runtime)
    }

    /// Adds this process to an existing global manager
    pub fn attach(config: RuntimeConfig, global: Arc<GlobalManager>) -> Result<Self, RuntimeError> {
        config.validate()?;
        let local = LocalManager::new(
            config.process_name.clone(),
            Arc::clone(&global),
            config.local_manager_config(),
        )?;
        let types = builtin_types()?;
        info!(process = %config.process_name, mailbox_size = config.mailbox_size, "runtime ready");
        Ok(Self {
            config,
            global,
            local,
            types,
            sweeper: None,
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn process_name(&self) -> &str {
        &self.config.process_name
    }

    pub fn global(&self) -> &Arc<GlobalManager> {
        &self.global
    }

    pub fn local(&self) -> &Arc<LocalManager> {
        &self.local
    }

    /// Argument types that can be rebuilt from JSON by name
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    pub fn blocking_call_timeout(&self) -> Duration {
        self.config.blocking_call_timeout()
    }

    /// Builds a component of this process; register it with `local().add_component`
    pub fn component(&self, name: impl Into<String>) -> Arc<Component> {
        self.local.build_component(name)
    }

    /// Kills every component and unregisters the process
    pub fn shutdown(mut self) -> Result<(), RuntimeError> {
        let killed = self.local.kill_all(self.config.blocking_call_timeout());
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.stop();
        }
        self.global.unregister_peer(&self.config.process_name);
        if let Err(err) = self.global.remove_process(&self.config.process_name) {
            warn!(error = %err, "process was already unregistered");
        }
        info!(process = %self.config.process_name, "runtime stopped");
        Ok(killed?)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("local", &self.local)
            .field("types", &self.types.names())
            .field("sweeping", &self.sweeper.is_some())
            .finish()
    }
}

fn builtin_types() -> Result<TypeRegistry, RuntimeError> {
    let mut types = TypeRegistry::new();
    types.register::<bool>("bool")?;
    types.register::<i32>("i32")?;
    types.register::<i64>("i64")?;
    types.register::<u32>("u32")?;
    types.register::<u64>("u64")?;
    types.register::<f64>("f64")?;
    types.register::<String>("string")?;
    Ok(types)
}

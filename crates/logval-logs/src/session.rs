use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use logval_source::{LocalResource, Resource};
use logval_types::{
    AssertRequest, AssertResponse, ListenRequest, ListenResponse, ResetRequest, ResetResponse,
};

use crate::config::ValidatorConfig;
use crate::error::{Error, Result};
use crate::state::LogTypeState;
use crate::store::ArcLogRecord;
use crate::validator::{Sleeper, Validator};

/// Registered log types and the operations on them
///
/// Each session owns its own log type states; nothing is global.
pub struct Session {
    resource: Arc<dyn Resource>,
    config: ValidatorConfig,
    validator: Validator,
    types: RwLock<HashMap<String, Arc<LogTypeState>>>,
}

impl Session {
    /// Session over the local filesystem
    pub fn new(config: ValidatorConfig) -> Self {
        Self::with_resource(Arc::new(LocalResource::new()), config)
    }

    pub fn with_resource(resource: Arc<dyn Resource>, config: ValidatorConfig) -> Self {
        let validator = Validator::new(Arc::clone(&resource), Sleeper::default(), config.clone());
        Self {
            resource,
            config,
            validator,
            types: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the wait used between Assert attempts
    pub fn with_sleeper(mut self, sleeper: Sleeper) -> Self {
        self.validator = Validator::new(Arc::clone(&self.resource), sleeper, self.config.clone());
        self
    }

    /// Register log types. Either every type registers or none does;
    /// a name that is already registered gets a fresh state.
    pub fn listen(&self, request: &ListenRequest) -> Result<ListenResponse> {
        let mut states = Vec::with_capacity(request.types.len());
        for config in &request.types {
            if states.iter().any(|s: &LogTypeState| s.name() == config.name) {
                return Err(Error::config(&config.name, "log type listed twice"));
            }
            states.push(LogTypeState::listen(
                self.resource.as_ref(),
                &request.source,
                config.clone(),
            )?);
        }

        let mut response = ListenResponse::default();
        let mut types = self.types.write();
        for state in states {
            let meta = state.meta();
            info!(
                log_type = %state.name(),
                source = %meta.source.url,
                files = meta.log_files.len(),
                "listening"
            );
            response.meta.insert(state.name().to_string(), meta);
            types.insert(state.name().to_string(), Arc::new(state));
        }
        Ok(response)
    }

    /// Wait for the expected records; see `Validator::run`
    pub async fn assert(
        &self,
        request: &AssertRequest,
        cancel: &CancellationToken,
    ) -> Result<AssertResponse> {
        let states = self.states_for(request)?;
        self.validator.run(&states, request, cancel).await
    }

    /// Clear the records of the named types; all names must be registered
    pub fn reset(&self, request: &ResetRequest) -> Result<ResetResponse> {
        let types = self.types.read();
        let states = request
            .log_types
            .iter()
            .map(|name| {
                types
                    .get(name)
                    .cloned()
                    .ok_or_else(|| Error::UnknownLogType(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        drop(types);

        let rewind = self.config.reset_rewinds_offsets;
        for state in &states {
            state.reset(rewind);
            info!(log_type = %state.name(), rewind, "reset");
        }
        Ok(ResetResponse {
            log_types: request.log_types.clone(),
        })
    }

    pub fn log_type(&self, name: &str) -> Option<Arc<LogTypeState>> {
        self.types.read().get(name).cloned()
    }

    /// Look up records by index key, outside of any Assert
    pub fn records_by_key(&self, log_type: &str, key: &str) -> Result<Vec<ArcLogRecord>> {
        let state = self
            .log_type(log_type)
            .ok_or_else(|| Error::UnknownLogType(log_type.to_string()))?;
        Ok(state.by_key(key))
    }

    pub fn log_types(&self) -> Vec<String> {
        let mut names: Vec<_> = self.types.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// States referenced by a request, failing on unregistered names
    fn states_for(&self, request: &AssertRequest) -> Result<HashMap<String, Arc<LogTypeState>>> {
        let types = self.types.read();
        let mut states = HashMap::new();
        for group in &request.expected_log_records {
            if states.contains_key(&group.log_type) {
                continue;
            }
            let state = types
                .get(&group.log_type)
                .ok_or_else(|| Error::UnknownLogType(group.log_type.clone()))?;
            states.insert(group.log_type.clone(), Arc::clone(state));
        }
        Ok(states)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

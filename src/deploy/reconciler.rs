//! Stack reconciliation engine.
//!
//! The reconciler is the public entry point for stack operations: deploy
//! (create-or-update), delete, outputs, existence checks, and template
//! validation. Mutations go through the control plane; unless running
//! detached, each operation then hands off to a [`Poller`] and awaits its
//! terminal resolution.

use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::controlplane::{
    ControlPlaneClient, StackParameter, StackSpec,
};
use crate::error::{DeployError, Result};
use crate::template::{TemplateInput, TemplateResolver, TemplateSource};

use super::poller::{EventSink, Poller, StackAction, TracingSink, DEFAULT_POLL_INTERVAL};
use super::status;

/// Capabilities acknowledged by default on create and update calls.
pub const DEFAULT_CAPABILITIES: &[&str] = &["CAPABILITY_IAM", "CAPABILITY_NAMED_IAM"];

/// Configuration for a [`Reconciler`].
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Interval between event polls.
    pub poll_interval: Duration,
    /// Capabilities to acknowledge on create and update calls.
    pub capabilities: Vec<String>,
    /// Tags attached to every deployed stack.
    pub tags: BTreeMap<String, String>,
    /// When true, mutations return as soon as the control plane accepts
    /// them, without polling for the terminal state.
    pub detach: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            capabilities: DEFAULT_CAPABILITIES
                .iter()
                .map(|cap| (*cap).to_string())
                .collect(),
            tags: BTreeMap::new(),
            detach: false,
        }
    }
}

/// Drives the control plane to a desired stack state.
pub struct Reconciler {
    /// Control plane the operations are issued against.
    client: Arc<dyn ControlPlaneClient>,
    /// Resolver turning caller template references into bodies or URLs.
    resolver: Arc<dyn TemplateResolver>,
    /// Operation configuration.
    config: ReconcilerConfig,
    /// Sink receiving the event stream of polled operations.
    sink: Arc<dyn EventSink>,
}

impl Reconciler {
    /// Creates a reconciler with default configuration.
    #[must_use]
    pub fn new(
        client: Arc<dyn ControlPlaneClient>,
        resolver: Arc<dyn TemplateResolver>,
    ) -> Self {
        Self {
            client,
            resolver,
            config: ReconcilerConfig::default(),
            sink: Arc::new(TracingSink),
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the event sink for polled operations.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Gets the underlying control-plane client.
    #[must_use]
    pub const fn client(&self) -> &Arc<dyn ControlPlaneClient> {
        &self.client
    }

    /// Deploys a template to the named stack, creating it when absent and
    /// updating it otherwise, then awaits the terminal state unless
    /// configured to detach.
    ///
    /// # Errors
    ///
    /// Returns an error when template resolution fails, the control plane
    /// rejects the call, or the operation terminates in a failure state.
    pub async fn deploy(
        &self,
        stack_name: &str,
        template: TemplateInput,
        parameters: &BTreeMap<String, String>,
    ) -> Result<()> {
        let started_at = Utc::now();
        let updating = self.exists_for_update(stack_name).await;
        let template_source = self.resolver.resolve(template).await?;
        let normalized = self
            .normalize_parameters(&template_source, parameters)
            .await?;

        let spec = StackSpec {
            name: stack_name.to_string(),
            template: template_source,
            parameters: normalized,
            tags: StackSpec::tags_from_map(&self.config.tags),
            capabilities: self.config.capabilities.clone(),
            client_token: Uuid::new_v4().to_string(),
        };

        let action = if updating {
            info!("Updating stack: {stack_name}");
            match self.client.update_stack(&spec).await {
                Err(err) if err.is_no_changes() => {
                    info!("No changes to deploy for stack: {stack_name}");
                    return Ok(());
                }
                other => other?,
            }
            StackAction::Update
        } else {
            info!("Creating stack: {stack_name}");
            self.client.create_stack(&spec).await?;
            StackAction::Create
        };

        if self.config.detach {
            return Ok(());
        }
        self.poller(action, stack_name, started_at).run().await
    }

    /// Deletes the named stack, then awaits the terminal state unless
    /// configured to detach. A stack that is already gone is success.
    ///
    /// # Errors
    ///
    /// Returns an error when the control plane rejects the call or the
    /// deletion terminates in a failure state.
    pub async fn delete(&self, stack_name: &str) -> Result<()> {
        let started_at = Utc::now();
        info!("Deleting stack: {stack_name}");

        self.client
            .delete_stack(stack_name, &Uuid::new_v4().to_string())
            .await?;

        if self.config.detach {
            return Ok(());
        }
        self.poller(StackAction::Delete, stack_name, started_at)
            .run()
            .await
    }

    /// Returns all outputs of the named stack.
    ///
    /// # Errors
    ///
    /// Returns an error when the stack cannot be described.
    pub async fn outputs(&self, stack_name: &str) -> Result<BTreeMap<String, String>> {
        Ok(self.client.describe_stack(stack_name).await?.outputs)
    }

    /// Returns a single output value of the named stack.
    ///
    /// # Errors
    ///
    /// Returns an error when the stack cannot be described or has no
    /// output under the given key.
    pub async fn output(&self, stack_name: &str, key: &str) -> Result<String> {
        self.outputs(stack_name).await?.remove(key).ok_or_else(|| {
            DeployError::OutputMissing {
                name: stack_name.to_string(),
                key: key.to_string(),
            }
            .into()
        })
    }

    /// Returns true if the named stack exists.
    ///
    /// # Errors
    ///
    /// Returns an error for control-plane failures other than a missing
    /// stack.
    pub async fn stack_exists(&self, stack_name: &str) -> Result<bool> {
        match self.client.describe_stack(stack_name).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_stack_missing() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Validates a template with the control plane.
    ///
    /// # Errors
    ///
    /// Returns an error when resolution fails or the control plane rejects
    /// the template.
    pub async fn validate(&self, template: TemplateInput) -> Result<()> {
        let source = self.resolver.resolve(template).await?;
        self.client.validate_template(&source).await
    }

    /// Probes whether the stack exists in a state that accepts an update.
    /// Any describe failure means "does not exist" and selects the create
    /// path.
    async fn exists_for_update(&self, stack_name: &str) -> bool {
        match self.client.describe_stack(stack_name).await {
            Ok(description) => {
                debug!(
                    "Stack {stack_name} exists with status {}",
                    description.status
                );
                status::is_updatable(&description.status)
            }
            Err(err) => {
                debug!("Stack {stack_name} not updatable: {err}");
                false
            }
        }
    }

    /// Merges caller parameters with the template's declared set.
    ///
    /// Caller keys match case-insensitively and win over declared
    /// defaults; parameters the template does not declare are dropped.
    async fn normalize_parameters(
        &self,
        template: &TemplateSource,
        supplied: &BTreeMap<String, String>,
    ) -> Result<Vec<StackParameter>> {
        let supplied: HashMap<String, &String> = supplied
            .iter()
            .map(|(key, value)| (key.to_lowercase(), value))
            .collect();

        let declared = self.client.declared_parameters(template).await?;

        Ok(declared
            .into_iter()
            .filter_map(|parameter| {
                let value = supplied
                    .get(&parameter.key.to_lowercase())
                    .map(|value| (*value).clone())
                    .or(parameter.default_value)?;
                Some(StackParameter {
                    key: parameter.key,
                    value,
                })
            })
            .collect())
    }

    /// Builds the poller for one operation.
    fn poller(
        &self,
        action: StackAction,
        stack_name: &str,
        started_at: chrono::DateTime<Utc>,
    ) -> Poller {
        Poller::new(Arc::clone(&self.client), action, stack_name, started_at)
            .with_interval(self.config.poll_interval)
            .with_sink(Arc::clone(&self.sink))
    }
}

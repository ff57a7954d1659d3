//! CloudFormation-backed control plane.
//!
//! This module implements [`ControlPlaneClient`] on top of the AWS
//! CloudFormation API, translating SDK types into the domain types the
//! engine consumes and SDK failures into classified errors.

use async_trait::async_trait;
use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::error::ProvideErrorMetadata;
use aws_sdk_cloudformation::types::{Capability, Parameter, StackStatus, Tag};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{ControlPlaneError, FormationError, Result};
use crate::template::TemplateSource;

use super::client::ControlPlaneClient;
use super::types::{
    DeclaredParameter, EventPage, StackDescription, StackEvent, StackPage, StackSpec,
    StackSummary, StackTag,
};

/// CloudFormation control plane client.
#[derive(Debug, Clone)]
pub struct AwsControlPlane {
    /// CloudFormation SDK client.
    client: Client,
}

impl AwsControlPlane {
    /// Creates a control plane client from the ambient AWS configuration,
    /// optionally overriding the region.
    pub async fn from_env(region: Option<&str>) -> Self {
        let config = if let Some(region_str) = region {
            aws_config::from_env()
                .region(aws_config::Region::new(region_str.to_string()))
                .load()
                .await
        } else {
            aws_config::load_from_env().await
        };

        Self {
            client: Client::new(&config),
        }
    }

    /// Creates a control plane from an existing SDK client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Converts an SDK stack event into the domain type.
    ///
    /// Events missing an id or timestamp cannot be deduplicated or ordered
    /// and are skipped.
    fn convert_event(event: &aws_sdk_cloudformation::types::StackEvent) -> Option<StackEvent> {
        let timestamp = event
            .timestamp()
            .and_then(|ts| DateTime::from_timestamp(ts.secs(), ts.subsec_nanos()))?;

        Some(StackEvent {
            event_id: event.event_id()?.to_string(),
            logical_id: event.logical_resource_id().unwrap_or_default().to_string(),
            resource_type: event.resource_type().unwrap_or_default().to_string(),
            status: event
                .resource_status()
                .map(|status| status.as_str().to_string())
                .unwrap_or_default(),
            status_reason: event.resource_status_reason().map(str::to_string),
            timestamp,
        })
    }

    /// Converts an SDK stack summary into the domain type.
    fn convert_summary(
        summary: &aws_sdk_cloudformation::types::StackSummary,
    ) -> Option<StackSummary> {
        let creation_time = summary
            .creation_time()
            .and_then(|ts| DateTime::from_timestamp(ts.secs(), ts.subsec_nanos()))?;

        Some(StackSummary {
            name: summary.stack_name()?.to_string(),
            status: summary
                .stack_status()
                .map(|status| status.as_str().to_string())
                .unwrap_or_default(),
            creation_time,
        })
    }

    /// Converts the parameter list into SDK parameters.
    fn convert_parameters(spec: &StackSpec) -> Vec<Parameter> {
        spec.parameters
            .iter()
            .map(|param| {
                Parameter::builder()
                    .parameter_key(&param.key)
                    .parameter_value(&param.value)
                    .build()
            })
            .collect()
    }

    /// Converts the tag list into SDK tags.
    fn convert_tags(tags: &[StackTag]) -> Result<Vec<Tag>> {
        tags.iter()
            .map(|tag| {
                Ok(Tag::builder()
                    .key(&tag.key)
                    .value(&tag.value)
                    .build())
            })
            .collect()
    }
}

/// Maps a CloudFormation service error onto the engine's error classes.
///
/// CloudFormation reports missing stacks and no-op updates as generic
/// `ValidationError`s; the message text is the only discriminator.
fn classify_api_error(
    name: &str,
    err: impl ProvideErrorMetadata + std::fmt::Display,
) -> FormationError {
    let message = err
        .message()
        .map_or_else(|| err.to_string(), str::to_string);

    match err.code() {
        Some("Throttling" | "ThrottlingException" | "RequestLimitExceeded") => {
            ControlPlaneError::Throttled { message }.into()
        }
        Some("ValidationError") if message.contains("does not exist") => {
            ControlPlaneError::stack_missing(name).into()
        }
        Some("ValidationError") if message.contains("No updates are to be performed") => {
            ControlPlaneError::NoChanges {
                name: name.to_string(),
            }
            .into()
        }
        _ => ControlPlaneError::service(message).into(),
    }
}

#[async_trait]
impl ControlPlaneClient for AwsControlPlane {
    async fn create_stack(&self, spec: &StackSpec) -> Result<()> {
        debug!("Issuing create for stack: {}", spec.name);

        let request = self
            .client
            .create_stack()
            .stack_name(&spec.name)
            .client_request_token(&spec.client_token)
            .set_capabilities(Some(
                spec.capabilities
                    .iter()
                    .map(|cap| Capability::from(cap.as_str()))
                    .collect(),
            ))
            .set_parameters(Some(Self::convert_parameters(spec)))
            .set_tags(Some(Self::convert_tags(&spec.tags)?));

        let request = match &spec.template {
            TemplateSource::Body(body) => request.template_body(body),
            TemplateSource::Url(url) => request.template_url(url),
        };

        request
            .send()
            .await
            .map_err(|e| classify_api_error(&spec.name, e.into_service_error()))?;

        Ok(())
    }

    async fn update_stack(&self, spec: &StackSpec) -> Result<()> {
        debug!("Issuing update for stack: {}", spec.name);

        let request = self
            .client
            .update_stack()
            .stack_name(&spec.name)
            .client_request_token(&spec.client_token)
            .set_capabilities(Some(
                spec.capabilities
                    .iter()
                    .map(|cap| Capability::from(cap.as_str()))
                    .collect(),
            ))
            .set_parameters(Some(Self::convert_parameters(spec)))
            .set_tags(Some(Self::convert_tags(&spec.tags)?));

        let request = match &spec.template {
            TemplateSource::Body(body) => request.template_body(body),
            TemplateSource::Url(url) => request.template_url(url),
        };

        request
            .send()
            .await
            .map_err(|e| classify_api_error(&spec.name, e.into_service_error()))?;

        Ok(())
    }

    async fn delete_stack(&self, name: &str, client_token: &str) -> Result<()> {
        debug!("Issuing delete for stack: {name}");

        self.client
            .delete_stack()
            .stack_name(name)
            .client_request_token(client_token)
            .send()
            .await
            .map_err(|e| classify_api_error(name, e.into_service_error()))?;

        Ok(())
    }

    async fn describe_stack(&self, name: &str) -> Result<StackDescription> {
        let output = self
            .client
            .describe_stacks()
            .stack_name(name)
            .send()
            .await
            .map_err(|e| classify_api_error(name, e.into_service_error()))?;

        let stack = output
            .stacks()
            .first()
            .ok_or_else(|| FormationError::from(ControlPlaneError::stack_missing(name)))?;

        let outputs: BTreeMap<String, String> = stack
            .outputs()
            .iter()
            .filter_map(|output| {
                Some((
                    output.output_key()?.to_string(),
                    output.output_value()?.to_string(),
                ))
            })
            .collect();

        Ok(StackDescription {
            name: stack.stack_name().unwrap_or(name).to_string(),
            status: stack
                .stack_status()
                .map(|status| status.as_str().to_string())
                .unwrap_or_default(),
            status_reason: stack.stack_status_reason().map(str::to_string),
            creation_time: stack
                .creation_time()
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts.secs(), ts.subsec_nanos())),
            outputs,
        })
    }

    async fn list_events_page(
        &self,
        name: &str,
        page_token: Option<String>,
    ) -> Result<EventPage> {
        let output = self
            .client
            .describe_stack_events()
            .stack_name(name)
            .set_next_token(page_token)
            .send()
            .await
            .map_err(|e| classify_api_error(name, e.into_service_error()))?;

        let events = output
            .stack_events()
            .iter()
            .filter_map(Self::convert_event)
            .collect();

        Ok(EventPage {
            events,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn list_stacks_page(
        &self,
        page_token: Option<String>,
        status_filter: &[String],
    ) -> Result<StackPage> {
        let filter: Vec<StackStatus> = status_filter
            .iter()
            .map(|status| StackStatus::from(status.as_str()))
            .collect();

        let output = self
            .client
            .list_stacks()
            .set_next_token(page_token)
            .set_stack_status_filter(Some(filter))
            .send()
            .await
            .map_err(|e| classify_api_error("", e.into_service_error()))?;

        let stacks = output
            .stack_summaries()
            .iter()
            .filter_map(Self::convert_summary)
            .collect();

        Ok(StackPage {
            stacks,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn declared_parameters(
        &self,
        template: &TemplateSource,
    ) -> Result<Vec<DeclaredParameter>> {
        let request = match template {
            TemplateSource::Body(body) => {
                self.client.get_template_summary().template_body(body)
            }
            TemplateSource::Url(url) => self.client.get_template_summary().template_url(url),
        };

        let output = request
            .send()
            .await
            .map_err(|e| classify_api_error("template", e.into_service_error()))?;

        Ok(output
            .parameters()
            .iter()
            .map(|param| DeclaredParameter {
                key: param.parameter_key().unwrap_or_default().to_string(),
                default_value: param.default_value().map(str::to_string),
            })
            .collect())
    }

    async fn validate_template(&self, template: &TemplateSource) -> Result<()> {
        let request = match template {
            TemplateSource::Body(body) => self.client.validate_template().template_body(body),
            TemplateSource::Url(url) => self.client.validate_template().template_url(url),
        };

        request
            .send()
            .await
            .map_err(|e| classify_api_error("template", e.into_service_error()))?;

        Ok(())
    }
}

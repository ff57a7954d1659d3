//! Control-plane data types.
//!
//! This module defines the domain types exchanged with the stack control
//! plane: events, stack descriptions, listing pages, and mutation specs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::template::TemplateSource;

/// A single entry from a stack's append-only event log.
///
/// Event ids are unique only within one stack's lifetime; a deleted and
/// re-created stack may reuse them.
#[derive(Debug, Clone, Serialize)]
pub struct StackEvent {
    /// Unique event identifier within the stack's lifetime.
    pub event_id: String,
    /// Logical id of the resource the event concerns. For the stack's own
    /// lifecycle events this equals the stack name.
    pub logical_id: String,
    /// Resource type, e.g. `AWS::CloudFormation::Stack`.
    pub resource_type: String,
    /// Raw status code, e.g. `CREATE_IN_PROGRESS`.
    pub status: String,
    /// Optional human-readable reason attached to the status.
    pub status_reason: Option<String>,
    /// When the event was recorded. The ordering key; pagination returns
    /// newest-first.
    pub timestamp: DateTime<Utc>,
}

/// Current state of a deployed stack.
#[derive(Debug, Clone, Serialize)]
pub struct StackDescription {
    /// Stack name.
    pub name: String,
    /// Current raw status code, e.g. `UPDATE_COMPLETE`.
    pub status: String,
    /// Optional reason attached to the current status.
    pub status_reason: Option<String>,
    /// When the stack was created.
    pub creation_time: Option<DateTime<Utc>>,
    /// Stack outputs, keyed by output name.
    pub outputs: BTreeMap<String, String>,
}

/// Summary entry from the stack listing.
#[derive(Debug, Clone, Serialize)]
pub struct StackSummary {
    /// Stack name.
    pub name: String,
    /// Current raw status code.
    pub status: String,
    /// When the stack was created.
    pub creation_time: DateTime<Utc>,
}

/// One page of the paginated event log.
#[derive(Debug, Clone)]
pub struct EventPage {
    /// Events on this page, newest first.
    pub events: Vec<StackEvent>,
    /// Token for the next (older) page, if any.
    pub next_token: Option<String>,
}

/// One page of the paginated stack listing.
#[derive(Debug, Clone)]
pub struct StackPage {
    /// Stack summaries on this page.
    pub stacks: Vec<StackSummary>,
    /// Token for the next page, if any.
    pub next_token: Option<String>,
}

/// A parameter declared by a template, with its optional default.
#[derive(Debug, Clone)]
pub struct DeclaredParameter {
    /// Parameter key as declared by the template.
    pub key: String,
    /// Default value declared by the template, if any.
    pub default_value: Option<String>,
}

/// A concrete parameter value passed to a stack operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackParameter {
    /// Parameter key.
    pub key: String,
    /// Parameter value.
    pub value: String,
}

/// A tag attached to a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackTag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

/// Everything needed to issue a create or update call for a stack.
#[derive(Debug, Clone)]
pub struct StackSpec {
    /// Stack name.
    pub name: String,
    /// Resolved template body or remote reference.
    pub template: TemplateSource,
    /// Normalized parameters.
    pub parameters: Vec<StackParameter>,
    /// Tags as a list of pairs.
    pub tags: Vec<StackTag>,
    /// Capabilities to acknowledge, e.g. `CAPABILITY_IAM`.
    pub capabilities: Vec<String>,
    /// Idempotency token for the mutating call.
    pub client_token: String,
}

impl StackSpec {
    /// Converts a tag map into the list-of-pairs form the control plane
    /// expects, sorted by key.
    #[must_use]
    pub fn tags_from_map(tags: &BTreeMap<String, String>) -> Vec<StackTag> {
        tags.iter()
            .map(|(key, value)| StackTag {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_from_map_preserves_pairs() {
        let mut map = BTreeMap::new();
        map.insert(String::from("team"), String::from("platform"));
        map.insert(String::from("env"), String::from("prod"));

        let tags = StackSpec::tags_from_map(&map);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].key, "env");
        assert_eq!(tags[0].value, "prod");
        assert_eq!(tags[1].key, "team");
    }
}

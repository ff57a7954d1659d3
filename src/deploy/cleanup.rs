//! Bulk cleanup of stale stacks.
//!
//! A best-effort scanner over the account's stack listing: match settled
//! stacks by name pattern and age, oldest first, and delete them through
//! the normal delete path. Individual failures are logged and skipped,
//! never aborting the batch.

use chrono::{DateTime, Duration, Utc};
use futures_util::future::join_all;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::controlplane::StackPage;
use crate::error::{DeployError, Result};

use super::reconciler::Reconciler;
use super::status::STABLE_STATUSES;

/// Options for one cleanup scan.
#[derive(Debug, Clone)]
pub struct CleanupOptions {
    /// Regular expression matched against stack names.
    pub pattern: String,
    /// Only stacks created more than this many minutes ago are touched.
    pub minutes_old: i64,
    /// When true, report candidates without deleting anything.
    pub dry_run: bool,
    /// Delete at most this many stacks, oldest first.
    pub limit: Option<usize>,
}

/// A stack selected by the cleanup scan.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupCandidate {
    /// Stack name.
    pub name: String,
    /// When the stack was created.
    pub creation_time: DateTime<Utc>,
}

impl Reconciler {
    /// Scans for stale stacks and deletes them.
    ///
    /// Returns the candidates the scan acted on (or would act on, in dry
    /// run), ascending by creation time.
    ///
    /// # Errors
    ///
    /// Returns an error when the pattern is invalid or the listing fails.
    /// Individual delete failures are logged and do not fail the scan.
    pub async fn cleanup(&self, options: &CleanupOptions) -> Result<Vec<CleanupCandidate>> {
        let pattern =
            Regex::new(&options.pattern).map_err(|e| DeployError::InvalidPattern {
                pattern: options.pattern.clone(),
                message: e.to_string(),
            })?;
        let cutoff = Utc::now() - Duration::minutes(options.minutes_old);
        let status_filter: Vec<String> = STABLE_STATUSES
            .iter()
            .map(|status| (*status).to_string())
            .collect();

        let mut candidates: Vec<CleanupCandidate> = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let StackPage { stacks, next_token } = self
                .client()
                .list_stacks_page(token, &status_filter)
                .await?;

            candidates.extend(
                stacks
                    .into_iter()
                    .filter(|stack| {
                        pattern.is_match(&stack.name) && stack.creation_time < cutoff
                    })
                    .map(|stack| CleanupCandidate {
                        name: stack.name,
                        creation_time: stack.creation_time,
                    }),
            );

            let Some(next) = next_token else { break };
            token = Some(next);
        }

        candidates.sort_by_key(|candidate| candidate.creation_time);
        if let Some(limit) = options.limit {
            candidates.truncate(limit);
        }

        info!(
            "Cleanup matched {} stack(s) older than {} minute(s)",
            candidates.len(),
            options.minutes_old
        );

        if options.dry_run {
            for candidate in &candidates {
                info!(
                    "Would delete stack: {} (created {})",
                    candidate.name, candidate.creation_time
                );
            }
            return Ok(candidates);
        }

        let deletions = candidates.iter().map(|candidate| async move {
            if let Err(err) = self.delete(&candidate.name).await {
                warn!("Failed to delete stack {}: {err}", candidate.name);
            }
        });
        join_all(deletions).await;

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlplane::{MockControlPlaneClient, StackSummary};
    use crate::deploy::reconciler::ReconcilerConfig;
    use crate::template::DefaultTemplateResolver;
    use std::sync::Arc;

    fn summary(name: &str, age_minutes: i64) -> StackSummary {
        StackSummary {
            name: name.to_string(),
            status: String::from("CREATE_COMPLETE"),
            creation_time: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    fn reconciler(client: MockControlPlaneClient) -> Reconciler {
        let config = ReconcilerConfig {
            detach: true,
            ..ReconcilerConfig::default()
        };
        Reconciler::new(Arc::new(client), Arc::new(DefaultTemplateResolver::new()))
            .with_config(config)
    }

    fn options(pattern: &str) -> CleanupOptions {
        CleanupOptions {
            pattern: pattern.to_string(),
            minutes_old: 60,
            dry_run: false,
            limit: None,
        }
    }

    #[tokio::test]
    async fn test_cleanup_limit_keeps_oldest_candidates() {
        let mut client = MockControlPlaneClient::new();
        client.expect_list_stacks_page().returning(|_, _| {
            // Unsorted on purpose; the scanner orders by creation time.
            Ok(StackPage {
                stacks: vec![
                    summary("test-b", 200),
                    summary("test-c", 100),
                    summary("test-a", 300),
                ],
                next_token: None,
            })
        });
        client
            .expect_delete_stack()
            .withf(|name, _| name == "test-a" || name == "test-b")
            .times(2)
            .returning(|_, _| Ok(()));

        let reconciler = reconciler(client);
        let mut opts = options("^test-");
        opts.limit = Some(2);

        let candidates = reconciler.cleanup(&opts).await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name, "test-a");
        assert_eq!(candidates[1].name, "test-b");
    }

    #[tokio::test]
    async fn test_cleanup_filters_by_pattern_and_age() {
        let mut client = MockControlPlaneClient::new();
        client.expect_list_stacks_page().returning(|_, _| {
            Ok(StackPage {
                stacks: vec![
                    summary("test-old", 120),
                    // Too young.
                    summary("test-new", 5),
                    // Name does not match.
                    summary("prod-old", 120),
                ],
                next_token: None,
            })
        });
        client
            .expect_delete_stack()
            .withf(|name, _| name == "test-old")
            .times(1)
            .returning(|_, _| Ok(()));

        let reconciler = reconciler(client);
        let candidates = reconciler.cleanup(&options("^test-")).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "test-old");
    }

    #[tokio::test]
    async fn test_cleanup_pages_through_listing() {
        let mut client = MockControlPlaneClient::new();
        client
            .expect_list_stacks_page()
            .withf(|token, _| token.is_none())
            .returning(|_, _| {
                Ok(StackPage {
                    stacks: vec![summary("test-1", 120)],
                    next_token: Some(String::from("page-2")),
                })
            });
        client
            .expect_list_stacks_page()
            .withf(|token, _| token.as_deref() == Some("page-2"))
            .returning(|_, _| {
                Ok(StackPage {
                    stacks: vec![summary("test-2", 120)],
                    next_token: None,
                })
            });
        client.expect_delete_stack().times(2).returning(|_, _| Ok(()));

        let reconciler = reconciler(client);
        let candidates = reconciler.cleanup(&options("^test-")).await.unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_cleanup_dry_run_deletes_nothing() {
        let mut client = MockControlPlaneClient::new();
        client.expect_list_stacks_page().returning(|_, _| {
            Ok(StackPage {
                stacks: vec![summary("test-old", 120)],
                next_token: None,
            })
        });
        client.expect_delete_stack().never();

        let reconciler = reconciler(client);
        let mut opts = options("^test-");
        opts.dry_run = true;

        let candidates = reconciler.cleanup(&opts).await.unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_continues_past_delete_failures() {
        let mut client = MockControlPlaneClient::new();
        client.expect_list_stacks_page().returning(|_, _| {
            Ok(StackPage {
                stacks: vec![summary("test-a", 300), summary("test-b", 200)],
                next_token: None,
            })
        });
        client
            .expect_delete_stack()
            .withf(|name, _| name == "test-a")
            .returning(|_, _| {
                Err(crate::error::ControlPlaneError::service("denied").into())
            });
        client
            .expect_delete_stack()
            .withf(|name, _| name == "test-b")
            .times(1)
            .returning(|_, _| Ok(()));

        let reconciler = reconciler(client);
        let candidates = reconciler.cleanup(&options("^test-")).await.unwrap();
        // Both candidates are reported even though one delete failed.
        assert_eq!(candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_cleanup_rejects_invalid_pattern() {
        let client = MockControlPlaneClient::new();
        let reconciler = reconciler(client);

        let result = reconciler.cleanup(&options("test-[")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cleanup_requests_settled_statuses_only() {
        let mut client = MockControlPlaneClient::new();
        client
            .expect_list_stacks_page()
            .withf(|_, filter| {
                filter.contains(&String::from("CREATE_COMPLETE"))
                    && filter.contains(&String::from("DELETE_FAILED"))
                    && !filter.contains(&String::from("CREATE_IN_PROGRESS"))
                    && !filter.contains(&String::from("DELETE_COMPLETE"))
            })
            .returning(|_, _| {
                Ok(StackPage {
                    stacks: vec![],
                    next_token: None,
                })
            });

        let reconciler = reconciler(client);
        let candidates = reconciler.cleanup(&options(".*")).await.unwrap();
        assert!(candidates.is_empty());
    }
}

//! Touchpoint import
//!
//! Reads a JSON array of touchpoints, as exported by the tracking side, into
//! the local store.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Deserialize;
use tracing::warn;
use trackflow_attribution::{Touchpoint, TouchpointId, TouchpointStore, TrackflowError};

use super::Context;

#[derive(Args)]
pub struct ImportArgs {
    /// JSON file containing an array of touchpoints
    pub file: PathBuf,
}

/// Touchpoint as written in an import file; `id` and `position` are optional
#[derive(Debug, Deserialize)]
pub struct ImportedTouchpoint {
    pub id: Option<String>,
    pub subject_id: String,
    pub timestamp: DateTime<Utc>,
    pub channel: String,
    #[serde(default)]
    pub campaign_id: Option<String>,
    pub position: Option<u32>,
}

impl ImportedTouchpoint {
    /// Convert to a touchpoint, defaulting the position to the file index
    pub fn into_touchpoint(self, index: usize) -> Touchpoint {
        Touchpoint {
            id: self
                .id
                .map(TouchpointId::from)
                .unwrap_or_else(TouchpointId::generate),
            subject_id: self.subject_id.into(),
            timestamp: self.timestamp,
            channel: self.channel,
            campaign_id: self.campaign_id,
            position: self
                .position
                .unwrap_or_else(|| u32::try_from(index).unwrap_or(u32::MAX)),
        }
    }
}

/// Counts from an import run
#[derive(Debug, Default, PartialEq)]
pub struct ImportStats {
    pub imported: usize,
    pub skipped: usize,
}

/// Parse an import document
pub fn parse_touchpoints(contents: &str) -> Result<Vec<Touchpoint>> {
    let imported: Vec<ImportedTouchpoint> =
        serde_json::from_str(contents).context("Expected a JSON array of touchpoints")?;
    Ok(imported
        .into_iter()
        .enumerate()
        .map(|(index, tp)| tp.into_touchpoint(index))
        .collect())
}

/// Record touchpoints, skipping ones the store already has
pub async fn import_touchpoints(
    store: &dyn TouchpointStore,
    touchpoints: Vec<Touchpoint>,
) -> Result<ImportStats> {
    let mut stats = ImportStats::default();
    for touchpoint in touchpoints {
        let id = touchpoint.id.clone();
        match store.record_touchpoint(touchpoint).await {
            Ok(()) => stats.imported += 1,
            Err(e @ TrackflowError::DuplicateTouchpoint { .. }) => {
                warn!(touchpoint = %id, reason = %e, "Skipping touchpoint");
                stats.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(stats)
}

pub async fn run(ctx: &Context, args: ImportArgs) -> Result<()> {
    let contents = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let touchpoints = parse_touchpoints(&contents)?;

    let store = ctx.open_store().await?;
    let stats = import_touchpoints(&store, touchpoints).await?;

    println!(
        "Imported {} touchpoint(s) into {}",
        stats.imported,
        store.path().display()
    );
    if stats.skipped > 0 {
        println!("Skipped {} already-recorded touchpoint(s)", stats.skipped);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackflow_attribution::{InMemoryTouchpointStore, JsonFileStore};

    const SAMPLE: &str = r#"[
        {"id": "tp-1", "subject_id": "deal-1", "timestamp": "2026-02-01T10:00:00Z", "channel": "organic"},
        {"subject_id": "deal-1", "timestamp": "2026-02-03T10:00:00Z", "channel": "email", "campaign_id": "nurture"},
        {"id": "tp-3", "subject_id": "deal-2", "timestamp": "2026-02-04T10:00:00Z", "channel": "direct", "position": 7}
    ]"#;

    #[test]
    fn test_parse_assigns_ids_and_positions() {
        let touchpoints = parse_touchpoints(SAMPLE).unwrap();

        assert_eq!(touchpoints.len(), 3);
        assert_eq!(touchpoints[0].id.as_str(), "tp-1");
        assert_eq!(touchpoints[0].position, 0);
        assert!(!touchpoints[1].id.as_str().is_empty());
        assert_eq!(touchpoints[1].position, 1);
        assert_eq!(touchpoints[1].campaign_id.as_deref(), Some("nurture"));
        assert_eq!(touchpoints[2].position, 7);
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(parse_touchpoints(r#"{"id": "tp-1"}"#).is_err());
    }

    #[tokio::test]
    async fn test_import_skips_duplicates() {
        let store = InMemoryTouchpointStore::new();

        let first = import_touchpoints(&store, parse_touchpoints(SAMPLE).unwrap())
            .await
            .unwrap();
        assert_eq!(first, ImportStats { imported: 3, skipped: 0 });

        // Generated IDs differ on re-parse, so only the explicit ones collide
        let second = import_touchpoints(&store, parse_touchpoints(SAMPLE).unwrap())
            .await
            .unwrap();
        assert_eq!(second, ImportStats { imported: 1, skipped: 2 });
    }

    #[tokio::test]
    async fn test_import_fails_when_store_cannot_write() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = JsonFileStore::open(&blocker.join("data")).await.unwrap();

        let result = import_touchpoints(&store, parse_touchpoints(SAMPLE).unwrap()).await;

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrackflowError>(),
            Some(TrackflowError::Store(_))
        ));
        assert!(store.fetch_touchpoints(&"deal-1".into()).await.unwrap().is_empty());
    }
}

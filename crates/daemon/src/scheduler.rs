// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cadence scheduler.
//!
//! Evaluates each active stream's cadence entries against persistent
//! last-run markers and creates runs for the ones that are due. The marker
//! is written before the tick returns, so a repeated tick cannot create a
//! duplicate run. One stream failing never aborts the others; the same
//! holds for legacy cron triggers.

use chrono::{DateTime, SecondsFormat, Utc};
use flux_core::{
    cadence_to_ms, is_due, parse_cadence_config, Cadence, CadenceEntry, Clock, StreamId,
    CADENCE_NAMESPACE,
};
use flux_store::{CronTrigger, NewRun, Store, StoreError, Stream};
use serde_json::json;
use std::sync::Arc;

/// Admin-kv marker prefix for the legacy trigger path.
const TRIGGER_MARKER_PREFIX: &str = "last_playbook_trigger_run:";

/// Periodic cadence evaluator, invoked from the supervisor heartbeat.
pub struct CadenceScheduler<S, C> {
    store: Arc<S>,
    clock: C,
}

/// Epoch ms rendered the way markers are stored (ISO-8601, millisecond
/// precision, UTC).
fn to_iso(ms: u64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms as i64)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored marker back to epoch ms. `None` for anything unreadable,
/// which the caller treats as "never ran".
fn parse_marker(marker: &str) -> Option<u64> {
    DateTime::parse_from_rfc3339(marker)
        .ok()
        .map(|dt| dt.timestamp_millis() as u64)
}

impl<S, C> CadenceScheduler<S, C>
where
    S: Store,
    C: Clock,
{
    pub fn new(store: Arc<S>, clock: C) -> Self {
        Self { store, clock }
    }

    /// Evaluate all streams and legacy triggers. Never fails as a whole.
    pub async fn check_cadences(&self) {
        match self.store.list_streams().await {
            Ok(streams) => {
                for stream in streams.iter().filter(|s| s.active) {
                    if let Err(e) = self.check_stream(stream).await {
                        tracing::warn!(stream = %stream.id, error = %e, "cadence check failed");
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to list streams"),
        }

        match self.store.get_enabled_cron_triggers().await {
            Ok(triggers) => {
                for trigger in &triggers {
                    if let Err(e) = self.check_trigger(trigger).await {
                        tracing::warn!(trigger = %trigger.id, error = %e, "trigger check failed");
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to list cron triggers"),
        }
    }

    async fn check_stream(&self, stream: &Stream) -> Result<(), StoreError> {
        let Some(config_json) = &stream.cadence_config_json else {
            return Ok(());
        };
        for entry in parse_cadence_config(config_json) {
            if !entry.enabled {
                continue;
            }
            // parse_cadence_config only keeps entries with a valid schedule
            let Some(schedule) = entry.schedule else {
                continue;
            };
            self.check_entry(&stream.id, &entry, &schedule).await?;
        }
        Ok(())
    }

    async fn check_entry(
        &self,
        stream_id: &StreamId,
        entry: &CadenceEntry,
        schedule: &Cadence,
    ) -> Result<(), StoreError> {
        let now_ms = self.clock.epoch_ms();
        let marker = self
            .store
            .memory_kv_get(stream_id, CADENCE_NAMESPACE, &entry.marker_key())
            .await?;
        let last_run = marker.as_deref().and_then(parse_marker);

        if !is_due(now_ms, last_run, schedule) {
            return Ok(());
        }

        let playbook = self
            .store
            .get_playbook_by_slug(&entry.playbook_slug, Some(stream_id))
            .await?;
        match playbook {
            Some(playbook) if playbook.status == "active" => {
                let thread_id = format!("cadence:{}:{}:{}", stream_id, entry.name, now_ms);
                let params_json = json!({
                    "cadence": entry.name,
                    "source": "cadence",
                })
                .to_string();
                self.store
                    .create_run(NewRun {
                        playbook_id: playbook.id.clone(),
                        thread_id,
                        params_json,
                    })
                    .await?;
                tracing::info!(
                    stream = %stream_id,
                    cadence = %entry.name,
                    playbook = %entry.playbook_slug,
                    period_ms = cadence_to_ms(schedule),
                    "cadence fired"
                );
            }
            Some(_) => {
                tracing::debug!(
                    stream = %stream_id,
                    playbook = %entry.playbook_slug,
                    "playbook not active, skipping"
                );
            }
            None => {
                tracing::debug!(
                    stream = %stream_id,
                    playbook = %entry.playbook_slug,
                    "playbook not found, skipping"
                );
            }
        }

        // Marker written before returning: repeated ticks must not refire.
        self.store
            .memory_kv_upsert(
                stream_id,
                CADENCE_NAMESPACE,
                &entry.marker_key(),
                &to_iso(now_ms),
            )
            .await?;
        Ok(())
    }

    /// Legacy cron-type trigger path. Fires through the same run-creation
    /// flow, with markers in the admin key-value space.
    async fn check_trigger(&self, trigger: &CronTrigger) -> Result<(), StoreError> {
        let config: serde_json::Value = match serde_json::from_str(&trigger.config_json) {
            Ok(value) => value,
            Err(_) => return Ok(()), // unreadable config: skip, never crash
        };
        let Some(schedule) = config
            .get("schedule")
            .and_then(|s| serde_json::from_value::<Cadence>(s.clone()).ok())
            .filter(Cadence::is_valid)
        else {
            return Ok(());
        };

        let now_ms = self.clock.epoch_ms();
        let marker_key = format!("{}{}", TRIGGER_MARKER_PREFIX, trigger.id);
        let last_run = self
            .store
            .admin_get_value(&marker_key)
            .await?
            .as_deref()
            .and_then(parse_marker);

        if !is_due(now_ms, last_run, &schedule) {
            return Ok(());
        }

        let playbook = self
            .store
            .get_playbook_by_slug(&trigger.playbook_slug, trigger.stream_id.as_ref())
            .await?;
        if let Some(playbook) = playbook.filter(|p| p.status == "active") {
            let scope = trigger
                .stream_id
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "global".to_string());
            let thread_id = format!("cadence:{}:{}:{}", scope, trigger.id, now_ms);
            let params_json = json!({
                "cadence": trigger.id,
                "source": "trigger",
            })
            .to_string();
            self.store
                .create_run(NewRun {
                    playbook_id: playbook.id.clone(),
                    thread_id,
                    params_json,
                })
                .await?;
            tracing::info!(
                trigger = %trigger.id,
                playbook = %trigger.playbook_slug,
                "legacy trigger fired"
            );
        }

        self.store
            .admin_set_value(&marker_key, &to_iso(now_ms))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;

use crate::config::{ColorPalette, StatusColor};
use crate::models::card::{ComposeOutcome, EmbedField, NavState, PageState, RenderPayload, Thumbnail};
use crate::models::pipeline::Pipeline;
use crate::models::server::ServerRecord;
use crate::probe::{LivenessProbe, LivenessResult};
use crate::storage::RecordStore;
use crate::text;
use log::{debug, error, warn};
use serde_json::Value;
use std::sync::Arc;

const ONLINE_GLYPH: &str = "🟢";
const OFFLINE_GLYPH: &str = "🔴";

/// Builds one catalog card per call. Holds only shared read-only handles, so a
/// single instance serves any number of concurrent renders.
#[derive(Clone)]
pub struct Composer {
    store: Arc<dyn RecordStore>,
    prober: Arc<dyn LivenessProbe>,
    palette: ColorPalette,
}

impl Composer {
    pub fn new(store: Arc<dyn RecordStore>, prober: Arc<dyn LivenessProbe>, palette: ColorPalette) -> Self {
        Self {
            store,
            prober,
            palette,
        }
    }

    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    pub async fn compose(&self, pipeline: &Pipeline, index: usize) -> ComposeOutcome {
        let total = match self.store.count(pipeline).await {
            Ok(total) => total,
            Err(e) => {
                error!("Failed to count {}: {}", pipeline.subject_name(), e);
                return ComposeOutcome::Degraded(self.missing_record());
            }
        };

        if total == 0 {
            return ComposeOutcome::Empty;
        }

        let index = clamp_index(index, total);

        let record = match self.store.get_at(pipeline, index).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!("No server at {} of {} in {}", index, total, pipeline.subject_name());
                return ComposeOutcome::Degraded(self.missing_record());
            }
            Err(e) => {
                error!("Failed to load server {} in {}: {}", index, pipeline.subject_name(), e);
                return ComposeOutcome::Degraded(self.missing_record());
            }
        };

        let liveness = self
            .prober
            .probe(&record.address.ip, record.address.port)
            .await;

        ComposeOutcome::Card {
            payload: self.card(&record, liveness, pipeline, index, total),
            page: PageState { index, total },
        }
    }

    /// Player sample of the record a card at `index` would show.
    pub async fn sample(&self, pipeline: &Pipeline, index: usize) -> Option<Value> {
        let total = match self.store.count(pipeline).await {
            Ok(total) => total,
            Err(e) => {
                error!("Failed to count {}: {}", pipeline.subject_name(), e);
                return None;
            }
        };
        if total == 0 {
            return None;
        }
        match self.store.get_at(pipeline, clamp_index(index, total)).await {
            Ok(record) => record.and_then(|r| r.sample),
            Err(e) => {
                error!("Failed to load players in {}: {}", pipeline.subject_name(), e);
                None
            }
        }
    }

    fn card(
        &self,
        record: &ServerRecord,
        liveness: LivenessResult,
        pipeline: &Pipeline,
        index: usize,
        total: usize,
    ) -> RenderPayload {
        let (glyph, color) = if liveness.reachable {
            (ONLINE_GLYPH, StatusColor::Success)
        } else {
            (OFFLINE_GLYPH, StatusColor::Error)
        };

        RenderPayload {
            title: format!("{} {}", glyph, record.hostname),
            description: text::to_plain_text(&record.description),
            color: self.palette.get(color),
            footer_text: Some(format!(
                "Showing {} of {} servers in: {}",
                index + 1,
                total,
                pipeline.subject_name()
            )),
            timestamp: Some(text::now_timestamp()),
            thumbnail: thumbnail(record, liveness),
            fields: vec![
                EmbedField::new(
                    "Version",
                    format!("{} ({})", record.version.name, record.version.protocol),
                    true,
                ),
                EmbedField::new(
                    "Players",
                    format!("{}/{}", record.players.online, record.players.max),
                    true,
                ),
                EmbedField::new("Cracked", if record.cracked { "Yes" } else { "No" }, true),
                EmbedField::new("Time since last scan", text::relative_time(record.last_seen_at), false),
            ],
            nav: nav_state(index, total, record),
        }
    }

    fn missing_record(&self) -> RenderPayload {
        RenderPayload {
            title: "Error".to_string(),
            description: "No server found".to_string(),
            color: self.palette.get(StatusColor::Warning),
            footer_text: None,
            timestamp: None,
            thumbnail: None,
            fields: Vec::new(),
            nav: NavState::all_disabled(),
        }
    }
}

/// Indexes past the end wrap to the first record, so navigation keeps working
/// after the catalog shrinks.
pub fn clamp_index(index: usize, total: usize) -> usize {
    if index >= total {
        0
    } else {
        index
    }
}

/// "Next" wraps around, so it is only disabled when there is nothing else to
/// show.
pub fn nav_state(index: usize, total: usize, record: &ServerRecord) -> NavState {
    NavState {
        next_disabled: total <= 1,
        prev_disabled: index == 0,
        players_disabled: !record.has_sample(),
    }
}

// Stale icons of unreachable hosts are never shown.
fn thumbnail(record: &ServerRecord, liveness: LivenessResult) -> Option<Thumbnail> {
    if !liveness.reachable {
        return None;
    }
    let icon = record.icon.as_ref()?;
    match icon.decode() {
        Ok(bytes) => {
            debug!("{} has an icon", record.hostname);
            Some(Thumbnail {
                file_name: format!("favicon-{}.{}", uuid::Uuid::new_v4().simple(), icon.extension()),
                content_type: icon.mime.clone(),
                bytes,
            })
        }
        Err(e) => {
            warn!("Undecodable icon for {}: {}", record.hostname, e);
            None
        }
    }
}

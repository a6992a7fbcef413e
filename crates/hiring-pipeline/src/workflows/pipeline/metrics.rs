use std::collections::HashMap;

use serde::Serialize;

use super::domain::{Candidate, StageId, StageStatus};
use super::registry::StageRegistry;

/// Pipeline-wide statistics, always recomputed from a full snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineMetrics {
    pub total_candidates: usize,
    pub avg_days_per_stage: f64,
    pub drop_off_rate: f64,
    pub bottleneck_stage_id: Option<StageId>,
    pub active_interviews: usize,
    pub pending_feedback: usize,
}

/// Per-stage breakdown shown next to the headline metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    pub stage_id: StageId,
    pub stage_label: String,
    pub order: u32,
    pub status: StageStatus,
    pub status_label: &'static str,
    pub candidate_count: usize,
    pub overdue_count: usize,
    pub pending_feedback: usize,
    pub avg_days_in_stage: f64,
}

#[derive(Debug, Default, Clone)]
struct StageTally {
    count: usize,
    overdue: usize,
    pending_feedback: usize,
    total_days: f64,
}

impl StageTally {
    fn average_days(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_days / self.count as f64
        }
    }
}

fn tally(registry: &StageRegistry, candidates: &[Candidate]) -> HashMap<StageId, StageTally> {
    let mut tallies: HashMap<StageId, StageTally> = HashMap::with_capacity(registry.len());

    for candidate in candidates {
        if candidate.is_archived() || !registry.contains(&candidate.stage_id) {
            continue;
        }
        let entry = tallies.entry(candidate.stage_id.clone()).or_default();
        entry.count += 1;
        entry.total_days += candidate.time_in_stage_days();
        if candidate.is_overdue {
            entry.overdue += 1;
        }
        if candidate.needs_feedback {
            entry.pending_feedback += 1;
        }
    }

    tallies
}

pub fn compute(registry: &StageRegistry, candidates: &[Candidate]) -> PipelineMetrics {
    let tallies = tally(registry, candidates);
    let empty = StageTally::default();
    let stage_tally = |id: &StageId| tallies.get(id).unwrap_or(&empty);

    let total_candidates = tallies.values().map(|tally| tally.count).sum();
    let pending_feedback = tallies.values().map(|tally| tally.pending_feedback).sum();

    let occupied: Vec<f64> = registry
        .ordered()
        .iter()
        .map(|stage| stage_tally(&stage.id))
        .filter(|tally| tally.count > 0)
        .map(StageTally::average_days)
        .collect();
    let avg_days_per_stage = if occupied.is_empty() {
        0.0
    } else {
        round2(occupied.iter().sum::<f64>() / occupied.len() as f64)
    };

    let drop_off_rate = match (registry.first(), registry.last()) {
        (Some(first), Some(last)) => {
            let entering = stage_tally(&first.id).count;
            let remaining = stage_tally(&last.id).count;
            if entering == 0 {
                0.0
            } else {
                let rate = (entering as f64 - remaining as f64) / entering as f64 * 100.0;
                round2(rate.clamp(0.0, 100.0))
            }
        }
        _ => 0.0,
    };

    let has_unhealthy = registry
        .ordered()
        .iter()
        .any(|stage| !stage.status.is_healthy());
    // Stages come in catalog order, so a strict comparison keeps the lowest
    // order on ties.
    let mut bottleneck: Option<(&StageId, f64)> = None;
    for stage in registry.ordered() {
        if has_unhealthy && stage.status.is_healthy() {
            continue;
        }
        let average = stage_tally(&stage.id).average_days();
        let slower = bottleneck.map_or(true, |(_, best)| average > best);
        if slower {
            bottleneck = Some((&stage.id, average));
        }
    }

    let active_interviews = registry
        .interview_stage()
        .map(|stage| stage_tally(&stage.id).count)
        .unwrap_or(0);

    PipelineMetrics {
        total_candidates,
        avg_days_per_stage,
        drop_off_rate,
        bottleneck_stage_id: bottleneck.map(|(id, _)| id.clone()),
        active_interviews,
        pending_feedback,
    }
}

pub fn stage_summaries(registry: &StageRegistry, candidates: &[Candidate]) -> Vec<StageSummary> {
    let tallies = tally(registry, candidates);

    registry
        .ordered()
        .iter()
        .map(|stage| {
            let tally = tallies.get(&stage.id).cloned().unwrap_or_default();
            StageSummary {
                stage_id: stage.id.clone(),
                stage_label: stage.name.clone(),
                order: stage.order,
                status: stage.status,
                status_label: stage.status.label(),
                candidate_count: tally.count,
                overdue_count: tally.overdue,
                pending_feedback: tally.pending_feedback,
                avg_days_in_stage: round2(tally.average_days()),
            }
        })
        .collect()
}

/// Two decimals, half away from zero.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

use chrono::Duration;

use super::common::*;
use crate::workflows::pipeline::domain::{Candidate, StageId, StageStatus};
use crate::workflows::pipeline::metrics::{compute, stage_summaries};
use crate::workflows::pipeline::registry::StageRegistry;

fn population(stage_id: &str, count: usize, days: i64) -> Vec<Candidate> {
    (0..count)
        .map(|index| {
            let id = format!("{stage_id}-{index:02}");
            aged(candidate(&id, &id, stage_id), days)
        })
        .collect()
}

#[test]
fn drop_off_rate_rounds_to_two_decimals() {
    let registry = standard_registry();
    let mut candidates = population("applied", 18, 1);
    candidates.extend(population("passed", 4, 1));

    let metrics = compute(&registry, &candidates);
    assert_eq!(metrics.total_candidates, 22);
    assert_eq!(metrics.drop_off_rate, 77.78);
}

#[test]
fn drop_off_rate_is_zero_without_entrants_and_clamped_at_zero() {
    let registry = standard_registry();
    let metrics = compute(&registry, &population("passed", 3, 1));
    assert_eq!(metrics.drop_off_rate, 0.0);

    let mut candidates = population("applied", 2, 1);
    candidates.extend(population("passed", 5, 1));
    assert_eq!(compute(&registry, &candidates).drop_off_rate, 0.0);
}

#[test]
fn average_days_skips_empty_stages() {
    let registry = standard_registry();
    let candidates = vec![
        aged(candidate("c-1", "Ada", "applied"), 2),
        aged(candidate("c-2", "Bo", "applied"), 4),
        aged(candidate("c-3", "Cy", "interview"), 6),
    ];

    let metrics = compute(&registry, &candidates);
    assert_eq!(metrics.avg_days_per_stage, 4.5);
    assert_eq!(compute(&registry, &[]).avg_days_per_stage, 0.0);
}

#[test]
fn bottleneck_prefers_unhealthy_stages() {
    let registry = standard_registry();
    let mut candidates = population("applied", 3, 10);
    candidates.extend(population("interview", 2, 2));
    candidates.extend(population("assessment", 2, 1));

    let metrics = compute(&registry, &candidates);
    assert_eq!(metrics.bottleneck_stage_id, Some(StageId::new("interview")));
}

#[test]
fn bottleneck_ties_go_to_the_lowest_order() {
    let registry = standard_registry();
    let mut candidates = population("assessment", 1, 3);
    candidates.extend(population("interview", 1, 3));

    let metrics = compute(&registry, &candidates);
    assert_eq!(metrics.bottleneck_stage_id, Some(StageId::new("interview")));
}

#[test]
fn bottleneck_uses_every_stage_when_all_are_healthy() {
    let registry = StageRegistry::new(vec![
        stage("sourced", 0, StageStatus::Healthy, 3, false),
        stage("screened", 1, StageStatus::Healthy, 3, false),
        stage("hired", 2, StageStatus::Healthy, 3, false),
    ])
    .expect("valid catalog");

    let mut candidates = population("screened", 2, 5);
    candidates.extend(population("hired", 1, 5));
    candidates.extend(population("sourced", 4, 1));
    assert_eq!(
        compute(&registry, &candidates).bottleneck_stage_id,
        Some(StageId::new("screened"))
    );
    assert_eq!(
        compute(&registry, &[]).bottleneck_stage_id,
        Some(StageId::new("sourced"))
    );
}

#[test]
fn interviews_and_feedback_ignore_archived_candidates() {
    let registry = standard_registry();
    let mut waiting = candidate("c-1", "Ada", "interview");
    waiting.needs_feedback = true;
    let settled = candidate("c-2", "Bo", "interview");
    let mut screening = candidate("c-3", "Cy", "phone_screen");
    screening.needs_feedback = true;
    let mut gone = candidate("c-4", "Di", "interview");
    gone.needs_feedback = true;
    gone.archived_at = Some(start());

    let metrics = compute(&registry, &[waiting, settled, screening, gone]);
    assert_eq!(metrics.total_candidates, 3);
    assert_eq!(metrics.active_interviews, 2);
    assert_eq!(metrics.pending_feedback, 2);
}

#[test]
fn stage_summaries_cover_every_stage_in_order() {
    let registry = standard_registry();
    let mut late = aged(candidate("c-1", "Ada", "applied"), 5);
    late.is_overdue = true;
    let mut pending = aged(candidate("c-2", "Bo", "interview"), 1);
    pending.needs_feedback = true;
    let candidates = vec![late, aged(candidate("c-3", "Cy", "applied"), 2), pending];

    let summaries = stage_summaries(&registry, &candidates);
    assert_eq!(summaries.len(), registry.len());
    assert!(summaries.windows(2).all(|pair| pair[0].order < pair[1].order));

    let applied = &summaries[0];
    assert_eq!(applied.stage_id, StageId::new("applied"));
    assert_eq!(applied.candidate_count, 2);
    assert_eq!(applied.overdue_count, 1);
    assert_eq!(applied.avg_days_in_stage, 3.5);

    let interview = &summaries[3];
    assert_eq!(interview.status_label, "Warning");
    assert_eq!(interview.pending_feedback, 1);
    assert_eq!(summaries[6].candidate_count, 0);
}

#[test]
fn service_metrics_are_recomputed_from_the_clock() {
    let (service, _, clock) = build_service();
    seed(&service, "c-1", "Ada", "applied");
    clock.advance(Duration::days(2));
    seed(&service, "c-2", "Bo", "applied");

    let metrics = service.metrics();
    assert_eq!(metrics.total_candidates, 2);
    assert_eq!(metrics.avg_days_per_stage, 1.0);
    assert_eq!(metrics.drop_off_rate, 100.0);
    assert_eq!(metrics.bottleneck_stage_id, Some(StageId::new("interview")));

    clock.advance(Duration::days(2));
    assert_eq!(service.metrics().avg_days_per_stage, 3.0);
}

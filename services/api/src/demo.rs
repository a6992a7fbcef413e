use crate::infra::{parse_instant, parse_snake_case, InMemoryNotificationSink};
use chrono::{DateTime, Duration, TimeZone, Utc};
use clap::Args;
use hiring_pipeline::error::AppError;
use hiring_pipeline::workflows::ats::AtsFeedImporter;
use hiring_pipeline::workflows::pipeline::{
    load_registry, BulkAction, BulkResult, Candidate, CandidateId, CandidateImport, Clock,
    FilterSpec, FixedClock, ImportSummary, Move, NotificationSink, PipelineMetrics,
    PipelineService, Priority, SortDirection, SortKey, SortSpec, Stage, StageId, StageRegistry,
    StageStatus, StageSummary, StatusFilter,
};
use std::path::PathBuf;
use std::sync::Arc;

const FIRST_NAMES: [&str; 12] = [
    "Avery", "Blake", "Casey", "Devon", "Emery", "Finley", "Harper", "Jordan", "Kendall", "Logan",
    "Morgan", "Quinn",
];
const POSITIONS: [&str; 4] = [
    "Backend Engineer",
    "Product Designer",
    "Data Analyst",
    "Site Reliability Engineer",
];

#[derive(Args, Debug)]
pub(crate) struct PipelineReportArgs {
    /// ATS CSV export to load before reporting
    #[arg(long)]
    pub(crate) feed: Option<PathBuf>,
    /// JSON stage catalog (defaults to the standard seven-stage catalog)
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// List the candidates of this stage after the metrics
    #[arg(long)]
    pub(crate) stage: Option<String>,
    /// Case-insensitive match against candidate name or position
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// all, overdue, high_priority, or needs_feedback
    #[arg(long, value_parser = parse_snake_case::<StatusFilter>, default_value = "all")]
    pub(crate) status: StatusFilter,
    /// name, priority, time_in_stage, or score
    #[arg(long, value_parser = parse_snake_case::<SortKey>, default_value = "name")]
    pub(crate) sort: SortKey,
    /// Sort the stage view in descending order
    #[arg(long)]
    pub(crate) descending: bool,
    /// Measure time in stage as of this instant (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    pub(crate) as_of: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of synthetic candidates placed in the first stage
    #[arg(long, default_value_t = 18)]
    pub(crate) applicants: usize,
    /// Number of synthetic candidates placed in the last stage
    #[arg(long, default_value_t = 4)]
    pub(crate) finalists: usize,
    /// Skip the bulk action portion of the demo
    #[arg(long)]
    pub(crate) skip_bulk: bool,
}

pub(crate) fn run_pipeline_report(args: PipelineReportArgs) -> Result<(), AppError> {
    let PipelineReportArgs {
        feed,
        catalog,
        stage,
        search,
        status,
        sort,
        descending,
        as_of,
    } = args;

    let registry = Arc::new(load_registry(catalog.as_deref())?);
    let clock = Arc::new(FixedClock::new(as_of.unwrap_or_else(Utc::now)));
    let service = PipelineService::new(
        registry,
        Arc::new(InMemoryNotificationSink::default()),
        clock.clone(),
    );

    println!("Pipeline report");
    println!("As of {}", clock.now().format("%Y-%m-%d %H:%M UTC"));
    match &feed {
        Some(path) => {
            let summary = AtsFeedImporter::from_path(path)?.import_into(&service);
            println!("Data source: ATS feed {}", path.display());
            render_import_summary(&summary);
        }
        None => println!("Data source: none (pass --feed to load an ATS export)"),
    }

    render_metrics(&service.metrics(), &service.stage_summaries());

    if let Some(stage) = stage {
        let filter = FilterSpec {
            search_text: search.unwrap_or_default(),
            status,
        };
        let direction = if descending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        let view = service.query_view(
            &StageId::new(stage.as_str()),
            &filter,
            &SortSpec::new(sort, direction),
        )?;
        println!("\nCandidates in '{stage}' ({} shown)", view.len());
        render_view(&view);
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        applicants,
        finalists,
        skip_bulk,
    } = args;

    let start = Utc
        .with_ymd_and_hms(2025, 3, 3, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);

    println!("Hiring pipeline demo");
    walk_feedback_gate(start)?;

    let registry = Arc::new(load_registry(None)?);
    let sink = Arc::new(InMemoryNotificationSink::default());
    let clock = Arc::new(FixedClock::new(start));
    let service = PipelineService::new(registry.clone(), sink.clone(), clock);

    let imports = synthetic_population(&registry, applicants, finalists, start);
    let summary = service.import_batch(imports);
    println!("\nSynthetic pipeline ({applicants} applicants, {finalists} finalists)");
    render_import_summary(&summary);
    render_metrics(&service.metrics(), &service.stage_summaries());

    if !skip_bulk {
        demo_bulk_actions(&service, &registry)?;
    }

    let events = sink.events();
    println!("\nNotifications queued for messaging: {}", events.len());
    for event in events.iter().rev().take(3).rev() {
        let candidate = event
            .candidate_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  - {} ({candidate})", event.kind.label());
    }

    Ok(())
}

fn walk_feedback_gate(start: DateTime<Utc>) -> Result<(), AppError> {
    let stage = |id: &str, order: u32, name: &str, status: StageStatus, requires_feedback: bool| Stage {
        id: StageId::new(id),
        order,
        name: name.to_string(),
        status,
        avg_time_target_days: 3 + order * 2,
        requires_feedback,
        ai_supported: !requires_feedback,
        interview: requires_feedback,
    };
    let registry = StageRegistry::new(vec![
        stage("applied", 0, "Applied", StageStatus::Healthy, false),
        stage("qualified", 1, "Qualified", StageStatus::Healthy, false),
        stage("interview", 2, "Interview", StageStatus::Warning, true),
    ])?;

    let clock = Arc::new(FixedClock::new(start));
    let service = PipelineService::new(
        Arc::new(registry),
        Arc::new(InMemoryNotificationSink::default()),
        clock.clone(),
    );

    println!("\nFeedback gate walkthrough");
    let casey = service.import_candidate(CandidateImport {
        id: Some(CandidateId::new("casey")),
        name: "Casey Rivera".to_string(),
        position: "Backend Engineer".to_string(),
        stage_id: StageId::new("applied"),
        stage_entered_at: None,
        priority: Priority::High,
        score: None,
        tags: Vec::new(),
        has_notes: false,
        needs_feedback: false,
        next_action: Some("Review resume".to_string()),
    })?;
    println!("  1. Imported {} into {}", casey.name, casey.stage_id);

    clock.advance(Duration::days(2));
    for step in 2..=3 {
        match service.move_candidate(&casey.id, Move::Forward) {
            Ok(moved) => println!("  {step}. Advanced to {}", moved.stage_id),
            Err(err) => println!("  {step}. Advance refused: {err}"),
        }
    }

    service.request_feedback(&casey.id)?;
    println!("  4. Interview feedback requested");
    match service.move_candidate(&casey.id, Move::Forward) {
        Ok(moved) => println!("  5. Advanced to {}", moved.stage_id),
        Err(err) => println!("  5. Advance refused ({}): {err}", err.kind().label()),
    }
    let current = service.get(&casey.id)?;
    println!("     {} remains in {}", current.name, current.stage_id);

    Ok(())
}

fn synthetic_population(
    registry: &StageRegistry,
    applicants: usize,
    finalists: usize,
    now: DateTime<Utc>,
) -> Vec<CandidateImport> {
    let stages = registry.ordered();
    let (Some(first), Some(last)) = (stages.first(), stages.last()) else {
        return Vec::new();
    };

    let middle = &stages[1..stages.len().saturating_sub(1).max(1)];
    let mut placements: Vec<&Stage> = Vec::new();
    placements.extend(std::iter::repeat(first).take(applicants));
    for (index, stage) in middle.iter().enumerate() {
        placements.extend(std::iter::repeat(stage).take(middle.len() - index));
    }
    placements.extend(std::iter::repeat(last).take(finalists));

    placements
        .into_iter()
        .enumerate()
        .map(|(index, stage)| {
            let priority = Priority::ordered()[index % 3];
            let days_in_stage = (index * 7 % 11) as i64;
            let needs_feedback = stage.requires_feedback && index % 2 == 0;
            CandidateImport {
                id: Some(CandidateId::new(format!("demo-{:03}", index + 1))),
                name: format!(
                    "{} {}",
                    FIRST_NAMES[index % FIRST_NAMES.len()],
                    (b'A' + (index / FIRST_NAMES.len()) as u8 % 26) as char
                ),
                position: POSITIONS[index % POSITIONS.len()].to_string(),
                stage_id: stage.id.clone(),
                stage_entered_at: Some(now - Duration::days(days_in_stage)),
                priority,
                score: (index % 4 != 0).then(|| (50 + index * 13 % 50) as u8),
                tags: Vec::new(),
                has_notes: index % 3 == 0,
                needs_feedback,
                next_action: None,
            }
        })
        .collect()
}

fn demo_bulk_actions<N, C>(
    service: &PipelineService<N, C>,
    registry: &StageRegistry,
) -> Result<(), AppError>
where
    N: NotificationSink + 'static,
    C: Clock + 'static,
{
    let Some(first) = registry.first() else {
        return Ok(());
    };

    println!("\nBulk advance from {}", first.name);
    let view = service.query_view(
        &first.id,
        &FilterSpec {
            search_text: String::new(),
            status: StatusFilter::HighPriority,
        },
        &SortSpec::new(SortKey::TimeInStage, SortDirection::Descending),
    )?;
    println!("  High-priority view:");
    render_view(&view);

    let mut ids: Vec<CandidateId> = view.iter().map(|candidate| candidate.id.clone()).collect();
    ids.push(CandidateId::new("demo-missing"));
    let result = service.apply_bulk(&BulkAction::AdvanceStage, ids);
    render_bulk_result(&result);

    service.query_view(&first.id, &FilterSpec::default(), &SortSpec::default())?;
    service.select_all();
    let selected = service.selected_ids().len();
    let result = service.apply_to_selection(&BulkAction::TagMessage {
        tag: "spring-cohort".to_string(),
        message: Some("Thanks for applying, we will be in touch this week.".to_string()),
    });
    println!("\nTagged the remaining {selected} applicants");
    render_bulk_result(&result);

    Ok(())
}

fn render_import_summary(summary: &ImportSummary) {
    println!("  Imported {} candidate(s)", summary.imported.len());
    if summary.rejected.is_empty() {
        return;
    }
    println!("  Rejected rows:");
    for (row, reason) in &summary.rejected {
        println!("    - row {row}: {reason}");
    }
}

fn render_metrics(metrics: &PipelineMetrics, stages: &[StageSummary]) {
    println!("\nPipeline metrics");
    println!("- {} active candidates", metrics.total_candidates);
    println!("- {:.2} average days per stage", metrics.avg_days_per_stage);
    println!("- {:.2}% drop-off from first to last stage", metrics.drop_off_rate);
    println!(
        "- Bottleneck: {}",
        metrics
            .bottleneck_stage_id
            .as_ref()
            .map(StageId::as_str)
            .unwrap_or("none")
    );
    println!(
        "- {} active interviews | {} awaiting feedback",
        metrics.active_interviews, metrics.pending_feedback
    );

    println!("\nStage breakdown");
    for stage in stages {
        println!(
            "  - {:<14} [{}] {} candidate(s) | {} overdue | {} awaiting feedback | {:.2} avg days",
            stage.stage_label,
            stage.status_label,
            stage.candidate_count,
            stage.overdue_count,
            stage.pending_feedback,
            stage.avg_days_in_stage
        );
    }
}

fn render_view(view: &[Candidate]) {
    if view.is_empty() {
        println!("    (no candidates match)");
        return;
    }
    for candidate in view {
        let score = candidate
            .score
            .map(|score| score.to_string())
            .unwrap_or_else(|| "--".to_string());
        let mut flags = Vec::new();
        if candidate.is_overdue {
            flags.push("overdue");
        }
        if candidate.needs_feedback {
            flags.push("feedback");
        }
        println!(
            "    - {} | {} | {} priority | score {} | {:.1}d in stage{}",
            candidate.name,
            candidate.position,
            candidate.priority.label(),
            score,
            candidate.time_in_stage_days(),
            if flags.is_empty() {
                String::new()
            } else {
                format!(" | {}", flags.join(", "))
            }
        );
    }
}

fn render_bulk_result(result: &BulkResult) {
    println!(
        "  {} succeeded | {} failed{}",
        result.succeeded.len(),
        result.failed.len(),
        if result.is_partial_failure() {
            " (partial failure)"
        } else {
            ""
        }
    );
    for (id, failure) in &result.failed {
        println!("    - {id}: {} ({})", failure.kind.label(), failure.detail);
    }
}

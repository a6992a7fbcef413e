use std::sync::Arc;

use chrono::{TimeZone, Utc};
use hiring_pipeline::workflows::ats::{AtsFeedImporter, AtsRowError};
use hiring_pipeline::workflows::pipeline::{
    CandidateId, FilterSpec, FixedClock, NotificationSink, NotifyError, PipelineNotification,
    PipelineService, SortSpec, StageCatalog, StageId, StageRegistry, StatusFilter,
};

struct Discard;

impl NotificationSink for Discard {
    fn publish(&self, _notification: PipelineNotification) -> Result<(), NotifyError> {
        Ok(())
    }
}

fn sample_path(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(name)
}

fn service() -> PipelineService<Discard, FixedClock> {
    let registry = StageRegistry::standard().expect("standard catalog");
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap());
    PipelineService::new(Arc::new(registry), Arc::new(Discard), Arc::new(clock))
}

#[test]
fn sample_feed_imports_valid_rows_and_reports_the_rest() {
    let feed = AtsFeedImporter::from_path(sample_path("ats_feed_sample.csv")).expect("feed reads");
    assert_eq!(feed.len(), 11);
    assert_eq!(
        feed.row_errors(),
        vec![
            (10, &AtsRowError::InvalidPriority("Urgent".to_string())),
            (11, &AtsRowError::InvalidScore("140".to_string())),
        ]
    );

    let service = service();
    let summary = feed.import_into(&service);

    assert_eq!(summary.imported.len(), 8);
    assert_eq!(
        summary.rejected.keys().copied().collect::<Vec<_>>(),
        vec![9, 10, 11]
    );
    assert!(summary.rejected[&9].contains("onsite"));
    assert!(summary.rejected[&11].contains("140"));

    let screen = service
        .get(&CandidateId::new("ats-1004"))
        .expect("imported");
    assert_eq!(screen.stage_id, StageId::new("phone_screen"));
    assert!(screen.needs_feedback);
}

#[test]
fn imported_feed_drives_metrics_and_views() {
    let service = service();
    AtsFeedImporter::from_path(sample_path("ats_feed_sample.csv"))
        .expect("feed reads")
        .import_into(&service);

    let metrics = service.metrics();
    assert_eq!(metrics.total_candidates, 8);
    assert_eq!(metrics.drop_off_rate, 50.0);
    assert_eq!(metrics.pending_feedback, 2);
    assert_eq!(metrics.active_interviews, 1);
    assert_eq!(metrics.bottleneck_stage_id, Some(StageId::new("interview")));

    let overdue = service
        .query_view(
            &StageId::new("interview"),
            &FilterSpec {
                search_text: String::new(),
                status: StatusFilter::Overdue,
            },
            &SortSpec::default(),
        )
        .expect("stage exists");
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].name, "Edsger Dijkstra");
}

#[test]
fn reimporting_a_row_replaces_the_candidate() {
    let service = service();
    let first = "Candidate ID,Name,Position,Stage,Entered Stage At,Priority,Score,Tags,Has Notes,Needs Feedback,Next Action\n\
ats-1,Ada Lovelace,Backend Engineer,Applied,2025-03-01,Low,,,no,no,\n";
    let second = "Candidate ID,Name,Position,Stage,Entered Stage At,Priority,Score,Tags,Has Notes,Needs Feedback,Next Action\n\
ats-1,Ada Lovelace,Backend Engineer,Qualified,2025-03-02,High,90,,no,no,\n";

    for csv in [first, second] {
        AtsFeedImporter::from_reader(csv.as_bytes())
            .expect("feed reads")
            .import_into(&service);
    }

    let candidate = service.get(&CandidateId::new("ats-1")).expect("imported");
    assert_eq!(candidate.stage_id, StageId::new("qualified"));
    assert_eq!(candidate.score, Some(90));
    assert_eq!(service.store().len(), 1);
    assert!(service.store().is_consistent());
}

#[test]
fn sample_catalog_loads_from_disk() {
    let registry = StageCatalog::from_path(sample_path("stage_catalog.sample.json"))
        .expect("catalog parses")
        .into_registry()
        .expect("catalog is valid");

    assert_eq!(registry.len(), 4);
    assert_eq!(
        registry.interview_stage().map(|stage| stage.id.clone()),
        Some(StageId::new("onsite"))
    );
    assert_eq!(
        registry.next(&StageId::new("screen")).map(|stage| stage.id.as_str()),
        Some("onsite")
    );
}

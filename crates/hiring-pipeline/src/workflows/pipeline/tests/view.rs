use super::common::*;
use crate::workflows::pipeline::domain::{Candidate, CandidateId, Priority, StageId};
use crate::workflows::pipeline::view::{
    apply, FilterSpec, SortDirection, SortKey, SortSpec, StatusFilter,
};

const KEYS: [SortKey; 4] = [
    SortKey::Name,
    SortKey::Priority,
    SortKey::TimeInStage,
    SortKey::Score,
];
const DIRECTIONS: [SortDirection; 2] = [SortDirection::Ascending, SortDirection::Descending];

fn roster() -> Vec<Candidate> {
    let mut ada = aged(candidate("c-1", "Ada", "applied"), 4);
    ada.priority = Priority::High;
    ada.score = Some(72);
    ada.position = "Platform Engineer".to_string();
    ada.is_overdue = true;

    let mut bo = aged(candidate("c-2", "Bo", "applied"), 1);
    bo.priority = Priority::Low;
    bo.needs_feedback = true;

    let mut cy = aged(candidate("c-3", "Cy", "applied"), 4);
    cy.priority = Priority::High;
    cy.score = Some(0);

    let mut di = aged(candidate("c-4", "Di", "applied"), 2);
    di.score = Some(95);
    di.position = "Data Analyst".to_string();

    vec![di, cy, bo, ada]
}

#[test]
fn apply_is_idempotent_for_every_ordering() {
    let roster = roster();
    let filters = [
        FilterSpec::default(),
        FilterSpec {
            search_text: "engineer".to_string(),
            status: StatusFilter::All,
        },
        FilterSpec {
            search_text: String::new(),
            status: StatusFilter::HighPriority,
        },
    ];

    for filter in &filters {
        for key in KEYS {
            for direction in DIRECTIONS {
                let sort = SortSpec::new(key, direction);
                let once = apply(&roster, filter, &sort);
                let twice = apply(&once, filter, &sort);
                assert_eq!(once, twice, "{key:?} {direction:?}");
            }
        }
    }
}

#[test]
fn apply_does_not_mutate_its_input() {
    let roster = roster();
    let before = roster.clone();
    let _ = apply(
        &roster,
        &FilterSpec::default(),
        &SortSpec::new(SortKey::Score, SortDirection::Descending),
    );
    assert_eq!(roster, before);
}

#[test]
fn equal_primary_keys_fall_back_to_name_ascending() {
    let roster = roster();
    for direction in DIRECTIONS {
        let view = apply(
            &roster,
            &FilterSpec::default(),
            &SortSpec::new(SortKey::TimeInStage, direction),
        );
        let ada = view.iter().position(|c| c.name == "Ada").expect("ada");
        let cy = view.iter().position(|c| c.name == "Cy").expect("cy");
        assert!(ada < cy, "{direction:?} kept name order for equal time");
    }
}

#[test]
fn priority_sorts_by_weight() {
    let view = apply(
        &roster(),
        &FilterSpec::default(),
        &SortSpec::new(SortKey::Priority, SortDirection::Ascending),
    );
    assert_eq!(ids(&view), vec!["c-2", "c-4", "c-1", "c-3"]);

    let view = apply(
        &roster(),
        &FilterSpec::default(),
        &SortSpec::new(SortKey::Priority, SortDirection::Descending),
    );
    assert_eq!(ids(&view), vec!["c-1", "c-3", "c-4", "c-2"]);
}

#[test]
fn missing_score_compares_as_zero() {
    let view = apply(
        &roster(),
        &FilterSpec::default(),
        &SortSpec::new(SortKey::Score, SortDirection::Ascending),
    );
    // Bo has no score and Cy scored 0: tied, so name decides.
    assert_eq!(ids(&view), vec!["c-2", "c-3", "c-1", "c-4"]);
}

#[test]
fn search_matches_name_or_position_case_insensitively() {
    let roster = roster();
    let sort = SortSpec::default();

    let by_position = FilterSpec {
        search_text: "ENGINEER".to_string(),
        status: StatusFilter::All,
    };
    assert_eq!(
        ids(&apply(&roster, &by_position, &sort)),
        vec!["c-1", "c-2", "c-3"]
    );

    let by_name = FilterSpec {
        search_text: "di".to_string(),
        status: StatusFilter::All,
    };
    assert_eq!(ids(&apply(&roster, &by_name, &sort)), vec!["c-4"]);
}

#[test]
fn status_filters_compose_with_search() {
    let roster = roster();
    let sort = SortSpec::default();
    let only = |status: StatusFilter, search: &str| {
        let filter = FilterSpec {
            search_text: search.to_string(),
            status,
        };
        apply(&roster, &filter, &sort)
            .into_iter()
            .map(|candidate| candidate.id.0)
            .collect::<Vec<_>>()
    };

    assert_eq!(only(StatusFilter::Overdue, ""), vec!["c-1"]);
    assert_eq!(only(StatusFilter::HighPriority, ""), vec!["c-1", "c-3"]);
    assert_eq!(only(StatusFilter::NeedsFeedback, ""), vec!["c-2"]);
    assert_eq!(only(StatusFilter::HighPriority, "platform"), vec!["c-1"]);
    assert!(only(StatusFilter::NeedsFeedback, "analyst").is_empty());
}

#[test]
fn query_view_scopes_the_selection() {
    let (service, _, _) = build_service();
    seed(&service, "c-1", "Ada", "applied");
    seed(&service, "c-2", "Bo", "applied");
    seed(&service, "c-3", "Cy", "qualified");

    let applied = StageId::new("applied");
    let view = service
        .query_view(&applied, &FilterSpec::default(), &SortSpec::default())
        .expect("stage exists");
    assert_eq!(ids(&view), vec!["c-1", "c-2"]);

    assert!(service.toggle_selection(&CandidateId::new("c-1")));
    assert!(
        !service.toggle_selection(&CandidateId::new("c-3")),
        "not on screen"
    );
    assert_eq!(service.selected_ids(), vec![CandidateId::new("c-1")]);

    let narrowed = FilterSpec {
        search_text: "bo".to_string(),
        status: StatusFilter::All,
    };
    service
        .query_view(&applied, &narrowed, &SortSpec::default())
        .expect("stage exists");
    assert!(service.selected_ids().is_empty(), "hidden ids are pruned");

    service
        .query_view(&applied, &FilterSpec::default(), &SortSpec::default())
        .expect("stage exists");
    service.select_all();
    assert_eq!(service.selected_ids().len(), 2);

    service
        .query_view(
            &StageId::new("qualified"),
            &FilterSpec::default(),
            &SortSpec::default(),
        )
        .expect("stage exists");
    assert!(service.selected_ids().is_empty(), "stage switch clears");
}

#[test]
fn query_view_rejects_unknown_stage() {
    let (service, _, _) = build_service();
    let err = service
        .query_view(
            &StageId::new("offer"),
            &FilterSpec::default(),
            &SortSpec::default(),
        )
        .expect_err("not in the scenario catalog");
    assert_eq!(
        err.kind(),
        crate::workflows::pipeline::domain::ErrorKind::NotFound
    );
}

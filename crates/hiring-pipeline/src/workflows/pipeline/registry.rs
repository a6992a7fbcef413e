use std::collections::HashMap;

use super::catalog::{CatalogError, StageCatalog};
use super::domain::{Stage, StageId};

/// Ordered, read-only stage catalog.
#[derive(Debug, Clone)]
pub struct StageRegistry {
    stages: Vec<Stage>,
    positions: HashMap<StageId, usize>,
}

impl StageRegistry {
    /// Validate and index a catalog. Orders must be unique and contiguous, ids
    /// unique, and at most one stage may carry the interview flag.
    pub fn new(mut stages: Vec<Stage>) -> Result<Self, CatalogError> {
        if stages.is_empty() {
            return Err(CatalogError::Empty);
        }

        stages.sort_by_key(|stage| stage.order);

        let mut positions = HashMap::with_capacity(stages.len());
        let mut interview: Option<&StageId> = None;
        let first_order = stages[0].order;

        for (index, stage) in stages.iter().enumerate() {
            if stage.id.as_str().trim().is_empty() {
                return Err(CatalogError::BlankId);
            }
            if stage.name.trim().is_empty() {
                return Err(CatalogError::BlankName(stage.id.clone()));
            }
            if index > 0 && stages[index - 1].order == stage.order {
                return Err(CatalogError::DuplicateOrder(stage.order));
            }
            let expected = first_order + index as u32;
            if stage.order != expected {
                return Err(CatalogError::NonContiguousOrder {
                    expected,
                    found: stage.order,
                });
            }
            if positions.insert(stage.id.clone(), index).is_some() {
                return Err(CatalogError::DuplicateId(stage.id.clone()));
            }
            if stage.interview {
                if let Some(existing) = interview {
                    return Err(CatalogError::MultipleInterviewStages(
                        existing.clone(),
                        stage.id.clone(),
                    ));
                }
                interview = Some(&stage.id);
            }
        }

        Ok(Self { stages, positions })
    }

    pub fn standard() -> Result<Self, CatalogError> {
        StageCatalog::standard().into_registry()
    }

    pub fn get(&self, id: &StageId) -> Option<&Stage> {
        self.position(id).map(|index| &self.stages[index])
    }

    pub fn contains(&self, id: &StageId) -> bool {
        self.positions.contains_key(id)
    }

    /// Zero-based rank of the stage within the catalog.
    pub fn position(&self, id: &StageId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn ordered(&self) -> &[Stage] {
        &self.stages
    }

    pub fn next(&self, id: &StageId) -> Option<&Stage> {
        self.position(id)
            .and_then(|index| self.stages.get(index + 1))
    }

    pub fn previous(&self, id: &StageId) -> Option<&Stage> {
        self.position(id)
            .and_then(|index| index.checked_sub(1))
            .map(|index| &self.stages[index])
    }

    pub fn first(&self) -> Option<&Stage> {
        self.stages.first()
    }

    pub fn last(&self) -> Option<&Stage> {
        self.stages.last()
    }

    pub fn interview_stage(&self) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.interview)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::pipeline::domain::StageStatus;

    fn stage(id: &str, order: u32) -> Stage {
        Stage {
            id: StageId::new(id),
            order,
            name: id.to_uppercase(),
            status: StageStatus::Healthy,
            avg_time_target_days: 3,
            requires_feedback: false,
            ai_supported: false,
            interview: false,
        }
    }

    #[test]
    fn orders_stages_and_walks_neighbours() {
        let registry = StageRegistry::new(vec![stage("offer", 2), stage("applied", 0), stage("screen", 1)])
            .expect("valid catalog");

        let ids: Vec<&str> = registry.ordered().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["applied", "screen", "offer"]);

        let applied = StageId::new("applied");
        let offer = StageId::new("offer");
        assert_eq!(registry.next(&applied).map(|s| s.id.as_str()), Some("screen"));
        assert!(registry.previous(&applied).is_none());
        assert!(registry.next(&offer).is_none());
        assert_eq!(registry.previous(&offer).map(|s| s.id.as_str()), Some("screen"));
        assert!(registry.get(&StageId::new("missing")).is_none());
    }

    #[test]
    fn rejects_gaps_in_order() {
        let err = StageRegistry::new(vec![stage("applied", 0), stage("offer", 2)])
            .expect_err("gap rejected");
        assert!(matches!(
            err,
            CatalogError::NonContiguousOrder {
                expected: 1,
                found: 2
            }
        ));
    }

    #[test]
    fn rejects_duplicate_orders_and_ids() {
        let err = StageRegistry::new(vec![stage("applied", 0), stage("screen", 0)])
            .expect_err("duplicate order");
        assert!(matches!(err, CatalogError::DuplicateOrder(0)));

        let err = StageRegistry::new(vec![stage("applied", 0), stage("applied", 1)])
            .expect_err("duplicate id");
        assert!(matches!(err, CatalogError::DuplicateId(_)));
    }

    #[test]
    fn rejects_second_interview_stage() {
        let mut first = stage("interview", 0);
        first.interview = true;
        let mut second = stage("onsite", 1);
        second.interview = true;
        let err = StageRegistry::new(vec![first, second]).expect_err("two interview stages");
        assert!(matches!(err, CatalogError::MultipleInterviewStages(_, _)));
    }

    #[test]
    fn rejects_empty_catalog() {
        assert!(matches!(StageRegistry::new(Vec::new()), Err(CatalogError::Empty)));
    }
}

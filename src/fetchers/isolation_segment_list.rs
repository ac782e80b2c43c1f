//! Isolation segment listing
//!
//! Turns a validated [`IsolationSegmentsListMessage`] into a [`Dataset`].
//! Nothing is read from the database here; callers materialize the result.

use crate::fetchers::dataset::{Dataset, OrganizationGuidQuery};
use crate::fetchers::label_selector::LabelSelectorQuery;
use crate::messages::IsolationSegmentsListMessage;
use tracing::instrument;

pub struct IsolationSegmentListFetcher;

impl IsolationSegmentListFetcher {
    /// Every isolation segment matching the message's filters
    #[instrument(skip_all, name = "fetch_isolation_segments")]
    pub fn fetch_all(message: &IsolationSegmentsListMessage) -> Dataset {
        Self::filter(message, Dataset::isolation_segments())
    }

    /// Segments entitled to an organization selected by `org_guids_query`,
    /// then narrowed by the message's filters
    #[instrument(skip_all, name = "fetch_isolation_segments_for_organizations")]
    pub fn fetch_for_organizations(
        message: &IsolationSegmentsListMessage,
        org_guids_query: OrganizationGuidQuery,
    ) -> Dataset {
        let dataset = Dataset::isolation_segments().where_organizations_in(org_guids_query);
        Self::filter(message, dataset)
    }

    fn filter(message: &IsolationSegmentsListMessage, mut dataset: Dataset) -> Dataset {
        if let Some(guids) = message.guids() {
            dataset = dataset.where_guids(guids.iter().map(String::as_str));
        }

        if let Some(names) = message.names() {
            dataset = dataset.where_names_caseless(names);
        }

        if let Some(org_guids) = message.organization_guids() {
            dataset = dataset.where_organization_guids(org_guids.iter().map(String::as_str));
        }

        if let Some(selector) = message.label_selector() {
            dataset = LabelSelectorQuery::add_selector_queries(dataset, selector.requirements());
        }

        tracing::debug!(predicates = dataset.predicate_count(), "Built isolation segment dataset");
        dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    fn message(params: serde_json::Value) -> IsolationSegmentsListMessage {
        IsolationSegmentsListMessage::from_params(&params).unwrap()
    }

    #[test]
    fn test_no_filters_is_the_base_dataset() {
        let dataset = IsolationSegmentListFetcher::fetch_all(&message(json!({})));
        assert_eq!(dataset, Dataset::isolation_segments());
    }

    #[test]
    fn test_each_filter_adds_one_predicate() {
        let dataset = IsolationSegmentListFetcher::fetch_all(&message(json!({
            "guids": ["g1"],
            "names": ["Frank"],
            "organization_guids": ["o1"],
            "label_selector": "env=prod,tier",
        })));
        assert_eq!(dataset.predicate_count(), 5);
    }

    #[test]
    fn test_scope_comes_before_filters() {
        let dataset = IsolationSegmentListFetcher::fetch_for_organizations(
            &message(json!({ "names": ["frank"] })),
            OrganizationGuidQuery::all().where_ids([-1]),
        );
        let sql = dataset.to_sql();
        let scope = sql.find("organizations.id IN").unwrap();
        let names = sql.find("LOWER(isolation_segments.name)").unwrap();
        assert!(scope < names, "{sql}");
    }

    #[test]
    fn test_building_does_not_depend_on_filter_order() {
        let a = message(json!({ "guids": "g1,g2", "names": ["n"] }));
        let b = message(json!({ "names": "n", "guids": ["g1", "g2"] }));
        assert_eq!(
            IsolationSegmentListFetcher::fetch_all(&a),
            IsolationSegmentListFetcher::fetch_all(&b)
        );
    }

    #[test]
    #[traced_test]
    fn test_logs_predicate_count() {
        IsolationSegmentListFetcher::fetch_all(&message(json!({ "names": "a" })));
        assert!(logs_contain("Built isolation segment dataset"));
        assert!(logs_contain("predicates=1"));
    }
}

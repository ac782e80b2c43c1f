//! Label selector predicates.
//!
//! Each requirement becomes a `guid [NOT] IN (SELECT resource_guid FROM <labels> ...)`
//! predicate, so a resource qualifies by the presence or absence of a
//! matching label row. The label table and resource column are parameters;
//! nothing here is specific to isolation segments.

use crate::domain::{LabelOperator, LabelRequirement};
use crate::fetchers::dataset::{push_in_list, Dataset};
use sqlx::{QueryBuilder, Sqlite};

pub struct LabelSelectorQuery;

impl LabelSelectorQuery {
    /// Attach one predicate per requirement to `dataset`
    pub fn add_selector_queries(dataset: Dataset, requirements: &[LabelRequirement]) -> Dataset {
        requirements.iter().cloned().fold(dataset, Dataset::where_label)
    }

    pub(crate) fn push_requirement<'args>(
        qb: &mut QueryBuilder<'args, Sqlite>,
        resource_column: &str,
        label_table: &str,
        requirement: &LabelRequirement,
    ) {
        qb.push(resource_column);
        qb.push(if requirement.operator.is_inclusive() { " IN " } else { " NOT IN " });
        qb.push(format!("(SELECT resource_guid FROM {} WHERE key_prefix IS ", label_table));
        qb.push_bind(requirement.key.prefix.clone());
        qb.push(" AND key_name = ");
        qb.push_bind(requirement.key.name.clone());

        match requirement.operator {
            LabelOperator::Equal
            | LabelOperator::NotEqual
            | LabelOperator::In
            | LabelOperator::NotIn => {
                qb.push(" AND ");
                push_in_list(qb, "value", &requirement.values);
            }
            LabelOperator::Exists | LabelOperator::NotExists => {}
        }

        qb.push(")");
    }
}

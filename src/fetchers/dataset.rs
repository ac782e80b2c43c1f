//! Deferred, composable queries over isolation segments.
//!
//! A [`Dataset`] is a list of conjunctive predicates plus ordering and an
//! optional page window. Combinators consume and return the dataset without
//! touching the database; rows are only read when a materializer
//! (`all`, `count`, `first`, `guids`) is awaited with a pool.

use crate::domain::{IsolationSegment, IsolationSegmentGuid, LabelRequirement, OrganizationGuid};
use crate::errors::{IsosegError, Result};
use crate::fetchers::label_selector::LabelSelectorQuery;
use crate::messages::pagination::{OrderBy, OrderDirection, PaginationOptions};
use crate::storage::DbPool;
use sqlx::{Encode, QueryBuilder, Sqlite, Type};
use tracing::instrument;

const SEGMENTS_TABLE: &str = "isolation_segments";
const SEGMENT_LABELS_TABLE: &str = "isolation_segment_labels";
const SEGMENT_COLUMNS: &str = "isolation_segments.id AS id, \
     isolation_segments.guid AS guid, \
     isolation_segments.name AS name, \
     isolation_segments.created_at AS created_at, \
     isolation_segments.updated_at AS updated_at";

/// Push `column IN (?, ?, ...)`; an empty set renders a predicate that matches nothing
pub(crate) fn push_in_list<'args, T>(
    qb: &mut QueryBuilder<'args, Sqlite>,
    column: &str,
    values: &[T],
) where
    T: Clone + Encode<'args, Sqlite> + Type<Sqlite> + 'args,
{
    if values.is_empty() {
        qb.push("1 = 0");
        return;
    }

    qb.push(column);
    qb.push(" IN (");
    let mut list = qb.separated(", ");
    for value in values {
        list.push_bind(value.clone());
    }
    list.push_unseparated(")");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum OrganizationCondition {
    Ids(Vec<i64>),
    Guids(Vec<OrganizationGuid>),
    Names(Vec<String>),
}

/// Deferred `SELECT guid FROM organizations WHERE ...`.
///
/// Used to scope a segment listing to a caller-visible set of organizations
/// without reading that set into memory first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrganizationGuidQuery {
    conditions: Vec<OrganizationCondition>,
}

impl OrganizationGuidQuery {
    /// Every organization
    pub fn all() -> Self {
        Self::default()
    }

    pub fn where_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.conditions.push(OrganizationCondition::Ids(ids.into_iter().collect()));
        self
    }

    pub fn where_guids(mut self, guids: impl IntoIterator<Item = OrganizationGuid>) -> Self {
        self.conditions.push(OrganizationCondition::Guids(guids.into_iter().collect()));
        self
    }

    pub fn where_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.conditions.push(OrganizationCondition::Names(names.into_iter().map(Into::into).collect()));
        self
    }

    pub(crate) fn push_sql<'args>(&self, qb: &mut QueryBuilder<'args, Sqlite>) {
        qb.push("SELECT organizations.guid FROM organizations");
        for (idx, condition) in self.conditions.iter().enumerate() {
            qb.push(if idx == 0 { " WHERE " } else { " AND " });
            match condition {
                OrganizationCondition::Ids(ids) => push_in_list(qb, "organizations.id", ids),
                OrganizationCondition::Guids(guids) => {
                    push_in_list(qb, "organizations.guid", guids)
                }
                OrganizationCondition::Names(names) => {
                    push_in_list(qb, "organizations.name", names)
                }
            }
        }
    }

    /// Read the organization guids this query selects
    #[instrument(skip(self, pool), name = "db_fetch_organization_guids")]
    pub async fn fetch_guids(&self, pool: &DbPool) -> Result<Vec<OrganizationGuid>> {
        let mut qb = QueryBuilder::new("");
        self.push_sql(&mut qb);
        qb.push(" ORDER BY organizations.guid");
        qb.build_query_scalar::<OrganizationGuid>()
            .fetch_all(pool)
            .await
            .map_err(|e| IsosegError::database(e, "Failed to fetch organization guids"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    GuidIn(Vec<IsolationSegmentGuid>),
    /// Values are stored case-folded
    NameInCaseless(Vec<String>),
    OrganizationGuidIn(Vec<OrganizationGuid>),
    OrganizationsIn(OrganizationGuidQuery),
    Label(LabelRequirement),
}

impl Predicate {
    fn push_sql<'args>(&self, qb: &mut QueryBuilder<'args, Sqlite>) {
        match self {
            Predicate::GuidIn(guids) => push_in_list(qb, "isolation_segments.guid", guids),
            Predicate::NameInCaseless(names) => {
                push_in_list(qb, "LOWER(isolation_segments.name)", names)
            }
            Predicate::OrganizationGuidIn(org_guids) => {
                qb.push(
                    "isolation_segments.guid IN (SELECT isolation_segment_guid \
                     FROM organizations_isolation_segments WHERE ",
                );
                push_in_list(qb, "organization_guid", org_guids);
                qb.push(")");
            }
            Predicate::OrganizationsIn(query) => {
                qb.push(
                    "isolation_segments.guid IN (SELECT isolation_segment_guid \
                     FROM organizations_isolation_segments WHERE organization_guid IN (",
                );
                query.push_sql(qb);
                qb.push("))");
            }
            Predicate::Label(requirement) => LabelSelectorQuery::push_requirement(
                qb,
                "isolation_segments.guid",
                SEGMENT_LABELS_TABLE,
                requirement,
            ),
        }
    }
}

/// ASCII case fold shared by the name predicate and `LOWER()` on the column
pub(crate) fn fold_name(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Lazy handle over isolation segment rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    predicates: Vec<Predicate>,
    order_by: OrderBy,
    direction: OrderDirection,
    window: Option<(i64, i64)>,
}

impl Dataset {
    /// All isolation segments, the shared one included
    pub fn isolation_segments() -> Self {
        Self {
            predicates: Vec::new(),
            order_by: OrderBy::default(),
            direction: OrderDirection::default(),
            window: None,
        }
    }

    pub fn where_guids<G: Into<IsolationSegmentGuid>>(
        mut self,
        guids: impl IntoIterator<Item = G>,
    ) -> Self {
        self.predicates.push(Predicate::GuidIn(guids.into_iter().map(Into::into).collect()));
        self
    }

    /// Match names ignoring ASCII case
    pub fn where_names_caseless<S: AsRef<str>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        let folded = names.into_iter().map(|n| fold_name(n.as_ref())).collect();
        self.predicates.push(Predicate::NameInCaseless(folded));
        self
    }

    /// Segments entitled to any organization in `org_guids`
    pub fn where_organization_guids<G: Into<OrganizationGuid>>(
        mut self,
        org_guids: impl IntoIterator<Item = G>,
    ) -> Self {
        self.predicates
            .push(Predicate::OrganizationGuidIn(org_guids.into_iter().map(Into::into).collect()));
        self
    }

    /// Segments entitled to any organization the query selects
    pub fn where_organizations_in(mut self, query: OrganizationGuidQuery) -> Self {
        self.predicates.push(Predicate::OrganizationsIn(query));
        self
    }

    pub fn where_label(mut self, requirement: LabelRequirement) -> Self {
        self.predicates.push(Predicate::Label(requirement));
        self
    }

    pub fn order_by(mut self, order_by: OrderBy, direction: OrderDirection) -> Self {
        self.order_by = order_by;
        self.direction = direction;
        self
    }

    /// Apply ordering and the page window from `options`
    pub fn paginate(self, options: &PaginationOptions) -> Self {
        let mut dataset = self.order_by(options.ordering.order_by, options.ordering.direction);
        dataset.window = Some((options.limit(), options.offset()));
        dataset
    }

    /// Number of predicates attached so far
    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }

    fn push_where<'args>(&self, qb: &mut QueryBuilder<'args, Sqlite>) {
        for (idx, predicate) in self.predicates.iter().enumerate() {
            qb.push(if idx == 0 { " WHERE (" } else { " AND (" });
            predicate.push_sql(qb);
            qb.push(")");
        }
    }

    fn push_order<'args>(&self, qb: &mut QueryBuilder<'args, Sqlite>) {
        qb.push(format!(
            " ORDER BY {table}.{column} {dir}",
            table = SEGMENTS_TABLE,
            column = self.order_by.column(),
            dir = self.direction.keyword()
        ));
        if self.order_by != OrderBy::Id {
            qb.push(format!(", {}.id {}", SEGMENTS_TABLE, self.direction.keyword()));
        }
    }

    fn select_builder<'args>(&self, columns: &str) -> QueryBuilder<'args, Sqlite> {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM {}", columns, SEGMENTS_TABLE));
        self.push_where(&mut qb);
        self.push_order(&mut qb);
        if let Some((limit, offset)) = self.window {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
            qb.push(" OFFSET ");
            qb.push_bind(offset);
        }
        qb
    }

    /// Render the row-selecting statement, for logging and inspection
    pub fn to_sql(&self) -> String {
        self.select_builder(SEGMENT_COLUMNS).sql().to_string()
    }

    /// Execute and collect every matching row
    #[instrument(skip(self, pool), fields(predicates = self.predicates.len()), name = "db_list_isolation_segments")]
    pub async fn all(&self, pool: &DbPool) -> Result<Vec<IsolationSegment>> {
        let mut qb = self.select_builder(SEGMENT_COLUMNS);
        tracing::debug!(sql = %qb.sql(), "Executing isolation segment listing");
        qb.build_query_as::<IsolationSegment>()
            .fetch_all(pool)
            .await
            .map_err(|e| IsosegError::database(e, "Failed to list isolation segments"))
    }

    /// First matching row under the current ordering
    #[instrument(skip(self, pool), name = "db_first_isolation_segment")]
    pub async fn first(&self, pool: &DbPool) -> Result<Option<IsolationSegment>> {
        let mut dataset = self.clone();
        let offset = dataset.window.map_or(0, |(_, offset)| offset);
        dataset.window = Some((1, offset));

        let mut qb = dataset.select_builder(SEGMENT_COLUMNS);
        qb.build_query_as::<IsolationSegment>()
            .fetch_optional(pool)
            .await
            .map_err(|e| IsosegError::database(e, "Failed to fetch isolation segment"))
    }

    /// Count matching rows, ignoring the page window
    #[instrument(skip(self, pool), name = "db_count_isolation_segments")]
    pub async fn count(&self, pool: &DbPool) -> Result<i64> {
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", SEGMENTS_TABLE));
        self.push_where(&mut qb);
        qb.build_query_scalar::<i64>()
            .fetch_one(pool)
            .await
            .map_err(|e| IsosegError::database(e, "Failed to count isolation segments"))
    }

    /// Only the guids of matching rows
    #[instrument(skip(self, pool), name = "db_list_isolation_segment_guids")]
    pub async fn guids(&self, pool: &DbPool) -> Result<Vec<IsolationSegmentGuid>> {
        let mut qb = self.select_builder("isolation_segments.guid AS guid");
        qb.build_query_scalar::<IsolationSegmentGuid>()
            .fetch_all(pool)
            .await
            .map_err(|e| IsosegError::database(e, "Failed to list isolation segment guids"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LabelKey, SHARED_ISOLATION_SEGMENT_GUID};
    use crate::messages::pagination::Ordering;
    use crate::storage::test_helpers::TestDatabase;

    #[test]
    fn test_base_sql_has_no_where_clause() {
        let sql = Dataset::isolation_segments().to_sql();
        assert!(sql.starts_with("SELECT isolation_segments.id AS id"));
        assert!(!sql.contains("WHERE"));
        assert!(sql.ends_with("ORDER BY isolation_segments.id ASC"));
    }

    #[test]
    fn test_predicates_are_conjunctive() {
        let sql = Dataset::isolation_segments()
            .where_guids(["a", "b"])
            .where_names_caseless(["Frank"])
            .to_sql();
        assert!(sql.contains("WHERE (isolation_segments.guid IN (?, ?))"), "{sql}");
        assert!(sql.contains("AND (LOWER(isolation_segments.name) IN (?))"), "{sql}");
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let sql = Dataset::isolation_segments().where_guids(Vec::<String>::new()).to_sql();
        assert!(sql.contains("WHERE (1 = 0)"), "{sql}");
    }

    #[test]
    fn test_organization_query_is_embedded_as_subquery() {
        let sql = Dataset::isolation_segments()
            .where_organizations_in(OrganizationGuidQuery::all().where_ids([1, 2]))
            .to_sql();
        assert!(
            sql.contains(
                "organization_guid IN (SELECT organizations.guid FROM organizations WHERE organizations.id IN (?, ?))"
            ),
            "{sql}"
        );
    }

    #[test]
    fn test_building_is_pure() {
        let build = || {
            Dataset::isolation_segments()
                .where_names_caseless(["A"])
                .where_label(LabelRequirement::exists(LabelKey::parse("env").unwrap()))
        };
        assert_eq!(build(), build());
        assert_eq!(build().to_sql(), build().to_sql());
        assert_eq!(build().predicate_count(), 2);
    }

    #[tokio::test]
    async fn test_materializers() {
        let db = TestDatabase::new("dataset_materializers").await;
        let alpha = db.segment("alpha").await;
        let beta = db.segment("Beta").await;

        let all = Dataset::isolation_segments();
        assert_eq!(all.count(&db.pool).await.unwrap(), 3);
        assert_eq!(
            all.first(&db.pool).await.unwrap().unwrap().guid.as_str(),
            SHARED_ISOLATION_SEGMENT_GUID
        );

        let by_name = Dataset::isolation_segments().where_names_caseless(["ALPHA", "beta"]);
        let mut guids = by_name.guids(&db.pool).await.unwrap();
        guids.sort();
        let mut expected = vec![alpha.guid.clone(), beta.guid.clone()];
        expected.sort();
        assert_eq!(guids, expected);
    }

    #[tokio::test]
    async fn test_pagination_and_ordering() {
        let db = TestDatabase::new("dataset_pagination").await;
        for name in ["c", "a", "b"] {
            db.segment(name).await;
        }

        let options = PaginationOptions {
            page: 2,
            per_page: 2,
            ordering: "-name".parse::<Ordering>().unwrap(),
        };
        let page = Dataset::isolation_segments().paginate(&options);
        let names: Vec<String> =
            page.all(&db.pool).await.unwrap().into_iter().map(|s| s.name).collect();
        // shared, c, b, a descending; page 2 holds the last two
        assert_eq!(names, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(page.count(&db.pool).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_timestamp_ordering_keeps_seeded_segment_first() {
        let db = TestDatabase::new("dataset_created_at").await;
        db.segment("alpha").await;
        db.segment("beta").await;

        for order_by in [OrderBy::CreatedAt, OrderBy::UpdatedAt] {
            let names: Vec<String> = Dataset::isolation_segments()
                .order_by(order_by, OrderDirection::Asc)
                .all(&db.pool)
                .await
                .unwrap()
                .into_iter()
                .map(|s| s.name)
                .collect();
            assert_eq!(names, vec!["shared", "alpha", "beta"], "{order_by:?}");

            let last = Dataset::isolation_segments()
                .order_by(order_by, OrderDirection::Desc)
                .guids(&db.pool)
                .await
                .unwrap()
                .pop()
                .unwrap();
            assert_eq!(last.as_str(), SHARED_ISOLATION_SEGMENT_GUID);
        }
    }

    #[tokio::test]
    async fn test_fetch_organization_guids() {
        let db = TestDatabase::new("dataset_org_guids").await;
        let org1 = db.org("org1").await;
        let _org2 = db.org("org2").await;

        let guids = OrganizationGuidQuery::all()
            .where_names(["org1"])
            .fetch_guids(&db.pool)
            .await
            .unwrap();
        assert_eq!(guids, vec![org1.guid]);

        let none = OrganizationGuidQuery::all().where_ids([-1]).fetch_guids(&db.pool).await.unwrap();
        assert!(none.is_empty());
    }
}

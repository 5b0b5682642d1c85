use std::cmp::Ordering;

use crate::core::{Entity, Result, Value};

/// A filter over attribute values. Filters combine conjunctively.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub attribute: String,
    pub descending: bool,
}

/// Filter/sort/page description of a read, plus the caller-provided bound
/// for reference resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    filters: Vec<Filter>,
    sort: Vec<Sort>,
    offset: usize,
    limit: Option<usize>,
    fetch_depth: usize,
}

impl Query {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            sort: Vec::new(),
            offset: 0,
            limit: None,
            fetch_depth: 1,
        }
    }

    pub fn eq(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(attribute.into(), value.into()));
        self
    }

    pub fn is_in(mut self, attribute: impl Into<String>, values: Vec<Value>) -> Self {
        self.filters.push(Filter::In(attribute.into(), values));
        self
    }

    pub fn sort_by(mut self, attribute: impl Into<String>) -> Self {
        self.sort.push(Sort {
            attribute: attribute.into(),
            descending: false,
        });
        self
    }

    pub fn sort_desc(mut self, attribute: impl Into<String>) -> Self {
        self.sort.push(Sort {
            attribute: attribute.into(),
            descending: true,
        });
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Bound for recursive xref resolution; 0 disables resolution.
    pub fn fetch_depth(mut self, depth: usize) -> Self {
        self.fetch_depth = depth;
        self
    }

    /// Appends a filter to an existing query (used by the ownership layer).
    pub fn and_eq(&mut self, attribute: impl Into<String>, value: impl Into<Value>) {
        self.filters.push(Filter::Eq(attribute.into(), value.into()));
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn sort(&self) -> &[Sort] {
        &self.sort
    }

    pub fn get_offset(&self) -> usize {
        self.offset
    }

    pub fn get_limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn get_fetch_depth(&self) -> usize {
        self.fetch_depth
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

/// True when the entity satisfies every filter of the query.
///
/// A resolved `Record` value matches against its id is the resolver's
/// concern; backends only ever see scalar values.
pub fn matches(entity: &Entity, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter {
        Filter::Eq(attr, expected) => {
            entity.get(attr).map(|v| v == expected).unwrap_or(expected.is_null())
        }
        Filter::In(attr, options) => entity
            .get(attr)
            .map(|v| options.contains(v))
            .unwrap_or(false),
    })
}

/// Sorts entities in place according to the query's sort orders.
pub fn apply_sort(entities: &mut [Entity], sort: &[Sort]) -> Result<()> {
    if sort.is_empty() {
        return Ok(());
    }
    // Value::compare is fallible on mixed types; resolve comparisons up
    // front so sort_by can stay infallible.
    let mut failure: Option<crate::core::DataError> = None;
    entities.sort_by(|a, b| {
        for order in sort {
            let av = a.get(&order.attribute).cloned().unwrap_or(Value::Null);
            let bv = b.get(&order.attribute).cloned().unwrap_or(Value::Null);
            match av.compare(&bv) {
                Ok(Ordering::Equal) => continue,
                Ok(ordering) => {
                    return if order.descending {
                        ordering.reverse()
                    } else {
                        ordering
                    };
                }
                Err(err) => {
                    if failure.is_none() {
                        failure = Some(err);
                    }
                    return Ordering::Equal;
                }
            }
        }
        Ordering::Equal
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Applies offset and limit.
pub fn apply_page(entities: Vec<Entity>, offset: usize, limit: Option<usize>) -> Vec<Entity> {
    let iter = entities.into_iter().skip(offset);
    match limit {
        Some(limit) => iter.take(limit).collect(),
        None => iter.collect(),
    }
}

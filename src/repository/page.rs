use serde::{Deserialize, Serialize};

pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_PAGE_SIZE: i64 = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Query surface of every `list` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(default)]
    pub include_total: bool,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
            sort_by: None,
            sort_order: SortOrder::Asc,
            include_inactive: false,
            include_total: false,
        }
    }
}

impl ListQuery {
    /// Clamp offset and limit into their allowed ranges.
    pub fn clamped(mut self) -> Self {
        self.offset = self.offset.max(0);
        self.limit = self.limit.clamp(1, MAX_PAGE_SIZE);
        self
    }
}

/// An ordered page of results. `total` is only computed when the query
/// asked for it.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub offset: i64,
    pub limit: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            offset: self.offset,
            limit: self.limit,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamping_bounds_limit_and_offset() {
        let q = ListQuery {
            offset: -5,
            limit: 1000,
            ..Default::default()
        }
        .clamped();
        assert_eq!(q.offset, 0);
        assert_eq!(q.limit, MAX_PAGE_SIZE);

        let q = ListQuery {
            limit: 0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(q.limit, 1);
    }
}

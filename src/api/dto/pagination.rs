use crate::repository::{ListQuery, SortOrder};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Wire form of the list query surface shared by every `list` operation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ListParams {
    #[serde(default)]
    #[validate(range(min = 0))]
    pub offset: i64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
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
    20
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: default_limit(),
            sort_by: None,
            sort_order: SortOrder::Asc,
            include_inactive: false,
            include_total: false,
        }
    }
}

impl From<ListParams> for ListQuery {
    fn from(params: ListParams) -> Self {
        ListQuery {
            offset: params.offset,
            limit: params.limit,
            sort_by: params.sort_by,
            sort_order: params.sort_order,
            include_inactive: params.include_inactive,
            include_total: params.include_total,
        }
    }
}

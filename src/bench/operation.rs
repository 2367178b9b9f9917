use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::BenchError;

/// One named benchmark scenario. The set is closed; short names are used in
/// result file names and on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    #[default]
    Crud,
    CrudScalars,
    CrudIndexed,
    QueryString,
    QueryStringIndexed,
    QueryInteger,
    QueryIntegerIndexed,
    QueryId,
    QueryIdRandom,
}

impl OperationType {
    pub const ALL: [OperationType; 9] = [
        OperationType::Crud,
        OperationType::CrudScalars,
        OperationType::CrudIndexed,
        OperationType::QueryString,
        OperationType::QueryStringIndexed,
        OperationType::QueryInteger,
        OperationType::QueryIntegerIndexed,
        OperationType::QueryId,
        OperationType::QueryIdRandom,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            OperationType::Crud => "Bulk operations (CRUD)",
            OperationType::CrudScalars => "Bulk operations (CRUD) - scalars",
            OperationType::CrudIndexed => "Bulk operations (CRUD) - indexed",
            OperationType::QueryString => "Look up string",
            OperationType::QueryStringIndexed => "Look up string using index",
            OperationType::QueryInteger => "Look up integer",
            OperationType::QueryIntegerIndexed => "Look up integer using index",
            OperationType::QueryId => "Look up by ID",
            OperationType::QueryIdRandom => "Look up by ID (random)",
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            OperationType::Crud => "crud",
            OperationType::CrudScalars => "crud_scalars",
            OperationType::CrudIndexed => "crud_indexed",
            OperationType::QueryString => "query_string",
            OperationType::QueryStringIndexed => "query_string_indexed",
            OperationType::QueryInteger => "query_integer",
            OperationType::QueryIntegerIndexed => "query_integer_indexed",
            OperationType::QueryId => "query_id",
            OperationType::QueryIdRandom => "query_id_random",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for OperationType {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationType::ALL
            .into_iter()
            .find(|op| op.short_name() == s)
            .ok_or_else(|| BenchError::UnknownOperation(s.to_string()))
    }
}

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Three-part name of a storage-engine table.
///
/// Every join the scanner and the recommendation engine perform is an
/// equi-join on this tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableIdentifier {
    pub catalog: String,
    #[serde(rename = "database")]
    pub schema: String,
    #[serde(rename = "tableName")]
    pub table: String,
}

impl TableIdentifier {
    pub fn new(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl Display for TableIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}.{}.{}", self.catalog, self.schema, self.table)
    }
}

/// Error returned when a qualified name does not have exactly three parts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid qualified table name '{0}', expected catalog.schema.table")]
pub struct InvalidTableName(pub String);

impl FromStr for TableIdentifier {
    type Err = InvalidTableName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').map(str::trim).collect();
        match parts.as_slice() {
            [catalog, schema, table]
                if !catalog.is_empty() && !schema.is_empty() && !table.is_empty() =>
            {
                Ok(Self::new(*catalog, *schema, *table))
            }
            _ => Err(InvalidTableName(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualified_name() {
        let id: TableIdentifier = "main.sales.orders".parse().unwrap();
        assert_eq!(id, TableIdentifier::new("main", "sales", "orders"));
        assert_eq!(id.to_string(), "main.sales.orders");
    }

    #[test]
    fn test_parse_rejects_wrong_arity() {
        assert!("sales.orders".parse::<TableIdentifier>().is_err());
        assert!("a.b.c.d".parse::<TableIdentifier>().is_err());
        assert!("a..c".parse::<TableIdentifier>().is_err());
    }

    #[test]
    fn test_serializes_with_history_column_names() {
        let id = TableIdentifier::new("main", "sales", "orders");
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json["catalog"], "main");
        assert_eq!(json["database"], "sales");
        assert_eq!(json["tableName"], "orders");
    }
}

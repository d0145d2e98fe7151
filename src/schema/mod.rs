pub mod arrow;
pub mod resolve;
pub mod types;

pub use self::arrow::{build_arrow_schema, map_to_arrow_type};
pub use self::resolve::{resolve_columns, resolve_rule, Resolution, Resolved};
pub use self::types::{ColumnDef, ColumnRule, ColumnSource, FieldType, Strategy, TableSchema};

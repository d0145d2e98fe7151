// src/schema/arrow.rs

use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema};
use std::sync::Arc;

use super::types::{FieldType, TableSchema};

/// Map a canonical field type into an Arrow DataType.
///
/// - Text, Code → Utf8
/// - Integer    → Int64
pub fn map_to_arrow_type(ty: FieldType) -> DataType {
    match ty {
        FieldType::Integer => DataType::Int64,
        FieldType::Text | FieldType::Code { .. } => DataType::Utf8,
    }
}

/// Build an ArrowSchema (inside an Arc) from a table schema. Every field is nullable;
/// not-null is enforced by validation, not by the writer.
pub fn build_arrow_schema(schema: &TableSchema) -> Arc<ArrowSchema> {
    let fields: Vec<ArrowField> = schema
        .columns()
        .iter()
        .map(|col| ArrowField::new(&col.name, map_to_arrow_type(col.ty), true))
        .collect();

    Arc::new(ArrowSchema::new(fields))
}

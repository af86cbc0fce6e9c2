use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// Document table layout. `keywords` holds a JSON array string; `ordinal` is
/// the document's position in the batch it was written with.
pub fn build_documents_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("category", DataType::Utf8, false),
        Field::new("keywords", DataType::Utf8, false),
        Field::new("source_label", DataType::Utf8, false),
        Field::new("ordinal", DataType::UInt64, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
            true,
        ),
    ]))
}

/// Key/value table holding pointers such as the active document table.
pub fn build_meta_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("key", DataType::Utf8, false),
        Field::new("value", DataType::Utf8, false),
        Field::new("updated_at", DataType::Timestamp(arrow_schema::TimeUnit::Millisecond, None), false),
    ]))
}

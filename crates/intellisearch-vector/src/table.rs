//! LanceDB connection and housekeeping helpers.
//!
//! Database open, an ensure-table helper, and the key/value metadata table
//! used to store pointers such as the active document table.

use std::sync::Arc;

use arrow_array::{RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};

use intellisearch_core::IndexError;

use crate::schema::build_meta_schema;

pub(crate) fn backend(e: impl std::fmt::Display) -> IndexError {
    IndexError::Backend(e.to_string())
}

pub async fn open_db(uri: &str) -> Result<Connection, IndexError> {
    connect(uri)
        .execute()
        .await
        .map_err(|e| IndexError::Unavailable(format!("{uri}: {e}")))
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool, IndexError> {
    let names = conn.table_names().execute().await.map_err(backend)?;
    Ok(names.iter().any(|n| n == name))
}

pub async fn ensure_table(
    conn: &Connection,
    name: &str,
    schema: Arc<arrow_schema::Schema>,
) -> Result<(), IndexError> {
    if table_exists(conn, name).await? {
        return Ok(());
    }
    // empty table with 0 rows
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
    conn.create_table(name, Box::new(iter)).execute().await.map_err(backend)?;
    Ok(())
}

pub async fn set_meta(conn: &Connection, table: &str, key: &str, value: &str) -> Result<(), IndexError> {
    ensure_table(conn, table, build_meta_schema()).await?;
    let t = conn.open_table(table).execute().await.map_err(backend)?;
    let rb = RecordBatch::try_new(
        build_meta_schema(),
        vec![
            Arc::new(StringArray::from(vec![key.to_string()])),
            Arc::new(StringArray::from(vec![value.to_string()])),
            Arc::new(TimestampMillisecondArray::from(vec![Utc::now().timestamp_millis()])),
        ],
    )
    .map_err(backend)?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), build_meta_schema()));
    // upsert: key is unique
    let mut mi = t.merge_insert(&["key"]);
    mi.when_matched_update_all(None).when_not_matched_insert_all();
    mi.execute(reader).await.map_err(backend)?;
    Ok(())
}

pub async fn get_meta(conn: &Connection, table: &str, key: &str) -> Result<Option<String>, IndexError> {
    if !table_exists(conn, table).await? {
        return Ok(None);
    }
    let t = conn.open_table(table).execute().await.map_err(backend)?;
    let mut stream = t
        .query()
        .only_if(format!("key = '{}'", escape(key)))
        .execute()
        .await
        .map_err(backend)?;
    while let Some(batch) = stream.try_next().await.map_err(backend)? {
        if batch.num_rows() == 0 {
            continue;
        }
        let val = batch
            .column_by_name("value")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| IndexError::Backend("meta.value column missing".into()))?;
        return Ok(Some(val.value(0).to_string()));
    }
    Ok(None)
}

pub(crate) fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

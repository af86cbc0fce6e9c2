use std::sync::{Arc, PoisonError, RwLock};

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray, UInt64Array,
};
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use tokio::sync::Mutex;

use intellisearch_core::traits::{IndexWriter, VectorIndex};
use intellisearch_core::{Document, EmbeddedDocument, IndexError, SearchHit};

use crate::schema::build_documents_schema;
use crate::similarity::{rank_hits, score_from_distance};
use crate::table::{backend, escape, get_meta, open_db, set_meta, table_exists};

const META_TABLE: &str = "intellisearch_meta";

#[derive(Clone)]
struct ActiveTable {
    name: String,
    table: Table,
    dim: usize,
}

/// LanceDB-backed index.
///
/// Every `replace_all` writes a fresh `{base}_{millis}` table and then flips the
/// `active_table:{base}` pointer in the metadata table, so readers see either
/// the previous contents or the new ones.
///
/// Equal scores are ordered by each document's position in the `replace_all`
/// call that wrote it, matching [`crate::MemoryVectorIndex`]. Tables written
/// without an `ordinal` column fall back to the order Lance returns rows in.
/// Ties that straddle the `top_k` cutoff are settled by Lance itself.
pub struct LanceVectorIndex {
    conn: Connection,
    base: String,
    active: RwLock<Option<ActiveTable>>,
    writer: Mutex<()>,
}

impl LanceVectorIndex {
    pub async fn open(uri: &str, base: &str) -> Result<Self, IndexError> {
        let conn = open_db(uri).await?;
        let active = match get_meta(&conn, META_TABLE, &pointer_key(base)).await? {
            Some(name) if !name.is_empty() && table_exists(&conn, &name).await? => {
                let table = conn.open_table(&name).execute().await.map_err(backend)?;
                let dim = vector_dim(&table).await?;
                tracing::info!(table = %name, dim, "opened active document table");
                Some(ActiveTable { name, table, dim })
            }
            _ => None,
        };
        Ok(Self { conn, base: base.to_string(), active: RwLock::new(active), writer: Mutex::new(()) })
    }

    /// Name of the table currently served, if any.
    pub fn active_table(&self) -> Option<String> {
        self.current().map(|a| a.name)
    }

    fn current(&self) -> Option<ActiveTable> {
        self.active.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    async fn next_table_name(&self) -> Result<String, IndexError> {
        let stamp = Utc::now().timestamp_millis();
        let mut name = format!("{}_{stamp}", self.base);
        let mut n = 1;
        while table_exists(&self.conn, &name).await? {
            name = format!("{}_{stamp}_{n}", self.base);
            n += 1;
        }
        Ok(name)
    }
}

fn pointer_key(base: &str) -> String {
    format!("active_table:{base}")
}

async fn vector_dim(table: &Table) -> Result<usize, IndexError> {
    let schema = table.schema().await.map_err(backend)?;
    match schema.field_with_name("vector").map(|f| f.data_type().clone()) {
        Ok(arrow_schema::DataType::FixedSizeList(_, n)) => {
            usize::try_from(n).map_err(|_| IndexError::Backend(format!("bad vector width {n}")))
        }
        _ => Err(IndexError::Backend("document table has no vector column".into())),
    }
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, IndexError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| IndexError::Backend(format!("{name} column missing")))
}

fn column<F>(documents: &[EmbeddedDocument], field: F) -> StringArray
where
    F: for<'a> Fn(&'a Document) -> &'a String,
{
    StringArray::from_iter_values(documents.iter().map(|d| field(&d.document)))
}

fn documents_to_batch(documents: &[EmbeddedDocument], dim: usize) -> Result<RecordBatch, IndexError> {
    let width = i32::try_from(dim).map_err(|_| IndexError::Backend(format!("dimension {dim} too large")))?;
    let mut keywords = Vec::with_capacity(documents.len());
    for d in documents {
        keywords.push(serde_json::to_string(&d.document.keywords).map_err(backend)?);
    }
    let vectors = documents.iter().map(|d| Some(d.vector.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
    RecordBatch::try_new(
        build_documents_schema(width),
        vec![
            Arc::new(column(documents, |d| &d.id)),
            Arc::new(column(documents, |d| &d.title)),
            Arc::new(column(documents, |d| &d.content)),
            Arc::new(column(documents, |d| &d.category)),
            Arc::new(StringArray::from(keywords)),
            Arc::new(column(documents, |d| &d.source_label)),
            Arc::new(UInt64Array::from_iter_values((0u64..).take(documents.len()))),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(
                vectors, width,
            )),
        ],
    )
    .map_err(backend)
}

fn batch_to_documents(batch: &RecordBatch) -> Result<Vec<Document>, IndexError> {
    let ids = string_col(batch, "id")?;
    let titles = string_col(batch, "title")?;
    let contents = string_col(batch, "content")?;
    let categories = string_col(batch, "category")?;
    let keywords = string_col(batch, "keywords")?;
    let sources = string_col(batch, "source_label")?;
    (0..batch.num_rows())
        .map(|i| {
            Ok(Document {
                id: ids.value(i).to_string(),
                title: titles.value(i).to_string(),
                content: contents.value(i).to_string(),
                category: categories.value(i).to_string(),
                keywords: serde_json::from_str(keywords.value(i)).map_err(backend)?,
                source_label: sources.value(i).to_string(),
            })
        })
        .collect()
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
    async fn len(&self) -> Result<usize, IndexError> {
        match self.current() {
            Some(active) => active.table.count_rows(None).await.map_err(backend),
            None => Ok(0),
        }
    }

    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>, IndexError> {
        let Some(active) = self.current() else {
            return Ok(Vec::new());
        };
        if vector.len() != active.dim {
            return Err(IndexError::DimensionMismatch { expected: active.dim, actual: vector.len() });
        }
        let mut stream = active
            .table
            .vector_search(vector.to_vec())
            .map_err(backend)?
            .distance_type(DistanceType::Cosine)
            .limit(top_k)
            .execute()
            .await
            .map_err(backend)?;
        let mut keyed = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(backend)? {
            let ids = string_col(&batch, "id")?;
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| IndexError::Backend("_distance column missing".into()))?;
            let ordinals = batch.column_by_name("ordinal").and_then(|c| c.as_any().downcast_ref::<UInt64Array>());
            for i in 0..batch.num_rows() {
                let distance = if distances.is_null(i) { 1.0 } else { distances.value(i) };
                let ordinal = match ordinals {
                    Some(col) if !col.is_null(i) => col.value(i),
                    _ => u64::try_from(keyed.len()).unwrap_or(u64::MAX),
                };
                let hit = SearchHit { id: ids.value(i).to_string(), score: score_from_distance(distance) };
                keyed.push((ordinal, hit));
            }
        }
        keyed.sort_by_key(|(ordinal, _)| *ordinal);
        let hits = keyed.into_iter().map(|(_, hit)| hit).collect();
        Ok(rank_hits(hits, top_k))
    }

    async fn document(&self, id: &str) -> Result<Option<Document>, IndexError> {
        let Some(active) = self.current() else {
            return Ok(None);
        };
        let mut stream = active
            .table
            .query()
            .only_if(format!("id = '{}'", escape(id)))
            .limit(1)
            .execute()
            .await
            .map_err(backend)?;
        while let Some(batch) = stream.try_next().await.map_err(backend)? {
            if let Some(doc) = batch_to_documents(&batch)?.into_iter().next() {
                return Ok(Some(doc));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl IndexWriter for LanceVectorIndex {
    async fn replace_all(&self, documents: Vec<EmbeddedDocument>) -> Result<(), IndexError> {
        let _guard = self.writer.lock().await;

        let mut seen = std::collections::HashSet::with_capacity(documents.len());
        let dim = documents.first().map(EmbeddedDocument::dim);
        for d in &documents {
            if !d.document.is_embeddable() {
                return Err(IndexError::EmptyDocument(d.document.id.clone()));
            }
            if let Some(expected) = dim.filter(|&e| e != d.dim()) {
                return Err(IndexError::DimensionMismatch { expected, actual: d.dim() });
            }
            if !seen.insert(d.document.id.as_str()) {
                return Err(IndexError::DuplicateId(d.document.id.clone()));
            }
        }

        let Some(dim) = dim else {
            set_meta(&self.conn, META_TABLE, &pointer_key(&self.base), "").await?;
            *self.active.write().unwrap_or_else(PoisonError::into_inner) = None;
            tracing::info!(base = %self.base, "published empty index");
            return Ok(());
        };

        let name = self.next_table_name().await?;
        let batch = documents_to_batch(&documents, dim)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let table = self.conn.create_table(&name, reader).execute().await.map_err(backend)?;
        set_meta(&self.conn, META_TABLE, &pointer_key(&self.base), &name).await?;

        let previous = self.active_table();
        *self.active.write().unwrap_or_else(PoisonError::into_inner) =
            Some(ActiveTable { name: name.clone(), table, dim });
        // TODO: drop superseded tables once no reader can still hold them.
        tracing::info!(table = %name, previous = ?previous, documents = documents.len(), "published index table");
        Ok(())
    }
}

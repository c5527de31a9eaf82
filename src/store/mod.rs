#[cfg(test)]
mod tests;

use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::RagError;
use crate::config::{CollectionConfig, Metric};

/// Placeholder dimension used before the first batch fixes the real one.
const DEFAULT_VECTOR_DIMENSION: usize = 768;

/// One embedded chunk as stored in the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Deterministic composite id: `doc_{source}_{section}_{chunk}`.
    pub id: String,
    pub vector: Vec<f32>,
    pub content: String,
    pub source_id: String,
    pub heading: String,
    pub section_type: String,
    pub chunk_index: u32,
}

/// One ranked row returned from a similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub content: String,
    pub source_id: String,
    pub heading: String,
    pub section_type: String,
    pub chunk_index: u32,
    pub distance: f32,
}

/// Resettable vector collection backed by a LanceDB table.
///
/// The collection is process-wide shared state: `reset` and `add_batch`
/// replace or grow the corpus that every concurrent query sees. Callers
/// own whatever serialization they need (see the session transport).
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    metric: Metric,
    vector_dimension: Option<usize>,
}

fn distance_type(metric: Metric) -> lancedb::DistanceType {
    match metric {
        Metric::L2 => lancedb::DistanceType::L2,
        Metric::Cosine => lancedb::DistanceType::Cosine,
        Metric::Dot => lancedb::DistanceType::Dot,
    }
}

impl VectorStore {
    /// Connect to (or create) the collection under the given data dir.
    #[inline]
    pub async fn connect(config: &CollectionConfig) -> Result<Self, RagError> {
        let db_path: &Path = &config.data_dir;
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(db_path).map_err(|e| {
            RagError::Store(format!("Failed to create vector store directory: {}", e))
        })?;

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to connect to LanceDB: {}", e)))?;

        let mut store = Self {
            connection,
            table_name: config.name.clone(),
            metric: config.metric,
            vector_dimension: None,
        };
        store.ensure_table().await?;

        info!("Vector store ready (collection '{}')", store.table_name);
        Ok(store)
    }

    /// Create the table if missing; detect the vector dimension otherwise.
    async fn ensure_table(&mut self) -> Result<(), RagError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            let dimension = self.detect_vector_dimension().await?;
            self.vector_dimension = Some(dimension);
            debug!("Opened existing collection with {} dimensions", dimension);
            return Ok(());
        }

        self.create_empty_table(DEFAULT_VECTOR_DIMENSION).await?;
        self.vector_dimension = Some(DEFAULT_VECTOR_DIMENSION);
        Ok(())
    }

    async fn detect_vector_dimension(&self) -> Result<usize, RagError> {
        let table = self.open_table().await?;
        let schema = table
            .schema()
            .await
            .map_err(|e| RagError::Store(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(RagError::Store(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    fn schema(&self, vector_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    vector_dim as i32,
                ),
                false,
            ),
            Field::new("content", DataType::Utf8, false),
            Field::new("source_id", DataType::Utf8, false),
            Field::new("heading", DataType::Utf8, false),
            Field::new("section_type", DataType::Utf8, false),
            Field::new("chunk_index", DataType::UInt32, false),
        ]))
    }

    async fn create_empty_table(&self, vector_dim: usize) -> Result<(), RagError> {
        self.connection
            .create_empty_table(&self.table_name, self.schema(vector_dim))
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to create table: {}", e)))?;
        Ok(())
    }

    async fn open_table(&self) -> Result<lancedb::Table, RagError> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to open table: {}", e)))
    }

    /// Drop and recreate the collection: "replace the corpus" semantics.
    ///
    /// Concurrent readers observe an empty or partially repopulated
    /// collection until the next ingest completes.
    #[inline]
    pub async fn reset(&mut self) -> Result<(), RagError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| RagError::Store(format!("Failed to drop table: {}", e)))?;
        }

        let dimension = self.vector_dimension.unwrap_or(DEFAULT_VECTOR_DIMENSION);
        self.create_empty_table(dimension).await?;

        info!("Collection '{}' reset", self.table_name);
        Ok(())
    }

    /// Insert one batch of documents.
    ///
    /// The vector dimension is fixed by the first batch after a reset; a
    /// batch with a different dimension recreates the table.
    #[inline]
    pub async fn add_batch(&mut self, documents: &[StoredDocument]) -> Result<(), RagError> {
        if documents.is_empty() {
            debug!("No documents to store");
            return Ok(());
        }

        let vector_dim = documents[0].vector.len();
        if self.vector_dimension != Some(vector_dim) {
            debug!(
                "Vector dimension changed from {:?} to {}, recreating table",
                self.vector_dimension, vector_dim
            );
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| RagError::Store(format!("Failed to drop table: {}", e)))?;
            self.create_empty_table(vector_dim).await?;
            self.vector_dimension = Some(vector_dim);
        }

        if let Some(mismatched) = documents.iter().find(|d| d.vector.len() != vector_dim) {
            return Err(RagError::Store(format!(
                "Inconsistent vector dimensions in batch: {} vs {}",
                mismatched.vector.len(),
                vector_dim
            )));
        }

        let record_batch = self.record_batch(documents, vector_dim)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);

        let table = self.open_table().await?;
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to insert documents: {}", e)))?;

        debug!("Stored batch of {} documents", documents.len());
        Ok(())
    }

    fn record_batch(
        &self,
        documents: &[StoredDocument],
        vector_dim: usize,
    ) -> Result<RecordBatch, RagError> {
        let len = documents.len();

        let mut ids = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut source_ids = Vec::with_capacity(len);
        let mut headings = Vec::with_capacity(len);
        let mut section_types = Vec::with_capacity(len);
        let mut chunk_indices = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * vector_dim);

        for document in documents {
            ids.push(document.id.as_str());
            contents.push(document.content.as_str());
            source_ids.push(document.source_id.as_str());
            headings.push(document.heading.as_str());
            section_types.push(document.section_type.as_str());
            chunk_indices.push(document.chunk_index);
            flat_values.extend_from_slice(&document.vector);
        }

        let values_array = Float32Array::from(flat_values);
        let item_field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(item_field, vector_dim as i32, Arc::new(values_array), None)
                .map_err(|e| RagError::Store(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(source_ids)),
            Arc::new(StringArray::from(headings)),
            Arc::new(StringArray::from(section_types)),
            Arc::new(UInt32Array::from(chunk_indices)),
        ];

        RecordBatch::try_new(self.schema(vector_dim), arrays)
            .map_err(|e| RagError::Store(format!("Failed to create record batch: {}", e)))
    }

    /// Nearest-neighbour search over the collection.
    #[inline]
    pub async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<QueryResult>, RagError> {
        debug!("Searching for similar vectors with limit: {}", limit);

        let table = self.open_table().await?;

        let mut stream = table
            .vector_search(query_vector)
            .map_err(|e| RagError::Store(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(distance_type(self.metric))
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to execute search: {}", e)))?;

        let mut results = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| RagError::Store(format!("Failed to read result stream: {}", e)))?
        {
            results.extend(parse_search_batch(&batch)?);
        }

        debug!("Search returned {} results", results.len());
        Ok(results)
    }

    /// Number of documents currently in the collection.
    #[inline]
    pub async fn count(&self) -> Result<u64, RagError> {
        let table = self.open_table().await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Store(format!("Failed to count rows: {}", e)))?;
        Ok(count as u64)
    }
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<QueryResult>, RagError> {
    let contents = string_column(batch, "content")?;
    let source_ids = string_column(batch, "source_id")?;
    let headings = string_column(batch, "heading")?;
    let section_types = string_column(batch, "section_type")?;

    let chunk_indices = batch
        .column_by_name("chunk_index")
        .ok_or_else(|| RagError::Store("Missing chunk_index column".to_string()))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| RagError::Store("Invalid chunk_index column type".to_string()))?;

    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut results = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let distance = distances
            .flatten()
            .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        results.push(QueryResult {
            content: contents.value(row).to_string(),
            source_id: source_ids.value(row).to_string(),
            heading: headings.value(row).to_string(),
            section_type: section_types.value(row).to_string(),
            chunk_index: chunk_indices.value(row),
            distance,
        });
    }

    Ok(results)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, RagError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Store(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Store(format!("Invalid {} column type", name)))
}

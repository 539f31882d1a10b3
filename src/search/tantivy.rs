use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tantivy::schema::*;
use tantivy::{Index, IndexReader, IndexWriter, doc};

use crate::model::types::MessageRecord;

const SCHEMA_VERSION: &str = "v1";

#[derive(Clone, Copy)]
pub struct Fields {
    pub id: Field,
    pub thread_id: Field,
    pub subject: Field,
    pub author: Field,
    pub timestamp: Field,
    pub year: Field,
    pub index_text: Field,
}

/// Full-text index over message records, keyed by message id.
pub struct ArchiveIndex {
    pub index: Index,
    writer: IndexWriter,
    pub fields: Fields,
}

impl ArchiveIndex {
    /// Create a fresh index at `path`, discarding whatever was there.
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            std::fs::remove_dir_all(path)
                .with_context(|| format!("removing stale index at {}", path.display()))?;
        }
        std::fs::create_dir_all(path)?;
        let schema = build_schema();
        let index = Index::create_in_dir(path, schema.clone())?;
        let writer = index
            .writer(50_000_000)
            .with_context(|| "create index writer")?;
        let fields = fields_from_schema(&schema)?;
        Ok(Self {
            index,
            writer,
            fields,
        })
    }

    pub fn add_record(&mut self, rec: &MessageRecord) -> Result<()> {
        let mut d = doc! {
            self.fields.id => rec.id.clone(),
            self.fields.thread_id => rec.thread_id.clone(),
            self.fields.subject => rec.subject.clone(),
            self.fields.author => rec.author.clone(),
            self.fields.index_text => rec.index_text.clone(),
        };
        if let Some(ts) = &rec.timestamp {
            d.add_text(self.fields.timestamp, ts);
        }
        if let Some(year) = rec.year {
            d.add_i64(self.fields.year, i64::from(year));
        }
        self.writer.add_document(d)?;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.writer.commit()?;
        Ok(())
    }

    pub fn reader(&self) -> Result<IndexReader> {
        Ok(self.index.reader()?)
    }
}

pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    schema_builder.add_text_field("id", STRING | STORED);
    schema_builder.add_text_field("thread_id", STRING | STORED);
    schema_builder.add_text_field("subject", TEXT | STORED);
    schema_builder.add_text_field("author", TEXT | STORED);
    schema_builder.add_text_field("timestamp", STORED);
    schema_builder.add_i64_field("year", INDEXED | STORED);
    schema_builder.add_text_field("index_text", TEXT | STORED);
    schema_builder.build()
}

pub fn fields_from_schema(schema: &Schema) -> Result<Fields> {
    let field = |name: &str| {
        schema
            .get_field(name)
            .map_err(|_| anyhow::anyhow!("schema missing {name}"))
    };
    Ok(Fields {
        id: field("id")?,
        thread_id: field("thread_id")?,
        subject: field("subject")?,
        author: field("author")?,
        timestamp: field("timestamp")?,
        year: field("year")?,
        index_text: field("index_text")?,
    })
}

pub fn index_dir(base: &Path) -> PathBuf {
    base.join(SCHEMA_VERSION)
}

/// Build the index for `records` under `base` and return the number of documents.
pub fn build_index(base: &Path, records: &[MessageRecord]) -> Result<usize> {
    let dir = index_dir(base);
    let mut index = ArchiveIndex::create(&dir)?;
    for rec in records {
        index.add_record(rec)?;
    }
    index.commit()?;
    tracing::info!(
        component = "index",
        documents = records.len(),
        path = %dir.display(),
        "search index committed"
    );
    Ok(records.len())
}

use std::path::Path;

use anyhow::{Context, Result};
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Term, Value};
use tantivy::snippet::SnippetGenerator;
use tantivy::{Index, IndexReader, TantivyDocument};

use crate::search::tantivy::{Fields, fields_from_schema, index_dir};

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub year: Option<i32>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchHit {
    pub id: String,
    pub subject: String,
    pub author: String,
    pub timestamp: Option<String>,
    pub snippet: String,
    pub score: f32,
}

pub struct SearchClient {
    reader: IndexReader,
    fields: Fields,
}

impl SearchClient {
    /// Open the index built by `groupsite index` under `base`.
    pub fn open(base: &Path) -> Result<Self> {
        let dir = index_dir(base);
        let index = Index::open_in_dir(&dir)
            .with_context(|| format!("opening search index at {}", dir.display()))?;
        let fields = fields_from_schema(&index.schema())?;
        let reader = index.reader()?;
        Ok(Self { reader, fields })
    }

    pub fn search(&self, query: &str, filters: &SearchFilters, limit: usize) -> Result<Vec<SearchHit>> {
        tracing::info!(backend = "tantivy", query = query, limit = limit, "search_start");
        let searcher = self.reader.searcher();
        let fields = &self.fields;
        let parser = QueryParser::for_index(
            searcher.index(),
            vec![fields.subject, fields.author, fields.index_text],
        );

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        if !query.trim().is_empty() {
            let (parsed, errors) = parser.parse_query_lenient(query);
            if !errors.is_empty() {
                tracing::debug!(query = query, errors = errors.len(), "query parsed leniently");
            }
            clauses.push((Occur::Must, parsed));
        }
        if let Some(year) = filters.year {
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(
                    Term::from_field_i64(fields.year, i64::from(year)),
                    IndexRecordOption::Basic,
                )),
            ));
        }
        if clauses.is_empty() {
            return Ok(Vec::new());
        }
        let q: Box<dyn Query> = if clauses.len() == 1 {
            clauses.remove(0).1
        } else {
            Box::new(BooleanQuery::new(clauses))
        };

        let snippet_generator = SnippetGenerator::create(&searcher, &*q, fields.index_text)?;
        let top_docs = searcher.search(&q, &TopDocs::with_limit(limit.max(1)).order_by_score())?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let text = |field: Field| {
                doc.get_first(field)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string()
            };
            let timestamp = Some(text(fields.timestamp)).filter(|t| !t.is_empty());
            let snippet = snippet_generator
                .snippet_from_doc(&doc)
                .to_html()
                .replace("<b>", "**")
                .replace("</b>", "**");
            hits.push(SearchHit {
                id: text(fields.id),
                subject: text(fields.subject),
                author: text(fields.author),
                timestamp,
                snippet,
                score,
            });
        }
        tracing::info!(hits = hits.len(), "search_done");
        Ok(hits)
    }
}

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::*;
use tantivy::tokenizer::{
    Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, StopWordFilter,
    TextAnalyzer, TokenStream,
};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, Term};
use uuid::Uuid;

const TOKENIZER: &str = "profile_en";

/// Words dropped from both documents and queries so a natural-language query
/// like "someone who writes poetry" is matched on its content words only.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "he",
    "her", "his", "i", "in", "into", "is", "it", "its", "me", "my", "of", "on", "or", "our",
    "she", "that", "the", "their", "them", "they", "this", "to", "was", "we", "were", "who",
    "whom", "will", "with", "you", "your",
];

/// Full-text index of each user's searchable text, one document per user.
pub struct ProfileTextIndex {
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    f_user_id: Field,
    f_text: Field,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexicalHit {
    pub user_id: Uuid,
    /// BM25 relevance folded into `[0, 1)`
    pub score: f32,
}

fn build_schema() -> (Schema, Field, Field) {
    let mut schema_builder = Schema::builder();
    let f_user_id = schema_builder.add_text_field("user_id", STRING | STORED);
    let text_options = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer(TOKENIZER)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );
    let f_text = schema_builder.add_text_field("text", text_options);
    (schema_builder.build(), f_user_id, f_text)
}

fn analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .filter(StopWordFilter::remove(
            STOP_WORDS.iter().map(|w| w.to_string()),
        ))
        .filter(Stemmer::new(Language::English))
        .build()
}

/// Map a BM25 score onto `[0, 1)` so fixed relevance thresholds stay meaningful.
fn normalize_score(score: f32) -> f32 {
    if score <= 0.0 {
        0.0
    } else {
        score / (1.0 + score)
    }
}

impl ProfileTextIndex {
    /// Create or open the index at the given directory.
    pub fn open_or_create(index_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(index_dir)?;
        let (schema, f_user_id, f_text) = build_schema();

        let index = if index_dir.join("meta.json").exists() {
            Index::open_in_dir(index_dir).context("Failed to open existing tantivy index")?
        } else {
            Index::create_in_dir(index_dir, schema).context("Failed to create tantivy index")?
        };

        Self::from_index(index, f_user_id, f_text)
    }

    /// Non-persistent index, used by tests and ephemeral deployments.
    pub fn in_memory() -> Result<Self> {
        let (schema, f_user_id, f_text) = build_schema();
        Self::from_index(Index::create_in_ram(schema), f_user_id, f_text)
    }

    fn from_index(index: Index, f_user_id: Field, f_text: Field) -> Result<Self> {
        index.tokenizers().register(TOKENIZER, analyzer());

        let writer: IndexWriter = index
            .writer_with_num_threads(1, 20_000_000)
            .context("Failed to create index writer")?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .context("Failed to create reader")?;

        Ok(Self {
            reader,
            writer: Mutex::new(writer),
            f_user_id,
            f_text,
        })
    }

    /// Replace the documents of the given users. Returns the ids that were
    /// committed; a user missing from the result keeps its previous document.
    ///
    /// `is_current` is checked per user while the writer lock is held, so a
    /// document it rejects can never overwrite one committed by a concurrent
    /// call that saw a newer version of the profile.
    pub fn index_profiles<F>(&self, docs: &[(Uuid, String)], is_current: F) -> Result<Vec<Uuid>>
    where
        F: Fn(&Uuid) -> bool,
    {
        let mut writer = self.writer.lock();
        let current: Vec<&(Uuid, String)> =
            docs.iter().filter(|(user_id, _)| is_current(user_id)).collect();
        if current.is_empty() {
            return Ok(Vec::new());
        }

        let mut staged = Vec::with_capacity(current.len());
        for (user_id, text) in current {
            let id = user_id.to_string();
            writer.delete_term(Term::from_field_text(self.f_user_id, &id));
            match writer.add_document(doc!(
                self.f_user_id => id,
                self.f_text => text.clone(),
            )) {
                Ok(_) => staged.push(*user_id),
                Err(e) => tracing::warn!(user_id = %user_id, error = %e, "failed to stage text document"),
            }
        }

        if let Err(e) = writer.commit() {
            let _ = writer.rollback();
            return Err(e).context("Failed to commit text index");
        }
        drop(writer);

        self.reader.reload().context("Failed to reload index reader")?;
        Ok(staged)
    }

    /// Tokenize a plain-language query with the document analyzer.
    fn query_terms(&self, query_str: &str) -> Vec<String> {
        let mut analyzer = analyzer();
        let mut stream = analyzer.token_stream(query_str);
        let mut seen = HashSet::new();
        let mut terms = Vec::new();
        while stream.advance() {
            let text = stream.token().text.clone();
            if seen.insert(text.clone()) {
                terms.push(text);
            }
        }
        terms
    }

    /// Every query term must be present. A query with no indexable terms
    /// matches nothing.
    pub fn search(&self, query_str: &str, limit: usize) -> Result<Vec<LexicalHit>> {
        let terms = self.query_terms(query_str);
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let clauses: Vec<(Occur, Box<dyn Query>)> = terms
            .iter()
            .map(|t| {
                let q: Box<dyn Query> = Box::new(TermQuery::new(
                    Term::from_field_text(self.f_text, t),
                    IndexRecordOption::WithFreqs,
                ));
                (Occur::Must, q)
            })
            .collect();
        let query = BooleanQuery::new(clauses);

        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit))
            .context("Search failed")?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(doc_address)
                .context("Failed to retrieve document")?;

            let user_id_str = doc
                .get_first(self.f_user_id)
                .and_then(|v| v.as_str())
                .unwrap_or_default();

            let user_id = match Uuid::parse_str(user_id_str) {
                Ok(id) => id,
                Err(_) => continue,
            };

            hits.push(LexicalHit {
                user_id,
                score: normalize_score(score),
            });
        }

        Ok(hits)
    }

    pub fn doc_count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}

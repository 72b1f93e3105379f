//! Elasticsearch adapter for the job index, over the plain REST API.
//!
//! Keyword-mapped facets (`title`, `company_name`, `industry`, `location`) are matched
//! with `term` for equality and case-insensitive `wildcard` for substrings; every
//! search is a `bool` query with filter clauses only, so no scoring takes place.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::db::models::Pagination;
use crate::search::{IndexError, IndexedJob, JobFilter, JobIndex, SearchHit, SearchPage};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Elasticsearch's default `index.max_result_window`; `from + size` may not exceed it.
pub const MAX_RESULT_WINDOW: i64 = 10_000;

#[derive(Clone)]
pub struct ElasticJobIndex {
    client: Client,
    base_url: String,
    index: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    total: TotalHits,
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct TotalHits {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source")]
    source: IndexedJob,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(rename = "_source")]
    source: Option<IndexedJob>,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    errors: bool,
    #[serde(default)]
    items: Vec<Value>,
}

impl ElasticJobIndex {
    pub fn new(base_url: &str, index: &str) -> Result<Self, IndexError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
        })
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.base_url, self.index)
    }

    fn doc_url(&self, id: i32) -> String {
        format!("{}/_doc/{}", self.index_url(), id)
    }

    /// Creates the index with its field mappings if it does not exist yet.
    pub async fn ensure_index(&self) -> Result<(), IndexError> {
        let exists = self.client.head(self.index_url()).send().await?;
        if exists.status().is_success() {
            debug!("Index '{}' already exists", self.index);
            return Ok(());
        }

        let response = self
            .client
            .put(self.index_url())
            .json(&index_mappings())
            .send()
            .await?;
        check_status(response).await?;
        info!("Created index '{}'", self.index);
        Ok(())
    }
}

#[async_trait]
impl JobIndex for ElasticJobIndex {
    async fn upsert(&self, job: &IndexedJob) -> Result<(), IndexError> {
        let response = self
            .client
            .put(self.doc_url(job.id))
            .query(&[("refresh", "wait_for")])
            .json(job)
            .send()
            .await?;
        check_status(response).await?;
        debug!("Indexed job {}", job.id);
        Ok(())
    }

    async fn bulk_upsert(&self, jobs: &[IndexedJob]) -> Result<(), IndexError> {
        if jobs.is_empty() {
            return Ok(());
        }
        let response = self
            .client
            .post(format!("{}/_bulk", self.base_url))
            .query(&[("refresh", "wait_for")])
            .header("content-type", "application/x-ndjson")
            .body(bulk_body(&self.index, jobs)?)
            .send()
            .await?;
        let response = check_status(response).await?;
        let bulk: BulkResponse = response.json().await?;
        if bulk.errors {
            return Err(IndexError::Bulk(first_bulk_error(&bulk.items)));
        }
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<(), IndexError> {
        let response = self
            .client
            .delete(self.doc_url(id))
            .query(&[("refresh", "wait_for")])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Job {id} was not indexed");
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }

    async fn get(&self, id: i32) -> Result<Option<IndexedJob>, IndexError> {
        let response = self.client.get(self.doc_url(id)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        let doc: GetResponse = response.json().await?;
        Ok(doc.source)
    }

    async fn search(
        &self,
        filter: &JobFilter,
        page: Pagination,
    ) -> Result<SearchPage, IndexError> {
        let response = self
            .client
            .post(format!("{}/_search", self.index_url()))
            .json(&search_body(filter, page))
            .send()
            .await?;
        let response = check_status(response).await?;
        let body: Value = response.json().await?;
        parse_search_response(body)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, IndexError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IndexError::Status {
        status: status.as_u16(),
        body,
    })
}

fn index_mappings() -> Value {
    json!({
        "mappings": {
            "properties": {
                "id": { "type": "integer" },
                "title": { "type": "keyword" },
                "industry": { "type": "keyword" },
                "company_name": { "type": "keyword" },
                "description": { "type": "text" },
                "location": { "type": "keyword" },
                "salary_min": { "type": "integer" },
                "salary_max": { "type": "integer" },
                "requirements": { "type": "text" },
                "job_skills": { "type": "keyword" }
            }
        }
    })
}

/// Escapes wildcard metacharacters so user input matches literally.
fn escape_wildcard(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '*' | '?' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn contains_clause(field: &str, value: &str) -> Value {
    json!({
        "wildcard": {
            field: {
                "value": format!("*{}*", escape_wildcard(value)),
                "case_insensitive": true
            }
        }
    })
}

fn term_clause(field: &str, value: &str) -> Value {
    json!({ "term": { field: value } })
}

fn filter_clauses(filter: &JobFilter) -> Vec<Value> {
    match filter {
        JobFilter::All => vec![],
        JobFilter::Title(title) => vec![contains_clause("title", title)],
        JobFilter::Industry(industry) => vec![term_clause("industry", industry)],
        JobFilter::CompanyName(name) => vec![contains_clause("company_name", name)],
        JobFilter::CompanyExactName(name) => vec![term_clause("company_name", name)],
        JobFilter::Location(location) => vec![term_clause("location", location)],
        JobFilter::SalaryRange(range) => vec![
            json!({ "range": { "salary_min": { "gte": range.min } } }),
            json!({ "range": { "salary_max": { "lte": range.max } } }),
        ],
    }
}

/// Keeps `from + size` inside the result window. A page that starts at or past the
/// window becomes a hitless request that still reports the total.
fn window(page: Pagination) -> (i64, i64) {
    let from = page.offset.max(0);
    if from >= MAX_RESULT_WINDOW {
        return (0, 0);
    }
    (from, page.limit.clamp(0, MAX_RESULT_WINDOW - from))
}

fn search_body(filter: &JobFilter, page: Pagination) -> Value {
    let (from, size) = window(page);
    json!({
        "from": from,
        "size": size,
        "track_total_hits": true,
        "sort": [{ "id": "asc" }],
        "query": { "bool": { "filter": filter_clauses(filter) } }
    })
}

fn bulk_body(index: &str, jobs: &[IndexedJob]) -> Result<String, IndexError> {
    let mut body = String::new();
    for job in jobs {
        let action = json!({ "index": { "_index": index, "_id": job.id.to_string() } });
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(job)?);
        body.push('\n');
    }
    Ok(body)
}

fn first_bulk_error(items: &[Value]) -> String {
    items
        .iter()
        .filter_map(|item| item.get("index"))
        .find_map(|action| action.get("error"))
        .map(|error| error.to_string())
        .unwrap_or_else(|| "unknown bulk failure".to_string())
}

fn parse_search_response(body: Value) -> Result<SearchPage, IndexError> {
    let response: SearchResponse = serde_json::from_value(body)?;
    let hits = response
        .hits
        .hits
        .into_iter()
        .map(|hit| SearchHit {
            id: hit.id.parse().unwrap_or(hit.source.id),
            job: hit.source,
        })
        .collect();
    Ok(SearchPage {
        total: response.hits.total.value,
        hits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::SalaryRange;
    use crate::search::test_support::indexed_job;

    #[test]
    fn test_title_filter_uses_case_insensitive_wildcard() {
        let body = search_body(&JobFilter::Title("eng".to_string()), Pagination::new(5, 10));
        assert_eq!(body["from"], 10);
        assert_eq!(body["size"], 5);
        assert_eq!(body["track_total_hits"], true);
        let clause = &body["query"]["bool"]["filter"][0]["wildcard"]["title"];
        assert_eq!(clause["value"], "*eng*");
        assert_eq!(clause["case_insensitive"], true);
    }

    #[test]
    fn test_page_is_clamped_to_result_window() {
        let body = search_body(&JobFilter::All, Pagination::new(100, 9_950));
        assert_eq!(body["from"], 9_950);
        assert_eq!(body["size"], 50);

        let body = search_body(&JobFilter::All, Pagination::new(10, MAX_RESULT_WINDOW - 10));
        assert_eq!(body["from"], MAX_RESULT_WINDOW - 10);
        assert_eq!(body["size"], 10);
    }

    #[test]
    fn test_page_past_result_window_only_counts() {
        for offset in [MAX_RESULT_WINDOW, 20_000, i64::MAX] {
            let body = search_body(&JobFilter::All, Pagination::new(10, offset));
            assert_eq!(body["from"], 0, "offset={offset}");
            assert_eq!(body["size"], 0, "offset={offset}");
            assert_eq!(body["track_total_hits"], true);
        }
    }

    #[test]
    fn test_hitless_response_keeps_total() {
        let body = json!({
            "hits": { "total": { "value": 12_345, "relation": "eq" }, "hits": [] }
        });
        let page = parse_search_response(body).unwrap();
        assert_eq!(page.total, 12_345);
        assert!(page.hits.is_empty());
    }

    #[test]
    fn test_exact_filters_use_term() {
        let body = search_body(
            &JobFilter::CompanyExactName("Acme".to_string()),
            Pagination::first_page(),
        );
        assert_eq!(body["query"]["bool"]["filter"][0]["term"]["company_name"], "Acme");

        let body = search_body(
            &JobFilter::Location("Berlin".to_string()),
            Pagination::first_page(),
        );
        assert_eq!(body["query"]["bool"]["filter"][0]["term"]["location"], "Berlin");
    }

    #[test]
    fn test_salary_filter_requires_containment() {
        let body = search_body(
            &JobFilter::SalaryRange(SalaryRange { min: 100, max: 200 }),
            Pagination::first_page(),
        );
        let filters = body["query"]["bool"]["filter"].as_array().unwrap();
        assert_eq!(filters[0]["range"]["salary_min"]["gte"], 100);
        assert_eq!(filters[1]["range"]["salary_max"]["lte"], 200);
    }

    #[test]
    fn test_match_all_has_no_filter_clauses() {
        let body = search_body(&JobFilter::All, Pagination::first_page());
        assert!(body["query"]["bool"]["filter"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_wildcard_input_is_escaped() {
        assert_eq!(escape_wildcard("c*?\\"), "c\\*\\?\\\\");
    }

    #[test]
    fn test_bulk_body_is_ndjson_pairs() {
        let jobs = vec![
            indexed_job(1, "Engineer", "Acme", (1, 2)),
            indexed_job(2, "Designer", "Acme", (1, 2)),
        ];
        let body = bulk_body("jobs", &jobs).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        let action: Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(action["index"]["_id"], "2");
        assert_eq!(action["index"]["_index"], "jobs");
        let doc: IndexedJob = serde_json::from_str(lines[3]).unwrap();
        assert_eq!(doc.title, "Designer");
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn test_parse_search_response() {
        let doc = indexed_job(7, "Engineer", "Acme", (1, 2));
        let body = json!({
            "took": 3,
            "hits": {
                "total": { "value": 42, "relation": "eq" },
                "hits": [{ "_index": "jobs", "_id": "7", "_score": null, "_source": doc }]
            }
        });
        let page = parse_search_response(body).unwrap();
        assert_eq!(page.total, 42);
        assert_eq!(page.hits.len(), 1);
        assert_eq!(page.hits[0].id, 7);
        assert_eq!(page.hits[0].job, indexed_job(7, "Engineer", "Acme", (1, 2)));
    }

    #[test]
    fn test_first_bulk_error_reports_reason() {
        let items = vec![
            json!({ "index": { "_id": "1", "status": 201 } }),
            json!({ "index": { "_id": "2", "status": 400, "error": { "type": "mapper_parsing_exception" } } }),
        ];
        assert!(first_bulk_error(&items).contains("mapper_parsing_exception"));
        assert_eq!(first_bulk_error(&[]), "unknown bulk failure");
    }
}

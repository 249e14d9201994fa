//! Supabase-specific implementation of the `VotingService` trait.
//!
//! This file contains the HTTP client wrapper for the hosted backend, the
//! PostgREST filter helpers, and the conversion of backend error objects
//! into `ServiceError` values. Tables live under `/rest/v1/<table>` and remote
//! procedures under `/rest/v1/rpc/<name>`.

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client, RequestBuilder, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::{ServiceError, ServiceResult};
use crate::models::*;
use crate::VotingService;

const CANDIDATE_COLUMNS: &str =
    "id,name,waist_number,gender,university_id,height_cm,birthday,hobby,image_url";

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

pub struct SupabaseAdapter {
    client: Client,
    base_url: String,
}

/// Error object PostgREST returns in the body of a failed request.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
    code: Option<String>,
    details: Option<String>,
}

impl SupabaseAdapter {
    pub fn new(config: SupabaseConfig) -> ServiceResult<Self> {
        let url = config.url.trim().trim_end_matches('/');
        if url.is_empty() || config.anon_key.trim().is_empty() {
            return Err(ServiceError::InvalidConfig(
                "backend URL and anon key are required".to_string(),
            ));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ServiceError::InvalidConfig(format!(
                "backend URL must be http(s): {url}"
            )));
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(config.anon_key.trim())
            .map_err(|err| ServiceError::InvalidConfig(format!("Invalid anon key: {err}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.anon_key.trim()))
            .map_err(|err| ServiceError::InvalidConfig(format!("Invalid anon key: {err}")))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| ServiceError::InvalidConfig(err.to_string()))?;

        Ok(Self {
            client,
            base_url: format!("{url}/rest/v1"),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn rpc_url(&self, procedure: &str) -> String {
        format!("{}/rpc/{}", self.base_url, procedure)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> ServiceResult<Vec<T>> {
        debug!("select from {table} with {} filters", params.len());

        let response = self
            .client
            .get(self.table_url(table))
            .query(params)
            .send()
            .await?;

        Ok(check(response).await?.json::<Vec<T>>().await?)
    }

    async fn rpc<T: DeserializeOwned>(&self, procedure: &str, body: Value) -> ServiceResult<T> {
        debug!("calling remote procedure {procedure}");

        let response = self
            .client
            .post(self.rpc_url(procedure))
            .json(&body)
            .send()
            .await?;

        Ok(check(response).await?.json::<T>().await?)
    }

    fn insert_vote_request(&self, vote: &NewVote) -> RequestBuilder {
        self.client
            .post(self.table_url("votes"))
            .header("Prefer", "return=minimal")
            .json(vote)
    }
}

async fn check(response: Response) -> ServiceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(rejection_from_body(status, &body))
}

/// Turns a failed response into a rejection, keeping the backend's message verbatim when present.
fn rejection_from_body(status: StatusCode, body: &str) -> ServiceError {
    match serde_json::from_str::<PostgrestError>(body) {
        Ok(PostgrestError {
            message: Some(message),
            code,
            ..
        }) => ServiceError::Rejected { message, code },
        Ok(PostgrestError {
            message: None,
            code,
            details: Some(details),
        }) => ServiceError::Rejected {
            message: details,
            code,
        },
        _ if !body.trim().is_empty() => ServiceError::Rejected {
            message: body.trim().to_string(),
            code: Some(status.as_u16().to_string()),
        },
        _ => ServiceError::Rejected {
            message: format!("Request failed with status {status}"),
            code: Some(status.as_u16().to_string()),
        },
    }
}

fn eq(value: impl ToString) -> String {
    format!("eq.{}", value.to_string())
}

fn ilike(value: &str) -> String {
    format!("ilike.{value}")
}

fn in_list<T: ToString>(values: &[T]) -> String {
    let joined = values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({joined})")
}

fn active_filter(params: &mut Vec<(&str, String)>, active_only: bool) {
    if active_only {
        params.push(("is_active", eq(true)));
    }
}

fn candidate_params(
    university: UniversityId,
    gender: &Gender,
    active_only: bool,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("select", CANDIDATE_COLUMNS.to_string()),
        ("university_id", eq(university)),
        ("gender", ilike(gender.as_str())),
    ];
    active_filter(&mut params, active_only);
    params.push(("order", "waist_number.asc".to_string()));
    params
}

/// Nearest active candidate strictly past `waist_number` in `direction`.
fn neighbor_params(
    university: UniversityId,
    gender: &Gender,
    waist_number: i32,
    direction: Direction,
) -> Vec<(&'static str, String)> {
    let (bound, order) = match direction {
        Direction::Next => (format!("gt.{waist_number}"), "waist_number.asc"),
        Direction::Prev => (format!("lt.{waist_number}"), "waist_number.desc"),
    };

    vec![
        ("select", "id,waist_number".to_string()),
        ("university_id", eq(university)),
        ("gender", ilike(gender.as_str())),
        ("is_active", eq(true)),
        ("waist_number", bound),
        ("order", order.to_string()),
        ("limit", "1".to_string()),
    ]
}

fn ticket_usage_body(university: UniversityId, device: DeviceId) -> Value {
    json!({ "univ_id": university, "device_id": device })
}

fn password_body(university: UniversityId, password: &str) -> Value {
    json!({ "univ_id": university, "plain_password": password })
}

#[derive(Deserialize)]
struct IdRow {
    id: CandidateId,
}

#[async_trait]
impl VotingService for SupabaseAdapter {
    async fn list_universities(&self, active_only: bool) -> ServiceResult<Vec<University>> {
        let mut params = vec![("select", "id,name".to_string())];
        active_filter(&mut params, active_only);
        params.push(("order", "name.asc".to_string()));

        self.select("universities", &params).await
    }

    async fn get_university(&self, id: UniversityId) -> ServiceResult<Option<University>> {
        let params = [
            ("select", "id,name".to_string()),
            ("id", eq(id)),
            ("limit", "1".to_string()),
        ];

        let rows: Vec<University> = self.select("universities", &params).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_categories(
        &self,
        university: UniversityId,
        gender: Option<&Gender>,
        active_only: bool,
    ) -> ServiceResult<Vec<Category>> {
        let mut params = vec![
            ("select", "id,university_id,gender,type".to_string()),
            ("university_id", eq(university)),
        ];
        if let Some(gender) = gender {
            params.push(("gender", ilike(gender.as_str())));
        }
        active_filter(&mut params, active_only);

        self.select("categories", &params).await
    }

    async fn list_candidates(
        &self,
        university: UniversityId,
        gender: &Gender,
        active_only: bool,
    ) -> ServiceResult<Vec<Candidate>> {
        let params = candidate_params(university, gender, active_only);
        self.select("candidates", &params).await
    }

    async fn get_candidate(&self, id: CandidateId) -> ServiceResult<Option<Candidate>> {
        let params = [
            ("select", CANDIDATE_COLUMNS.to_string()),
            ("id", eq(id)),
            ("limit", "1".to_string()),
        ];

        let rows: Vec<Candidate> = self.select("candidates", &params).await?;
        Ok(rows.into_iter().next())
    }

    async fn get_candidates(&self, ids: &[CandidateId]) -> ServiceResult<Vec<CandidatePreview>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let params = [
            ("select", "id,name,image_url,gender".to_string()),
            ("id", in_list(ids)),
        ];

        self.select("candidates", &params).await
    }

    async fn find_neighbor(
        &self,
        university: UniversityId,
        gender: &Gender,
        waist_number: i32,
        direction: Direction,
    ) -> ServiceResult<Option<CandidateId>> {
        let params = neighbor_params(university, gender, waist_number, direction);
        let rows: Vec<IdRow> = self.select("candidates", &params).await?;
        Ok(rows.into_iter().next().map(|row| row.id))
    }

    async fn get_device_ticket_usage(
        &self,
        university: UniversityId,
        device: DeviceId,
    ) -> ServiceResult<Vec<TicketUsage>> {
        let usage: Option<Vec<TicketUsage>> = self
            .rpc("get_device_ticket_usage", ticket_usage_body(university, device))
            .await?;

        Ok(usage.unwrap_or_default())
    }

    async fn insert_vote(&self, vote: &NewVote) -> ServiceResult<()> {
        debug!("inserting vote for candidate {}", vote.candidate_id);

        let response = self.insert_vote_request(vote).send().await?;

        check(response).await?;
        Ok(())
    }

    async fn admin_verify_password(
        &self,
        university: UniversityId,
        password: &str,
    ) -> ServiceResult<bool> {
        let verified: Option<bool> = self
            .rpc("admin_verify_password", password_body(university, password))
            .await?;

        Ok(verified.unwrap_or(false))
    }

    async fn get_admin_full_results(
        &self,
        university: UniversityId,
        password: &str,
    ) -> ServiceResult<Vec<AdminResultRow>> {
        let rows: Option<Vec<AdminResultRow>> = self
            .rpc(
                "get_admin_full_results_secure",
                password_body(university, password),
            )
            .await?;

        Ok(rows.unwrap_or_default())
    }

    async fn get_top_results(&self, category_ids: &[CategoryId]) -> ServiceResult<Vec<TopResult>> {
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }

        let params = [
            ("select", "category_id,candidate_id,votes".to_string()),
            ("category_id", in_list(category_ids)),
        ];

        self.select("public_top_results", &params).await
    }
}

use std::borrow::Cow;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::MedMcpError;
use crate::utils::serde::StringOrVec;

const OPENFDA_BASE: &str = "https://api.fda.gov";
const OPENFDA_API: &str = "openfda";
const OPENFDA_BASE_ENV: &str = "MEDMCP_OPENFDA_BASE";

/// FAERS 429s are retried exactly once after this fixed backoff; the other
/// endpoints rely on the middleware retry policy alone.
const FAERS_RETRY_BACKOFF: Duration = Duration::from_secs(1);

const MAX_SEARCH_LIMIT: usize = 100;

pub struct OpenFdaClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
    api_key: Option<String>,
}

impl OpenFdaClient {
    pub fn new() -> Result<Self, MedMcpError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(OPENFDA_BASE, OPENFDA_BASE_ENV),
            api_key: std::env::var("OPENFDA_API_KEY")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(base: String, api_key: Option<String>) -> Result<Self, MedMcpError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
            api_key: api_key
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.as_ref().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) fn escape_query_value(value: &str) -> String {
        crate::utils::query::escape_lucene_value(value)
    }

    fn validate_query(query: &str, limit: usize, example: &str) -> Result<(), MedMcpError> {
        if query.trim().is_empty() {
            return Err(MedMcpError::InvalidArgument(format!(
                "Query is required. Example: {example}"
            )));
        }
        if query.len() > 1024 {
            return Err(MedMcpError::InvalidArgument("Query is too long.".into()));
        }
        if limit == 0 || limit > MAX_SEARCH_LIMIT {
            return Err(MedMcpError::InvalidArgument(format!(
                "limit must be between 1 and {MAX_SEARCH_LIMIT}"
            )));
        }
        Ok(())
    }

    async fn get_json_optional<T: DeserializeOwned>(
        &self,
        req: reqwest_middleware::RequestBuilder,
    ) -> Result<Option<T>, MedMcpError> {
        let resp = crate::sources::apply_cache_mode_with_auth(req, self.api_key.is_some())
            .send()
            .await?;
        Self::decode_optional(resp).await
    }

    async fn decode_optional<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<Option<T>, MedMcpError> {
        let status = resp.status();
        let bytes = crate::sources::read_limited_body(resp, OPENFDA_API).await?;

        if status.as_u16() == 404 {
            return Ok(None);
        }

        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(MedMcpError::Api {
                api: OPENFDA_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| MedMcpError::ApiJson {
                api: OPENFDA_API.to_string(),
                source,
            })
    }

    /// Searches `drug/shortages.json`. 404 means "no matching records", not failure.
    pub async fn shortage_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Option<OpenFdaResponse<DrugShortageResult>>, MedMcpError> {
        let query = query.trim();
        Self::validate_query(query, limit, "medmcp shortage cisplatin")?;

        let url = self.endpoint("drug/shortages.json");
        let mut req = self
            .client
            .get(&url)
            .query(&[("search", query), ("limit", &limit.to_string())]);
        if let Some(key) = self.api_key.as_deref() {
            req = req.query(&[("api_key", key)]);
        }
        self.get_json_optional(req).await
    }

    pub async fn label_search(
        &self,
        drug_name: &str,
    ) -> Result<Option<OpenFdaResponse<DrugLabelResult>>, MedMcpError> {
        let drug_name = drug_name.trim();
        if drug_name.is_empty() {
            return Err(MedMcpError::InvalidArgument(
                "Drug name is required. Example: medmcp label lisinopril".into(),
            ));
        }
        if drug_name.len() > 256 {
            return Err(MedMcpError::InvalidArgument(
                "Drug name is too long.".into(),
            ));
        }

        let escaped = Self::escape_query_value(drug_name);
        let q = format!("openfda.generic_name:\"{escaped}\" OR openfda.brand_name:\"{escaped}\"");
        self.label_field_search(&q).await
    }

    /// Searches `drug/label.json` with a caller-constructed query (used by the
    /// name-conversion strategies that target one field at a time).
    pub async fn label_field_search(
        &self,
        query: &str,
    ) -> Result<Option<OpenFdaResponse<DrugLabelResult>>, MedMcpError> {
        Self::validate_query(query, 5, "medmcp label lisinopril")?;

        let url = self.endpoint("drug/label.json");
        let mut req = self.client.get(&url).query(&[
            ("search", query),
            ("limit", "5"),
            ("sort", "effective_time:desc"),
        ]);
        if let Some(key) = self.api_key.as_deref() {
            req = req.query(&[("api_key", key)]);
        }
        self.get_json_optional(req).await
    }

    pub async fn enforcement_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Option<OpenFdaResponse<EnforcementResult>>, MedMcpError> {
        let query = query.trim();
        Self::validate_query(query, limit, "medmcp recall amoxicillin")?;

        let url = self.endpoint("drug/enforcement.json");
        let mut req = self.client.get(&url).query(&[
            ("search", query),
            ("limit", &limit.to_string()),
            ("sort", "recall_initiation_date:desc"),
        ]);
        if let Some(key) = self.api_key.as_deref() {
            req = req.query(&[("api_key", key)]);
        }
        self.get_json_optional(req).await
    }

    fn faers_request(&self, query: &str, limit: usize) -> reqwest_middleware::RequestBuilder {
        let url = self.endpoint("drug/event.json");
        let mut req = self
            .client
            .get(&url)
            .query(&[("search", query), ("limit", &limit.to_string())]);
        if let Some(key) = self.api_key.as_deref() {
            req = req.query(&[("api_key", key)]);
        }
        req
    }

    /// Searches `drug/event.json` (FAERS). A 429 is retried once after a fixed
    /// backoff; a second 429 surfaces as an API error.
    pub async fn faers_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Option<OpenFdaResponse<FaersEventResult>>, MedMcpError> {
        let query = query.trim();
        Self::validate_query(query, limit, "medmcp adverse-events metformin")?;

        let req = self.faers_request(query, limit);
        let resp = crate::sources::apply_cache_mode_with_auth(req, self.api_key.is_some())
            .send()
            .await?;

        let resp = if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            tokio::time::sleep(FAERS_RETRY_BACKOFF).await;
            let retry = self.faers_request(query, limit);
            crate::sources::apply_cache_mode_with_auth(retry, self.api_key.is_some())
                .send()
                .await?
        } else {
            resp
        };

        Self::decode_optional(resp).await
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenFdaResponse<T> {
    #[allow(dead_code)]
    #[serde(default)]
    pub meta: serde_json::Value,
    #[serde(default)]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrugShortageResult {
    #[serde(default)]
    pub generic_name: Option<String>,
    #[serde(default)]
    pub proprietary_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default)]
    pub shortage_reason: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub dosage_form: Option<String>,
    #[serde(default)]
    pub strength: StringOrVec,
    #[serde(default)]
    pub therapeutic_category: StringOrVec,
    #[serde(default)]
    pub initial_posting_date: Option<String>,
    #[serde(default)]
    pub update_date: Option<String>,
    #[serde(default)]
    pub openfda: Option<ShortageOpenFda>,
}

/// Nested alias block; generic/brand names here often differ from the
/// reported `generic_name`, which is what makes relevance filtering necessary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShortageOpenFda {
    #[serde(default)]
    pub generic_name: StringOrVec,
    #[serde(default)]
    pub brand_name: StringOrVec,
    #[serde(default)]
    pub manufacturer_name: StringOrVec,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnforcementResult {
    pub recall_number: String,
    pub classification: String,
    pub product_description: String,
    pub reason_for_recall: String,
    pub status: String,
    #[serde(default)]
    pub distribution_pattern: Option<String>,
    #[serde(default)]
    pub recall_initiation_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrugLabelResult {
    #[serde(default)]
    pub openfda: Option<LabelOpenFda>,
    #[serde(default)]
    pub indications_and_usage: StringOrVec,
    #[serde(default)]
    pub adverse_reactions: StringOrVec,
    #[serde(default)]
    pub warnings_and_cautions: StringOrVec,
    #[serde(default)]
    pub dosage_and_administration: StringOrVec,
    #[serde(default)]
    pub contraindications: StringOrVec,
    #[serde(default)]
    pub drug_interactions: StringOrVec,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelOpenFda {
    #[serde(default)]
    pub generic_name: StringOrVec,
    #[serde(default)]
    pub brand_name: StringOrVec,
    #[serde(default)]
    pub manufacturer_name: StringOrVec,
    #[serde(default)]
    pub route: StringOrVec,
    #[serde(default)]
    pub dosage_form: StringOrVec,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaersEventResult {
    #[serde(default)]
    pub safetyreportid: Option<String>,
    #[serde(default)]
    pub serious: Option<String>,
    #[serde(default)]
    pub receivedate: Option<String>,
    #[serde(default)]
    pub patient: Option<FaersPatient>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaersPatient {
    #[serde(default)]
    pub reaction: Vec<FaersReaction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaersReaction {
    #[serde(default)]
    pub reactionmeddrapt: Option<String>,
    #[serde(default)]
    pub reactionoutcome: Option<String>,
}

use std::borrow::Cow;

use serde::Deserialize;

use crate::error::MedMcpError;

const RXNAV_BASE: &str = "https://rxnav.nlm.nih.gov/REST";
const RXNAV_API: &str = "rxnav";
const RXNAV_BASE_ENV: &str = "MEDMCP_RXNAV_BASE";

pub struct RxNavClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

impl RxNavClient {
    pub fn new() -> Result<Self, MedMcpError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(RXNAV_BASE, RXNAV_BASE_ENV),
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(base: String) -> Result<Self, MedMcpError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.as_ref().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        req: reqwest_middleware::RequestBuilder,
    ) -> Result<T, MedMcpError> {
        let resp = crate::sources::apply_cache_mode(req).send().await?;
        let status = resp.status();
        let bytes = crate::sources::read_limited_body(resp, RXNAV_API).await?;

        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(MedMcpError::Api {
                api: RXNAV_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }

        serde_json::from_slice(&bytes).map_err(|source| MedMcpError::ApiJson {
            api: RXNAV_API.to_string(),
            source,
        })
    }

    /// Resolves a free-text drug name to its RxNorm concept identifier.
    ///
    /// `search=2` asks RxNav for a normalized match, which tolerates casing
    /// and salt-form noise in user input.
    pub async fn rxcui_by_name(&self, drug_name: &str) -> Result<Option<String>, MedMcpError> {
        let drug_name = drug_name.trim();
        if drug_name.is_empty() {
            return Err(MedMcpError::InvalidArgument(
                "Drug name is required. Example: medmcp interactions warfarin aspirin".into(),
            ));
        }

        let url = self.endpoint("rxcui.json");
        let req = self
            .client
            .get(&url)
            .query(&[("name", drug_name), ("search", "2")]);
        let resp: RxNormIdResponse = self.get_json(req).await?;

        Ok(resp
            .id_group
            .and_then(|group| group.rxnorm_id.into_iter().next())
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty()))
    }

    /// Fetches the active ingredients (TTY=IN) related to an RxCUI.
    pub async fn ingredients(&self, rxcui: &str) -> Result<Vec<String>, MedMcpError> {
        let rxcui = rxcui.trim();
        if rxcui.is_empty() || !rxcui.chars().all(|c| c.is_ascii_digit()) {
            return Err(MedMcpError::InvalidArgument(
                "RxCUI must be a numeric identifier".into(),
            ));
        }

        let url = self.endpoint(&format!("rxcui/{rxcui}/related.json"));
        let req = self.client.get(&url).query(&[("tty", "IN")]);
        let resp: RxNormRelatedResponse = self.get_json(req).await?;

        let mut names: Vec<String> = Vec::new();
        let groups = resp
            .related_group
            .map(|g| g.concept_group)
            .unwrap_or_default();
        for group in groups {
            if group.tty.as_deref() != Some("IN") {
                continue;
            }
            for concept in group.concept_properties {
                let name = concept.name.trim();
                if !name.is_empty() {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }
}

#[derive(Debug, Deserialize)]
struct RxNormIdResponse {
    #[serde(rename = "idGroup")]
    id_group: Option<RxNormIdGroup>,
}

#[derive(Debug, Deserialize)]
struct RxNormIdGroup {
    #[serde(rename = "rxnormId", default)]
    rxnorm_id: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RxNormRelatedResponse {
    #[serde(rename = "relatedGroup")]
    related_group: Option<RxNormRelatedGroup>,
}

#[derive(Debug, Deserialize)]
struct RxNormRelatedGroup {
    #[serde(rename = "conceptGroup", default)]
    concept_group: Vec<RxNormConceptGroup>,
}

#[derive(Debug, Deserialize)]
struct RxNormConceptGroup {
    #[serde(default)]
    tty: Option<String>,
    #[serde(rename = "conceptProperties", default)]
    concept_properties: Vec<RxNormConceptProperty>,
}

#[derive(Debug, Deserialize)]
struct RxNormConceptProperty {
    #[serde(default)]
    name: String,
}

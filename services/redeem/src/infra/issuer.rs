use std::sync::Arc;

use chrono::Utc;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};

use crate::domain::repository::CodeIssuer;
use crate::domain::types::{MintRequest, PendingExport};
use crate::error::IssuerError;
use crate::infra::jwt::IssuerTokenSigner;

const ONE_TIME_CODES_PATH: &str = "/v1/subscriptionOfferCodeOneTimeUseCodes";

/// HTTP client for the issuer's mint + deferred export protocol.
#[derive(Clone)]
pub struct HttpCodeIssuer {
    client: Client,
    signer: Arc<IssuerTokenSigner>,
    base_url: String,
    offer_code_id: String,
}

impl HttpCodeIssuer {
    pub fn new(
        client: Client,
        signer: Arc<IssuerTokenSigner>,
        base_url: &str,
        offer_code_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            signer,
            base_url: base_url.trim_end_matches('/').to_owned(),
            offer_code_id: offer_code_id.into(),
        }
    }

    fn mint_url(&self) -> String {
        format!("{}{ONE_TIME_CODES_PATH}", self.base_url)
    }

    /// Every export link the issuer hands back must live under this prefix.
    pub fn export_prefix(&self) -> String {
        format!("{}{ONE_TIME_CODES_PATH}/", self.base_url)
    }
}

// ── Wire format (JSON:API) ───────────────────────────────────────────────────

#[derive(Serialize)]
struct MintBody<'a> {
    data: MintData<'a>,
}

#[derive(Serialize)]
struct MintData<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    attributes: MintAttributes,
    relationships: MintRelationships<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MintAttributes {
    expiration_date: String,
    number_of_codes: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MintRelationships<'a> {
    offer_code: ResourceLinkage<'a>,
}

#[derive(Serialize)]
struct ResourceLinkage<'a> {
    data: ResourceIdentifier<'a>,
}

#[derive(Serialize)]
struct ResourceIdentifier<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct MintResponse {
    data: MintResponseData,
}

#[derive(Deserialize)]
struct MintResponseData {
    relationships: MintResponseRelationships,
}

#[derive(Deserialize)]
struct MintResponseRelationships {
    values: RelatedLinks,
}

#[derive(Deserialize)]
struct RelatedLinks {
    links: Links,
}

#[derive(Deserialize)]
struct Links {
    related: String,
}

fn mint_body<'a>(request: &MintRequest, offer_code_id: &'a str) -> MintBody<'a> {
    MintBody {
        data: MintData {
            kind: "subscriptionOfferCodeOneTimeUseCodes",
            attributes: MintAttributes {
                expiration_date: request.expiration_date.format("%Y-%m-%d").to_string(),
                number_of_codes: request.number_of_codes,
            },
            relationships: MintRelationships {
                offer_code: ResourceLinkage {
                    data: ResourceIdentifier {
                        id: offer_code_id,
                        kind: "subscriptionOfferCodes",
                    },
                },
            },
        },
    }
}

impl CodeIssuer for HttpCodeIssuer {
    async fn mint(&self, request: &MintRequest) -> Result<PendingExport, IssuerError> {
        let token = self.signer.sign(Utc::now())?;
        let response = self
            .client
            .post(self.mint_url())
            .bearer_auth(token)
            .json(&mint_body(request, &self.offer_code_id))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "issuer rejected mint request");
            return Err(IssuerError::MintRejected(status.as_u16()));
        }

        let text = response.text().await?;
        let parsed: MintResponse =
            serde_json::from_str(&text).map_err(IssuerError::MalformedMintResponse)?;
        PendingExport::new(
            parsed.data.relationships.values.links.related,
            &self.export_prefix(),
        )
    }

    async fn fetch_export(&self, export: &PendingExport) -> Result<String, IssuerError> {
        // fresh token: the mint token may be close to its 60s expiry
        let token = self.signer.sign(Utc::now())?;
        let response = self
            .client
            .get(export.link())
            .bearer_auth(token)
            .header(header::ACCEPT, "text/csv")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "issuer rejected export request");
            return Err(IssuerError::ExportRejected(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

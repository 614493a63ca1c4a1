//! Registry operations.
//!
//! # Data Flow
//! ```text
//! request ──► validate ──► (link check) ──► ContractBinding::prepare ──► TxSubmitter::submit
//!                                        └► ContractBinding::read ──► Project records
//! ```
//!
//! All input validation and call encoding happen before any network I/O, so
//! a bad request never reaches the chain or the profile link.

use std::sync::Arc;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::Address;
use serde_json::Value;
use url::Url;

use crate::blockchain::transaction::TxSubmitter;
use crate::blockchain::types::{ChainError, UnsignedCall};
use crate::contract::binding::ContractBinding;
use crate::contract::types::ContractError;
use crate::registry::builders::{scan_for_client, BuilderIndex};
use crate::registry::error::{RegistryError, RegistryResult};
use crate::registry::hashing::content_hash;
use crate::registry::reachability::LinkChecker;
use crate::registry::types::{
    ClientScan, Project, ProjectSubmission, ReviewSubmission, SubmitProjectRequest, SubmitReviewRequest,
    VerifyOutcome, VerifyUserRequest, WriteOutcome,
};

pub const ADD_PROJECT: &str = "addProject";
pub const GET_ALL_PROJECTS: &str = "getAllProjects";
pub const SUBMIT_REVIEW: &str = "submitReview";
pub const SET_USER_VERIFIED: &str = "setUserVerified";

/// Reason returned when the profile link check fails.
pub const UNREACHABLE_REASON: &str = "profile link unreachable";

/// Comment reference used when a review carries none.
pub const DEFAULT_COMMENT: &str = "No comment";

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Registry gateway service. Constructed once at startup and shared.
pub struct Registry {
    binding: ContractBinding,
    submitter: Option<TxSubmitter>,
    builders: Arc<dyn BuilderIndex>,
    links: Arc<dyn LinkChecker>,
    scan_concurrency: usize,
}

impl Registry {
    /// `submitter` is `None` when no signing key is configured; reads still work.
    pub fn new(
        binding: ContractBinding,
        submitter: Option<TxSubmitter>,
        builders: Arc<dyn BuilderIndex>,
        links: Arc<dyn LinkChecker>,
        scan_concurrency: usize,
    ) -> Self {
        Self {
            binding,
            submitter,
            builders,
            links,
            scan_concurrency,
        }
    }

    pub fn binding(&self) -> &ContractBinding {
        &self.binding
    }

    /// Address writes are signed with, if a signer is configured.
    pub fn signer(&self) -> Option<Address> {
        self.submitter.as_ref().map(TxSubmitter::sender)
    }

    /// Check the profile link, then mark `wallet` verified on-chain.
    ///
    /// A failed link check is a negative result, not an error, and sends nothing.
    pub async fn verify_user(&self, request: VerifyUserRequest) -> RegistryResult<VerifyOutcome> {
        let wallet = parse_address("wallet", required("wallet", request.wallet)?)?;
        let link = parse_link(required("profile_link", request.profile_link)?)?;

        let call = self.binding.prepare(
            SET_USER_VERIFIED,
            vec![DynSolValue::Address(wallet), DynSolValue::Bool(true)],
        )?;
        let submitter = self.submitter()?;

        if let Err(reason) = self.links.check(&link).await {
            tracing::info!(wallet = %wallet, link = %link, %reason, "Profile link check failed");
            return Ok(VerifyOutcome::Rejected {
                reason: UNREACHABLE_REASON.to_string(),
            });
        }

        let outcome = submit(submitter, call).await?;
        Ok(VerifyOutcome::Submitted(outcome))
    }

    pub async fn submit_project(&self, request: SubmitProjectRequest) -> RegistryResult<WriteOutcome> {
        let link = required("link", request.link)?;
        let submission = ProjectSubmission {
            user: parse_address("wallet", required("wallet", request.wallet)?)?,
            client: parse_address("client", required("client", request.client)?)?,
            name: required("name", request.name)?,
            description: request.description.ok_or(RegistryError::MissingField("description"))?,
            languages: required("languages", request.languages)?,
            content_hash: content_hash(&link),
            link,
        };

        let call = self.binding.prepare(ADD_PROJECT, vec![submission.to_contract_input()])?;
        submit(self.submitter()?, call).await
    }

    pub async fn submit_review(&self, request: SubmitReviewRequest) -> RegistryResult<WriteOutcome> {
        let freelancer = parse_address("freelancer", required("freelancer", request.freelancer)?)?;
        let project_index = integer_field(
            "project_index",
            request.project_index.ok_or(RegistryError::MissingField("project_index"))?,
        )?;
        let rating = integer_field("rating", request.rating.ok_or(RegistryError::MissingField("rating"))?)?;
        let rating = u8::try_from(rating)
            .ok()
            .filter(|r| (MIN_RATING..=MAX_RATING).contains(r))
            .ok_or_else(|| {
                RegistryError::InvalidArgument(format!(
                    "rating must be between {} and {}, got {}",
                    MIN_RATING, MAX_RATING, rating
                ))
            })?;

        let review = ReviewSubmission {
            freelancer,
            project_index,
            rating,
            comment_ref: request
                .comment_hash
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_COMMENT.to_string()),
        };

        let call = self.binding.prepare(SUBMIT_REVIEW, review.to_contract_args())?;
        submit(self.submitter()?, call).await
    }

    /// Every project stored under `builder`, in contract order.
    pub async fn get_projects_for_builder(&self, builder: &str) -> RegistryResult<Vec<Project>> {
        let builder = parse_address("builder", builder.to_string())?;
        self.read_projects(builder).await
    }

    /// Projects commissioned by `client`, found by scanning the known builders.
    pub async fn get_projects_for_client(&self, client: &str) -> RegistryResult<ClientScan> {
        let client = parse_address("client", client.to_string())?;
        if !self.binding.is_available() {
            // Surface the load failure instead of skipping every builder.
            self.binding.prepare(GET_ALL_PROJECTS, vec![DynSolValue::Address(client)])?;
        }

        let entries = self
            .builders
            .known_builders()
            .await
            .map_err(RegistryError::BuilderIndex)?;

        tracing::debug!(client = %client, builders = entries.len(), "Scanning builders for client");
        Ok(scan_for_client(entries, client, self.scan_concurrency, |builder| self.read_projects(builder)).await)
    }

    async fn read_projects(&self, builder: Address) -> RegistryResult<Vec<Project>> {
        let mut values = self
            .binding
            .read(GET_ALL_PROJECTS, vec![DynSolValue::Address(builder)])
            .await?;

        let decode_err = |reason: String| {
            RegistryError::Contract(ContractError::Decode {
                function: GET_ALL_PROJECTS.to_string(),
                reason,
            })
        };

        let list = match values.pop() {
            Some(DynSolValue::Array(list)) | Some(DynSolValue::FixedArray(list)) if values.is_empty() => list,
            _ => return Err(decode_err("expected a single array of project tuples".to_string())),
        };

        list.into_iter()
            .map(|entry| match entry {
                DynSolValue::Tuple(fields) => Project::from_tuple(&fields).map_err(decode_err),
                _ => Err(decode_err("project entry is not a tuple".to_string())),
            })
            .collect()
    }

    fn submitter(&self) -> RegistryResult<&TxSubmitter> {
        self.submitter
            .as_ref()
            .ok_or_else(|| ChainError::Signing("signer not configured".to_string()).into())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("binding", &self.binding)
            .field("signer", &self.signer())
            .field("scan_concurrency", &self.scan_concurrency)
            .finish()
    }
}

async fn submit(submitter: &TxSubmitter, call: UnsignedCall) -> RegistryResult<WriteOutcome> {
    Ok(submitter.submit(call).await?.into())
}

/// Present and not blank.
fn required(field: &'static str, value: Option<String>) -> RegistryResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(RegistryError::MissingField(field)),
    }
}

fn parse_address(field: &str, value: String) -> RegistryResult<Address> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|e| RegistryError::InvalidArgument(format!("{} '{}' is not an address: {}", field, value, e)))
}

fn parse_link(value: String) -> RegistryResult<Url> {
    let url = Url::parse(value.trim())
        .map_err(|e| RegistryError::InvalidArgument(format!("profile_link '{}': {}", value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RegistryError::InvalidArgument(format!(
            "profile_link must be http or https, got '{}'",
            other
        ))),
    }
}

/// Non-negative integer given as a JSON number or a numeric string.
fn integer_field(field: &str, value: Value) -> RegistryResult<u64> {
    let parsed = match &value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        RegistryError::InvalidArgument(format!("{} must be a non-negative integer, got {}", field, value))
    })
}

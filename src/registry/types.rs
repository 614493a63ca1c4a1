//! Registry records, requests and outcomes.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

use crate::blockchain::types::SubmissionOutcome;

/// Number of fields in a project tuple returned by `getAllProjects`.
const PROJECT_TUPLE_LEN: usize = 8;

/// One freelance engagement as stored under a freelancer's address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub client: Address,
    pub project_name: String,
    pub description: String,
    pub languages: String,
    pub project_hash: String,
    pub link: String,
    pub verified: bool,
    /// Block time set by the contract at creation.
    pub timestamp: u64,
}

impl Project {
    /// Map a contract tuple positionally:
    /// `(client, projectName, description, languages, projectHash, link, verified, timestamp)`.
    pub fn from_tuple(fields: &[DynSolValue]) -> Result<Self, String> {
        if fields.len() != PROJECT_TUPLE_LEN {
            return Err(format!(
                "project tuple has {} fields, expected {}",
                fields.len(),
                PROJECT_TUPLE_LEN
            ));
        }

        Ok(Self {
            client: fields[0].as_address().ok_or("client is not an address")?,
            project_name: string_field(&fields[1], "projectName")?,
            description: string_field(&fields[2], "description")?,
            languages: string_field(&fields[3], "languages")?,
            project_hash: hash_field(&fields[4])?,
            link: string_field(&fields[5], "link")?,
            verified: fields[6].as_bool().ok_or("verified is not a bool")?,
            timestamp: fields[7]
                .as_uint()
                .map(|(v, _)| v.saturating_to::<u64>())
                .ok_or("timestamp is not an integer")?,
        })
    }
}

fn string_field(value: &DynSolValue, name: &str) -> Result<String, String> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| format!("{} is not a string", name))
}

/// The hash is declared as a string in some deployments and bytes32 in others.
fn hash_field(value: &DynSolValue) -> Result<String, String> {
    match value {
        DynSolValue::String(s) => Ok(s.clone()),
        DynSolValue::FixedBytes(word, size) => Ok(hex::encode(&word[..*size])),
        _ => Err("projectHash is neither string nor bytes".to_string()),
    }
}

/// A project located through the builder scan, addressable for reviews
/// by `(freelancer, index)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectWithOrigin {
    /// Builder-list entry as written (trimmed), not re-checksummed.
    pub freelancer: String,
    /// Position within the freelancer's project list.
    pub index: usize,
    pub project_name: String,
    pub description: String,
    pub languages: String,
    pub link: String,
    pub verified: bool,
}

impl ProjectWithOrigin {
    pub fn new(freelancer: impl Into<String>, index: usize, project: Project) -> Self {
        Self {
            freelancer: freelancer.into(),
            index,
            project_name: project.project_name,
            description: project.description,
            languages: project.languages,
            link: project.link,
            verified: project.verified,
        }
    }
}

/// A builder the client scan could not read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedBuilder {
    pub builder: String,
    pub reason: String,
}

/// Result of a client-keyed lookup.
#[derive(Debug, Clone, Default)]
pub struct ClientScan {
    pub projects: Vec<ProjectWithOrigin>,
    pub skipped: Vec<SkippedBuilder>,
}

/// Validated project submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSubmission {
    pub user: Address,
    pub client: Address,
    pub name: String,
    pub description: String,
    pub languages: String,
    pub content_hash: String,
    pub link: String,
}

impl ProjectSubmission {
    /// Contract struct in declared field order:
    /// `(user, client, projectName, description, languages, projectHash, link)`.
    pub fn to_contract_input(&self) -> DynSolValue {
        DynSolValue::Tuple(vec![
            DynSolValue::Address(self.user),
            DynSolValue::Address(self.client),
            DynSolValue::String(self.name.clone()),
            DynSolValue::String(self.description.clone()),
            DynSolValue::String(self.languages.clone()),
            DynSolValue::String(self.content_hash.clone()),
            DynSolValue::String(self.link.clone()),
        ])
    }
}

/// Validated review submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSubmission {
    pub freelancer: Address,
    pub project_index: u64,
    pub rating: u8,
    pub comment_ref: String,
}

impl ReviewSubmission {
    /// `submitReview(freelancer, index, rating, commentRef)` arguments.
    pub fn to_contract_args(&self) -> Vec<DynSolValue> {
        vec![
            DynSolValue::Address(self.freelancer),
            DynSolValue::Uint(U256::from(self.project_index), 256),
            DynSolValue::Uint(U256::from(self.rating), 8),
            DynSolValue::String(self.comment_ref.clone()),
        ]
    }
}

/// `POST /verify_user` body.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VerifyUserRequest {
    pub wallet: Option<String>,
    pub profile_link: Option<String>,
}

/// `POST /submit_project` body.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubmitProjectRequest {
    pub wallet: Option<String>,
    pub client: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub languages: Option<String>,
    pub link: Option<String>,
}

/// `POST /submit_review` body. Integers may arrive as numbers or numeric strings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubmitReviewRequest {
    pub freelancer: Option<String>,
    pub project_index: Option<serde_json::Value>,
    pub rating: Option<serde_json::Value>,
    pub comment_hash: Option<String>,
}

/// Result of a write operation that reached the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Success { tx_hash: TxHash },
    Reverted { tx_hash: TxHash },
    /// Broadcast but not yet mined; poll again later.
    Unconfirmed { tx_hash: TxHash },
}

impl WriteOutcome {
    pub fn tx_hash(&self) -> TxHash {
        match self {
            WriteOutcome::Success { tx_hash }
            | WriteOutcome::Reverted { tx_hash }
            | WriteOutcome::Unconfirmed { tx_hash } => *tx_hash,
        }
    }
}

impl From<SubmissionOutcome> for WriteOutcome {
    fn from(outcome: SubmissionOutcome) -> Self {
        match outcome {
            SubmissionOutcome::Confirmed(receipt) if receipt.success => WriteOutcome::Success {
                tx_hash: receipt.tx_hash,
            },
            SubmissionOutcome::Confirmed(receipt) => WriteOutcome::Reverted {
                tx_hash: receipt.tx_hash,
            },
            SubmissionOutcome::Unconfirmed { tx_hash } => WriteOutcome::Unconfirmed { tx_hash },
        }
    }
}

/// Result of `verify_user`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// On-chain verification written (or still pending).
    Submitted(WriteOutcome),
    /// The off-chain check failed; nothing was sent to the chain.
    Rejected { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::ReceiptSummary;
    use alloy::primitives::B256;

    fn tuple(client: Address) -> Vec<DynSolValue> {
        vec![
            DynSolValue::Address(client),
            DynSolValue::String("Indexer".into()),
            DynSolValue::String("Event indexer".into()),
            DynSolValue::String("Rust".into()),
            DynSolValue::String("abc123".into()),
            DynSolValue::String("https://github.com/x/indexer".into()),
            DynSolValue::Bool(false),
            DynSolValue::Uint(U256::from(1_700_000_000u64), 256),
        ]
    }

    #[test]
    fn test_project_from_tuple() {
        let client = Address::repeat_byte(0x22);
        let project = Project::from_tuple(&tuple(client)).unwrap();
        assert_eq!(project.client, client);
        assert_eq!(project.project_name, "Indexer");
        assert_eq!(project.project_hash, "abc123");
        assert!(!project.verified);
        assert_eq!(project.timestamp, 1_700_000_000);
    }

    #[test]
    fn test_project_json_field_order() {
        let project = Project::from_tuple(&tuple(Address::ZERO)).unwrap();
        let json = serde_json::to_string(&project).unwrap();

        let keys = [
            "client", "projectName", "description", "languages", "projectHash", "link", "verified",
            "timestamp",
        ];
        let positions: Vec<usize> = keys
            .iter()
            .map(|k| json.find(&format!("\"{}\"", k)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_bytes32_hash_rendered_as_hex() {
        let mut fields = tuple(Address::ZERO);
        fields[4] = DynSolValue::FixedBytes(B256::repeat_byte(0xab), 32);
        let project = Project::from_tuple(&fields).unwrap();
        assert_eq!(project.project_hash, "ab".repeat(32));
    }

    #[test]
    fn test_short_tuple_rejected() {
        let fields = tuple(Address::ZERO);
        assert!(Project::from_tuple(&fields[..7]).is_err());
    }

    #[test]
    fn test_submission_field_order() {
        let submission = ProjectSubmission {
            user: Address::repeat_byte(1),
            client: Address::repeat_byte(2),
            name: "n".into(),
            description: "d".into(),
            languages: "l".into(),
            content_hash: "h".into(),
            link: "k".into(),
        };

        let DynSolValue::Tuple(fields) = submission.to_contract_input() else {
            panic!("expected tuple");
        };
        assert_eq!(
            fields,
            vec![
                DynSolValue::Address(Address::repeat_byte(1)),
                DynSolValue::Address(Address::repeat_byte(2)),
                DynSolValue::String("n".into()),
                DynSolValue::String("d".into()),
                DynSolValue::String("l".into()),
                DynSolValue::String("h".into()),
                DynSolValue::String("k".into()),
            ]
        );
    }

    #[test]
    fn test_write_outcome_from_submission() {
        let hash = TxHash::repeat_byte(9);
        let reverted = SubmissionOutcome::Confirmed(ReceiptSummary {
            tx_hash: hash,
            block_number: Some(1),
            success: false,
            gas_used: 0,
        });
        assert_eq!(WriteOutcome::from(reverted), WriteOutcome::Reverted { tx_hash: hash });
        assert_eq!(
            WriteOutcome::from(SubmissionOutcome::Unconfirmed { tx_hash: hash }),
            WriteOutcome::Unconfirmed { tx_hash: hash }
        );
    }
}

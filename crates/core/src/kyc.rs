//! # KYC Module
//!
//! Identity documents and the rules that derive a user's aggregate KYC status
//! from them.

use crate::user::KycStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    IdFront,
    IdBack,
    ProofAddress,
    Selfie,
}

impl DocumentType {
    /// Every one of these must be on file before review starts.
    pub const REQUIRED: [DocumentType; 4] = [
        DocumentType::IdFront,
        DocumentType::IdBack,
        DocumentType::ProofAddress,
        DocumentType::Selfie,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::IdFront => "id_front",
            DocumentType::IdBack => "id_back",
            DocumentType::ProofAddress => "proof_address",
            DocumentType::Selfie => "selfie",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "id_front" => Some(DocumentType::IdFront),
            "id_back" => Some(DocumentType::IdBack),
            "proof_address" => Some(DocumentType::ProofAddress),
            "selfie" => Some(DocumentType::Selfie),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// An uploaded identity document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KycDocument {
    pub id: String,
    pub user_id: String,
    pub document_type: DocumentType,
    pub file_url: String,
    pub status: KycStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl KycDocument {
    pub fn new(
        id: String,
        user_id: &str,
        document_type: DocumentType,
        file_url: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            document_type,
            file_url: file_url.to_string(),
            status: KycStatus::Pending,
            rejection_reason: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at,
        }
    }

    /// Record an admin decision on this document
    pub fn review(
        &mut self,
        approve: bool,
        reason: Option<String>,
        reviewer_id: &str,
        at: DateTime<Utc>,
    ) {
        if approve {
            self.status = KycStatus::Approved;
            self.rejection_reason = None;
        } else {
            self.status = KycStatus::Rejected;
            self.rejection_reason = reason;
        }
        self.reviewed_by = Some(reviewer_id.to_string());
        self.reviewed_at = Some(at);
    }
}

/// Basic shape check for a document URL.
pub fn is_valid_file_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(rest) => !rest.is_empty() && !rest.starts_with('/') && !rest.contains(char::is_whitespace),
        None => false,
    }
}

// === Aggregation ===

/// Whether every required type has at least one document.
pub fn has_all_required(documents: &[KycDocument]) -> bool {
    let submitted: HashSet<DocumentType> = documents.iter().map(|d| d.document_type).collect();
    DocumentType::REQUIRED.iter().all(|t| submitted.contains(t))
}

/// Required types still missing, in canonical order.
pub fn missing_types(documents: &[KycDocument]) -> Vec<DocumentType> {
    let submitted: HashSet<DocumentType> = documents.iter().map(|d| d.document_type).collect();
    DocumentType::REQUIRED
        .iter()
        .copied()
        .filter(|t| !submitted.contains(t))
        .collect()
}

/// User status after an upload. `documents` includes the new one.
///
/// Returns `None` when the status stays as it is.
pub fn status_after_upload(documents: &[KycDocument]) -> Option<KycStatus> {
    if has_all_required(documents) {
        Some(KycStatus::UnderReview)
    } else {
        None
    }
}

/// User status after a review. `documents` reflects the reviewed document.
///
/// A rejection always moves the user to `Rejected`. An approval moves the
/// user to `Approved` only once every required type is on file and every
/// document on file is approved.
pub fn status_after_review(approved: bool, documents: &[KycDocument]) -> Option<KycStatus> {
    if !approved {
        return Some(KycStatus::Rejected);
    }
    if has_all_required(documents) && documents.iter().all(|d| d.status == KycStatus::Approved) {
        Some(KycStatus::Approved)
    } else {
        None
    }
}

//! KYC operations - document upload and admin review
//!
//! The user's `kyc_status` is recomputed from the document set after every
//! upload and review, in the same transaction as the document write.

use crate::error::{BusinessError, BusinessResult};
use crate::services::{ensure_can_act_on, require_admin, ServiceContext};
use pandaloto_core::kyc::{is_valid_file_url, missing_types, status_after_review, status_after_upload};
use pandaloto_core::{
    AuditAction, AuditLog, DocumentType, EntityType, KycDocument, KycStatus, RequestContext,
};
use pandaloto_persistence::{AuditLogRepo, KycDocumentRepo, UserRepo};
use serde::Serialize;

/// Reason stored when an admin rejects without giving one
pub const DEFAULT_REJECTION_REASON: &str = "Documento ilegível ou inválido";

#[derive(Serialize)]
struct Uploaded {
    document_type: DocumentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    kyc_status: Option<KycStatus>,
}

#[derive(Serialize)]
struct Reviewed<'a> {
    approved: bool,
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kyc_status: Option<KycStatus>,
}

/// KYC Service - document submission and review
pub struct KycService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> KycService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Store a document reference. Once all four required types are on
    /// file, a `pending` user moves to `under_review`.
    pub async fn upload_document(
        &self,
        req: &RequestContext,
        user_id: &str,
        document_type: DocumentType,
        file_url: &str,
    ) -> BusinessResult<KycDocument> {
        ensure_can_act_on(req, user_id)?;

        let file_url = file_url.trim();
        if !is_valid_file_url(file_url) {
            return Err(BusinessError::Validation(format!("invalid file URL: {}", file_url)));
        }

        let now = self.ctx.now();
        let mut tx = self.ctx.pool().begin().await?;

        let user = UserRepo::get_by_id(&mut *tx, user_id).await?;
        let document = KycDocument::new(self.ctx.next_id(), &user.id, document_type, file_url, now);
        KycDocumentRepo::insert(&mut *tx, &document).await?;

        let documents = KycDocumentRepo::list_by_user(&mut *tx, &user.id).await?;
        let new_status = match status_after_upload(&documents) {
            Some(status) if user.kyc_status == KycStatus::Pending => Some(status),
            _ => None,
        };
        if let Some(status) = new_status {
            UserRepo::update_kyc_status(&mut *tx, &user.id, status, now).await?;
        }

        let audit = AuditLog::new(self.ctx.next_id(), AuditAction::KycDocumentUploaded, now)
            .by(req)
            .on(EntityType::KycDocument, &document.id)
            .with_details(&Uploaded {
                document_type,
                kyc_status: new_status,
            });
        AuditLogRepo::insert(&mut *tx, &audit).await?;
        tx.commit().await?;

        tracing::info!(
            user = %user.id,
            document = %document.id,
            document_type = %document_type,
            "KYC document uploaded"
        );
        if let Some(status) = new_status {
            tracing::info!(user = %user.id, kyc = %status, "KYC status changed");
        }
        Ok(document)
    }

    /// Approve or reject one document (admin only).
    ///
    /// A rejection moves the owner to `rejected` at once. An approval moves
    /// the owner to `approved` when every document on file is approved.
    pub async fn review_document(
        &self,
        req: &RequestContext,
        document_id: &str,
        approve: bool,
        reason: Option<String>,
    ) -> BusinessResult<KycDocument> {
        require_admin(req)?;

        let reason = if approve {
            None
        } else {
            Some(reason.unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string()))
        };

        let now = self.ctx.now();
        let mut tx = self.ctx.pool().begin().await?;

        let mut document = KycDocumentRepo::get_by_id(&mut *tx, document_id).await?;
        document.review(approve, reason.clone(), &req.actor_id, now);
        KycDocumentRepo::update_review(&mut *tx, &document).await?;

        let documents = KycDocumentRepo::list_by_user(&mut *tx, &document.user_id).await?;
        let new_status = status_after_review(approve, &documents);
        if let Some(status) = new_status {
            UserRepo::update_kyc_status(&mut *tx, &document.user_id, status, now).await?;
        }

        let action = if approve {
            AuditAction::KycApproved
        } else {
            AuditAction::KycRejected
        };
        let audit = AuditLog::new(self.ctx.next_id(), action, now)
            .by(req)
            .on(EntityType::KycDocument, &document.id)
            .with_details(&Reviewed {
                approved: approve,
                user_id: &document.user_id,
                reason: reason.as_deref(),
                kyc_status: new_status,
            });
        AuditLogRepo::insert(&mut *tx, &audit).await?;
        tx.commit().await?;

        tracing::info!(
            document = %document.id,
            user = %document.user_id,
            approved = approve,
            reviewer = %req.actor_id,
            "KYC document reviewed"
        );
        Ok(document)
    }

    /// Documents of one user in upload order
    pub async fn documents(&self, req: &RequestContext, user_id: &str) -> BusinessResult<Vec<KycDocument>> {
        ensure_can_act_on(req, user_id)?;
        Ok(KycDocumentRepo::list_by_user(self.ctx.pool(), user_id).await?)
    }

    /// Required document types the user has not submitted yet
    pub async fn missing_documents(
        &self,
        req: &RequestContext,
        user_id: &str,
    ) -> BusinessResult<Vec<DocumentType>> {
        let documents = self.documents(req, user_id).await?;
        Ok(missing_types(&documents))
    }

    /// Review queue (admin only), oldest first
    pub async fn pending_documents(&self, req: &RequestContext) -> BusinessResult<Vec<KycDocument>> {
        require_admin(req)?;
        Ok(KycDocumentRepo::list_pending(self.ctx.pool()).await?)
    }
}

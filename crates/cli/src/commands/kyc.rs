//! KYC commands

use anyhow::Result;
use pandaloto_business::KycService;
use pandaloto_persistence::UserRepo;

use crate::db::App;
use crate::KycAction;

pub async fn handle(app: &App, actor: Option<&str>, action: KycAction) -> Result<()> {
    let (me, req) = app.session(actor).await?;
    let kyc = KycService::new(&app.ctx);

    match action {
        KycAction::Upload {
            document_type,
            file_url,
            user,
        } => {
            let target = app.target(&me, user.as_deref()).await?;
            let document = kyc
                .upload_document(&req, &target.id, document_type.to_core(), &file_url)
                .await?;
            println!("📄 Document uploaded: {} ({})", document.document_type, document.id);

            let missing = kyc.missing_documents(&req, &target.id).await?;
            if missing.is_empty() {
                println!("   All required documents are on file");
            } else {
                let names: Vec<String> = missing.iter().map(|d| d.to_string()).collect();
                println!("   Still missing: {}", names.join(", "));
            }
        }

        KycAction::Status { user } => {
            let target = app.target(&me, user.as_deref()).await?;
            let documents = kyc.documents(&req, &target.id).await?;

            println!("🪪 KYC of {}: {}", target.username, target.kyc_status);
            for document in documents {
                print!("   {:<14} {:<13} {}", document.document_type, document.status, document.file_url);
                match &document.rejection_reason {
                    Some(reason) => println!("  ({})", reason),
                    None => println!(),
                }
            }
            let missing = kyc.missing_documents(&req, &target.id).await?;
            for document_type in missing {
                println!("   {:<14} missing", document_type);
            }
        }

        KycAction::Pending => {
            let documents = kyc.pending_documents(&req).await?;
            println!("🕵️  Documents awaiting review ({})", documents.len());
            for document in documents {
                println!(
                    "   {}  user {}  {:<14} {}",
                    document.id, document.user_id, document.document_type, document.file_url
                );
            }
        }

        KycAction::Review {
            document_id,
            approve,
            reject: _,
            reason,
        } => {
            let document = kyc.review_document(&req, &document_id, approve, reason).await?;
            if approve {
                println!("✅ Document approved: {}", document.id);
            } else {
                println!(
                    "❌ Document rejected: {} ({})",
                    document.id,
                    document.rejection_reason.as_deref().unwrap_or_default()
                );
            }
            let owner = UserRepo::get_by_id(app.ctx.pool(), &document.user_id).await?;
            println!("   User {} KYC status: {}", owner.username, owner.kyc_status);
        }
    }

    Ok(())
}

use cutroom_store::StoreClient;
use cutroom_store::models::{
    MemberStatus, Message, MessageKind, NewMessage, ProjectMember, SystemPayload,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ChatError;
use crate::membership::MemberRoster;

#[derive(Debug, Serialize)]
struct JoinRequestArgs {
    request_id: Uuid,
}

/// Join-request moderation. Approval and rejection go through privileged
/// remote procedures — row-level security would reject a direct write — and
/// the roster/permission knowledge here is only the advisory pre-check that
/// decides whether to offer the control at all.
pub struct ModerationService {
    store: StoreClient,
}

impl ModerationService {
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }

    pub async fn approve(
        &self,
        roster: &MemberRoster,
        caller_id: Uuid,
        caller_name: &str,
        request_id: Uuid,
    ) -> Result<ProjectMember, ChatError> {
        self.resolve(
            roster,
            caller_id,
            caller_name,
            request_id,
            MemberStatus::Approved,
            "approve_join_request",
        )
        .await
    }

    pub async fn reject(
        &self,
        roster: &MemberRoster,
        caller_id: Uuid,
        caller_name: &str,
        request_id: Uuid,
    ) -> Result<ProjectMember, ChatError> {
        self.resolve(
            roster,
            caller_id,
            caller_name,
            request_id,
            MemberStatus::Rejected,
            "reject_join_request",
        )
        .await
    }

    async fn resolve(
        &self,
        roster: &MemberRoster,
        caller_id: Uuid,
        caller_name: &str,
        request_id: Uuid,
        target: MemberStatus,
        procedure: &str,
    ) -> Result<ProjectMember, ChatError> {
        if !roster.can_moderate(caller_id) {
            return Err(ChatError::Denied(
                "Only the project owner or an approved member can moderate join requests"
                    .to_string(),
            ));
        }

        let request = roster.find(request_id).ok_or(ChatError::MemberNotFound)?;
        if !request.status.can_transition(target) {
            return Err(ChatError::InvalidTransition {
                from: request.status,
                to: target,
            });
        }

        let resolved: ProjectMember = self
            .store
            .rpc(procedure, &JoinRequestArgs { request_id })
            .await?;
        info!(%request_id, ?target, "Join request resolved");

        // System message visible to all participants. Best-effort: a failure
        // here must not undo the resolution the server already applied.
        let payload = match target {
            MemberStatus::Approved => SystemPayload::JoinApproved {
                actor: caller_name.to_string(),
            },
            _ => SystemPayload::JoinRejected {
                actor: caller_name.to_string(),
            },
        };
        if let Err(e) = self.emit_system_message(roster, caller_id, &payload).await {
            warn!(%e, "Failed to emit moderation system message");
        }

        Ok(resolved)
    }

    async fn emit_system_message(
        &self,
        roster: &MemberRoster,
        sender_id: Uuid,
        payload: &SystemPayload,
    ) -> Result<(), ChatError> {
        let row = NewMessage {
            project_id: roster.project().id,
            sender_id,
            content: serde_json::to_string(payload)
                .map_err(cutroom_store::StoreError::from)?,
            reply_to_id: None,
            attachment_url: None,
            kind: MessageKind::System,
        };
        let _: Message = self.store.insert(Message::TABLE, &row).await?;
        Ok(())
    }
}

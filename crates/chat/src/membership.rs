use cutroom_store::ChangeEvent;
use cutroom_store::models::{MemberRole, MemberStatus, Project, ProjectMember};
use tracing::debug;
use uuid::Uuid;

/// One row of the computed member list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveMember {
    pub account_id: Option<Uuid>,
    /// Guest display name when no account backs the entry.
    pub guest_name: Option<String>,
    pub role: MemberRole,
    pub status: MemberStatus,
    /// Backing membership-table row, when there is one. Owner/editor/client
    /// entries derived purely from project assignments carry `None`.
    pub member_id: Option<Uuid>,
}

/// Maps (project assignments, membership rows, account id) to the account's
/// effective role. The single place precedence lives:
/// owner > editor > client > shared.
pub fn derive_role(
    project: &Project,
    members: &[ProjectMember],
    account_id: Uuid,
) -> Option<MemberRole> {
    if project.owner_id == account_id {
        return Some(MemberRole::Owner);
    }
    if project.editor_id == Some(account_id) {
        return Some(MemberRole::Editor);
    }
    if project.client_id == Some(account_id) {
        return Some(MemberRole::Client);
    }
    members
        .iter()
        .any(|m| {
            m.account_id == Some(account_id)
                && m.status == MemberStatus::Approved
                && m.is_active
        })
        .then_some(MemberRole::Shared)
}

/// True when `account_id` may act on join requests: the project owner or any
/// approved member. Advisory only — the privileged remote procedure is the
/// actual authority.
pub fn can_moderate(project: &Project, members: &[ProjectMember], account_id: Uuid) -> bool {
    derive_role(project, members, account_id).is_some()
}

/// Computes the de-duplicated, role-tagged member list from the project's
/// assignments plus the explicit membership table. Accounts matching several
/// sources keep only their highest-priority role; guest rows have no account
/// to collide on and always render.
pub fn effective_members(project: &Project, members: &[ProjectMember]) -> Vec<EffectiveMember> {
    let mut result: Vec<EffectiveMember> = Vec::new();
    let mut seen: Vec<Uuid> = Vec::new();

    let mut push_assigned = |account_id: Uuid, role: MemberRole, result: &mut Vec<EffectiveMember>, seen: &mut Vec<Uuid>| {
        if seen.contains(&account_id) {
            return;
        }
        seen.push(account_id);
        result.push(EffectiveMember {
            account_id: Some(account_id),
            guest_name: None,
            role,
            status: MemberStatus::Approved,
            member_id: None,
        });
    };

    push_assigned(project.owner_id, MemberRole::Owner, &mut result, &mut seen);
    if let Some(editor) = project.editor_id {
        push_assigned(editor, MemberRole::Editor, &mut result, &mut seen);
    }
    if let Some(client) = project.client_id {
        push_assigned(client, MemberRole::Client, &mut result, &mut seen);
    }

    for member in members {
        if member.status != MemberStatus::Approved || !member.is_active {
            continue;
        }
        match member.account_id {
            Some(account_id) => {
                if seen.contains(&account_id) {
                    continue;
                }
                seen.push(account_id);
                result.push(EffectiveMember {
                    account_id: Some(account_id),
                    guest_name: member.guest_name.clone(),
                    role: MemberRole::Shared,
                    status: member.status,
                    member_id: Some(member.id),
                });
            }
            None => result.push(EffectiveMember {
                account_id: None,
                guest_name: member.guest_name.clone(),
                role: MemberRole::Shared,
                status: member.status,
                member_id: Some(member.id),
            }),
        }
    }

    // Presentation order is role precedence; the stable sort keeps row order
    // within a role.
    result.sort_by_key(|m| m.role.precedence());
    result
}

/// Live view of a conversation's membership: the project assignments plus
/// the membership rows, kept current from the change feed.
#[derive(Debug, Clone)]
pub struct MemberRoster {
    project: Project,
    members: Vec<ProjectMember>,
}

impl MemberRoster {
    pub fn new(project: Project, members: Vec<ProjectMember>) -> Self {
        Self { project, members }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn members(&self) -> &[ProjectMember] {
        &self.members
    }

    pub fn apply(&mut self, event: ChangeEvent<ProjectMember>) {
        match event {
            ChangeEvent::Insert(member) | ChangeEvent::Update(member) => {
                if let Some(existing) = self.members.iter_mut().find(|m| m.id == member.id) {
                    *existing = member;
                } else {
                    self.members.push(member);
                }
            }
            ChangeEvent::Delete { id } => {
                debug!(%id, "Membership row removed");
                self.members.retain(|m| m.id != id);
            }
        }
    }

    pub fn effective(&self) -> Vec<EffectiveMember> {
        effective_members(&self.project, &self.members)
    }

    /// Unresolved join requests.
    pub fn pending(&self) -> Vec<&ProjectMember> {
        self.members
            .iter()
            .filter(|m| m.status == MemberStatus::Pending)
            .collect()
    }

    pub fn find(&self, member_id: Uuid) -> Option<&ProjectMember> {
        self.members.iter().find(|m| m.id == member_id)
    }

    pub fn role_of(&self, account_id: Uuid) -> Option<MemberRole> {
        derive_role(&self.project, &self.members, account_id)
    }

    pub fn can_moderate(&self, account_id: Uuid) -> bool {
        can_moderate(&self.project, &self.members, account_id)
    }
}

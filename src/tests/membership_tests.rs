use crate::core::errors::HuddleError;
use crate::core::models::membership::{ApprovalAction, MembershipStatus, Role};
use crate::tests::{create_test_service, register_test_user};

#[tokio::test]
async fn test_join_auto_approval_group_is_approved_immediately() {
    let _ = env_logger::try_init();
    let service = create_test_service();
    let owner = register_test_user(&service, "Owner", "owner@example.com").await;
    let joiner = register_test_user(&service, "Joiner", "joiner@example.com").await;

    let group = service
        .create_group("Open Group".to_string(), None, true, &owner)
        .await
        .unwrap();

    let membership = service.join_group(&group.slug, &joiner).await.unwrap();
    assert_eq!(membership.status, MembershipStatus::Approved);
    assert_eq!(membership.role, Role::User);

    let profile = service.group_profile(&group.slug, &joiner).await.unwrap();
    assert!(profile.members().iter().any(|m| m.user.id == joiner.id));
}

#[tokio::test]
async fn test_join_gated_group_is_pending() {
    let service = create_test_service();
    let owner = register_test_user(&service, "Owner", "owner@example.com").await;
    let joiner = register_test_user(&service, "Joiner", "joiner@example.com").await;

    let group = service
        .create_group("Gated Group".to_string(), None, false, &owner)
        .await
        .unwrap();

    let membership = service.join_group(&group.slug, &joiner).await.unwrap();
    assert_eq!(membership.status, MembershipStatus::Pending);

    // Not in the approved member list yet
    let profile = service.group_profile(&group.slug, &owner).await.unwrap();
    assert!(!profile.members().iter().any(|m| m.user.id == joiner.id));
}

#[tokio::test]
async fn test_join_rejects_second_row_for_same_pair() {
    let service = create_test_service();
    let owner = register_test_user(&service, "Owner", "owner@example.com").await;
    let joiner = register_test_user(&service, "Joiner", "joiner@example.com").await;

    let group = service
        .create_group("Open Group".to_string(), None, true, &owner)
        .await
        .unwrap();

    service.join_group(&group.slug, &joiner).await.unwrap();
    let result = service.join_group(&group.slug, &joiner).await;
    assert!(matches!(result, Err(HuddleError::AlreadyGroupMember(_))));
}

#[tokio::test]
async fn test_request_join_creates_pending_row_without_token() {
    let service = create_test_service();
    let owner = register_test_user(&service, "Owner", "owner@example.com").await;
    let requester = register_test_user(&service, "Requester", "requester@example.com").await;

    let group = service
        .create_group("My Group".to_string(), None, false, &owner)
        .await
        .unwrap();

    let membership = service.request_join(&group.slug, &requester).await.unwrap();
    assert_eq!(membership.status, MembershipStatus::Pending);
    assert!(membership.token.is_none());
    assert!(membership.token_expire_date.is_none());
    assert_eq!(membership.created_by, requester.id);
}

#[tokio::test]
async fn test_request_join_is_idempotent_rejecting() {
    let service = create_test_service();
    let owner = register_test_user(&service, "Owner", "owner@example.com").await;
    let requester = register_test_user(&service, "Requester", "requester@example.com").await;

    let group = service
        .create_group("My Group".to_string(), None, false, &owner)
        .await
        .unwrap();

    service.request_join(&group.slug, &requester).await.unwrap();
    let result = service.request_join(&group.slug, &requester).await;
    assert!(matches!(result, Err(HuddleError::AlreadyGroupMember(_))));

    // The original request is still pending and untouched
    let profile = service.group_profile(&group.slug, &owner).await.unwrap();
    assert_eq!(profile.pending_requests().len(), 1);
    assert_eq!(profile.pending_requests()[0].id, requester.id);
}

#[tokio::test]
async fn test_admin_approves_join_request() {
    let service = create_test_service();
    let owner = register_test_user(&service, "Owner", "owner@example.com").await;
    let requester = register_test_user(&service, "Requester", "requester@example.com").await;

    let group = service
        .create_group("My Group".to_string(), None, false, &owner)
        .await
        .unwrap();
    service.request_join(&group.slug, &requester).await.unwrap();

    service
        .approve_request(&group.slug, &requester.id, ApprovalAction::Approve, &owner)
        .await
        .unwrap();

    let profile = service.group_profile(&group.slug, &owner).await.unwrap();
    assert!(profile.members().iter().any(|m| m.user.id == requester.id));
    assert!(profile.pending_requests().is_empty());
}

#[tokio::test]
async fn test_admin_rejects_join_request() {
    let service = create_test_service();
    let owner = register_test_user(&service, "Owner", "owner@example.com").await;
    let requester = register_test_user(&service, "Requester", "requester@example.com").await;

    let group = service
        .create_group("My Group".to_string(), None, false, &owner)
        .await
        .unwrap();
    service.request_join(&group.slug, &requester).await.unwrap();

    service
        .approve_request(&group.slug, &requester.id, ApprovalAction::Reject, &owner)
        .await
        .unwrap();

    let profile = service.group_profile(&group.slug, &owner).await.unwrap();
    assert!(!profile.members().iter().any(|m| m.user.id == requester.id));
    // A rejected row still blocks a fresh request
    let result = service.request_join(&group.slug, &requester).await;
    assert!(matches!(result, Err(HuddleError::AlreadyGroupMember(_))));
}

#[tokio::test]
async fn test_approve_request_requires_admin() {
    let service = create_test_service();
    let owner = register_test_user(&service, "Owner", "owner@example.com").await;
    let requester = register_test_user(&service, "Requester", "requester@example.com").await;
    let outsider = register_test_user(&service, "Outsider", "outsider@example.com").await;

    let group = service
        .create_group("My Group".to_string(), None, false, &owner)
        .await
        .unwrap();
    service.request_join(&group.slug, &requester).await.unwrap();

    let result = service
        .approve_request(&group.slug, &requester.id, ApprovalAction::Approve, &outsider)
        .await;
    assert!(matches!(result, Err(HuddleError::NotGroupAdmin(_))));
}

#[tokio::test]
async fn test_approve_request_without_pending_row_is_a_noop() {
    let service = create_test_service();
    let owner = register_test_user(&service, "Owner", "owner@example.com").await;
    let nobody = register_test_user(&service, "Nobody", "nobody@example.com").await;

    let group = service
        .create_group("My Group".to_string(), None, false, &owner)
        .await
        .unwrap();

    service
        .approve_request(&group.slug, &nobody.id, ApprovalAction::Approve, &owner)
        .await
        .unwrap();

    let profile = service.group_profile(&group.slug, &owner).await.unwrap();
    assert!(!profile.members().iter().any(|m| m.user.id == nobody.id));
}

#[tokio::test]
async fn test_invitation_accept_within_window() {
    let service = create_test_service();
    let admin = register_test_user(&service, "Admin", "admin@example.com").await;
    let invitee = register_test_user(&service, "Invitee", "invitee@example.com").await;

    let group = service
        .create_group("Invite Only".to_string(), None, false, &admin)
        .await
        .unwrap();

    let token = service
        .invite_user(&group.slug, "invitee@example.com", 240, &admin)
        .await
        .unwrap();
    assert_eq!(token.len(), 256);

    let joined_group = service.approve_invitation(&token).await.unwrap();
    assert_eq!(joined_group.id, group.id);

    let profile = service.group_profile(&group.slug, &admin).await.unwrap();
    let member = profile.members().iter().find(|m| m.user.id == invitee.id).unwrap();
    assert_eq!(member.status, MembershipStatus::Approved);
    assert_eq!(member.role, Role::User);
}

#[tokio::test]
async fn test_invitation_token_is_single_use() {
    let service = create_test_service();
    let admin = register_test_user(&service, "Admin", "admin@example.com").await;
    let invitee = register_test_user(&service, "Invitee", "invitee@example.com").await;

    let group = service
        .create_group("Invite Only".to_string(), None, false, &admin)
        .await
        .unwrap();
    let token = service
        .invite_user(&group.slug, "invitee@example.com", 240, &admin)
        .await
        .unwrap();

    service.approve_invitation(&token).await.unwrap();
    let result = service.approve_invitation(&token).await;
    assert!(matches!(result, Err(HuddleError::InvitationNotFound)));

    // State unchanged: the invitee is still an approved member
    let profile = service.group_profile(&group.slug, &admin).await.unwrap();
    let member = profile.members().iter().find(|m| m.user.id == invitee.id).unwrap();
    assert_eq!(member.status, MembershipStatus::Approved);
}

#[tokio::test]
async fn test_expired_invitation_cannot_be_accepted() {
    let service = create_test_service();
    let admin = register_test_user(&service, "Admin", "admin@example.com").await;
    register_test_user(&service, "Invitee", "invitee@example.com").await;

    let group = service
        .create_group("Invite Only".to_string(), None, false, &admin)
        .await
        .unwrap();
    // A non-positive expiry window puts the deadline in the past
    let token = service
        .invite_user(&group.slug, "invitee@example.com", -1, &admin)
        .await
        .unwrap();

    let result = service.approve_invitation(&token).await;
    assert!(matches!(result, Err(HuddleError::InvitationNotFound)));
    let result = service.reject_invitation(&token).await;
    assert!(matches!(result, Err(HuddleError::InvitationNotFound)));
}

#[tokio::test]
async fn test_invite_requires_admin() {
    let service = create_test_service();
    let owner = register_test_user(&service, "Owner", "owner@example.com").await;
    let member = register_test_user(&service, "Member", "member@example.com").await;
    register_test_user(&service, "Target", "target@example.com").await;

    let group = service
        .create_group("Invite Only".to_string(), None, true, &owner)
        .await
        .unwrap();
    service.join_group(&group.slug, &member).await.unwrap();

    let result = service.invite_user(&group.slug, "target@example.com", 240, &member).await;
    assert!(matches!(result, Err(HuddleError::NotGroupAdmin(_))));
}

#[tokio::test]
async fn test_invite_supersedes_rejected_membership() {
    let service = create_test_service();
    let admin = register_test_user(&service, "Admin", "admin@example.com").await;
    let requester = register_test_user(&service, "Requester", "requester@example.com").await;

    let group = service
        .create_group("Second Chances".to_string(), None, false, &admin)
        .await
        .unwrap();
    service.request_join(&group.slug, &requester).await.unwrap();
    service
        .approve_request(&group.slug, &requester.id, ApprovalAction::Reject, &admin)
        .await
        .unwrap();

    // The rejected row is replaced by a fresh invitation
    let token = service
        .invite_user(&group.slug, "requester@example.com", 240, &admin)
        .await
        .unwrap();
    service.approve_invitation(&token).await.unwrap();

    let profile = service.group_profile(&group.slug, &admin).await.unwrap();
    assert!(profile.members().iter().any(|m| m.user.id == requester.id));
}

#[tokio::test]
async fn test_reject_invitation_deletes_the_row() {
    let service = create_test_service();
    let admin = register_test_user(&service, "Admin", "admin@example.com").await;
    let invitee = register_test_user(&service, "Invitee", "invitee@example.com").await;

    let group = service
        .create_group("Invite Only".to_string(), None, false, &admin)
        .await
        .unwrap();
    let token = service
        .invite_user(&group.slug, "invitee@example.com", 240, &admin)
        .await
        .unwrap();

    let declined_group = service.reject_invitation(&token).await.unwrap();
    assert_eq!(declined_group.id, group.id);

    // The pair is clear again: a fresh join request goes through
    let membership = service.request_join(&group.slug, &invitee).await.unwrap();
    assert_eq!(membership.status, MembershipStatus::Pending);
}

#[tokio::test]
async fn test_change_role_promotes_and_demotes_members() {
    let service = create_test_service();
    let owner = register_test_user(&service, "Owner", "owner@example.com").await;
    let member = register_test_user(&service, "Member", "member@example.com").await;

    let group = service
        .create_group("Role Play".to_string(), None, true, &owner)
        .await
        .unwrap();
    service.join_group(&group.slug, &member).await.unwrap();

    service.change_role(&group.slug, &member.id, Role::Admin, &owner).await.unwrap();
    let profile = service.group_profile(&group.slug, &owner).await.unwrap();
    let promoted = profile.members().iter().find(|m| m.user.id == member.id).unwrap();
    assert_eq!(promoted.role, Role::Admin);

    // A freshly promoted admin can act
    service.change_role(&group.slug, &member.id, Role::User, &owner).await.unwrap();
    let profile = service.group_profile(&group.slug, &owner).await.unwrap();
    let demoted = profile.members().iter().find(|m| m.user.id == member.id).unwrap();
    assert_eq!(demoted.role, Role::User);
}

#[tokio::test]
async fn test_change_role_on_owner_always_fails() {
    let service = create_test_service();
    let owner = register_test_user(&service, "Owner", "owner@example.com").await;
    let member = register_test_user(&service, "Member", "member@example.com").await;

    let group = service
        .create_group("Protected Owner".to_string(), None, true, &owner)
        .await
        .unwrap();
    service.join_group(&group.slug, &member).await.unwrap();
    service.change_role(&group.slug, &member.id, Role::Admin, &owner).await.unwrap();

    // Neither another admin nor the owner themselves may change it
    let result = service.change_role(&group.slug, &owner.id, Role::User, &member).await;
    assert!(matches!(result, Err(HuddleError::CannotChangeOwnerRole)));
    let result = service.change_role(&group.slug, &owner.id, Role::User, &owner).await;
    assert!(matches!(result, Err(HuddleError::CannotChangeOwnerRole)));
}

#[tokio::test]
async fn test_remove_user_requires_admin() {
    let service = create_test_service();
    let owner = register_test_user(&service, "Owner", "owner@example.com").await;
    let member = register_test_user(&service, "Member", "member@example.com").await;
    let other = register_test_user(&service, "Other", "other@example.com").await;

    let group = service
        .create_group("Bouncers".to_string(), None, true, &owner)
        .await
        .unwrap();
    service.join_group(&group.slug, &member).await.unwrap();
    service.join_group(&group.slug, &other).await.unwrap();

    let result = service.remove_user(&group.slug, &other.id, &member).await;
    assert!(matches!(result, Err(HuddleError::NotGroupAdmin(_))));

    // Nothing was deleted
    let profile = service.group_profile(&group.slug, &owner).await.unwrap();
    assert!(profile.members().iter().any(|m| m.user.id == other.id));
}

#[tokio::test]
async fn test_remove_user_deletes_membership() {
    let service = create_test_service();
    let owner = register_test_user(&service, "Owner", "owner@example.com").await;
    let member = register_test_user(&service, "Member", "member@example.com").await;

    let group = service
        .create_group("Bouncers".to_string(), None, true, &owner)
        .await
        .unwrap();
    service.join_group(&group.slug, &member).await.unwrap();

    service.remove_user(&group.slug, &member.id, &owner).await.unwrap();
    let profile = service.group_profile(&group.slug, &owner).await.unwrap();
    assert!(!profile.members().iter().any(|m| m.user.id == member.id));

    // Removed users can join again
    let membership = service.join_group(&group.slug, &member).await.unwrap();
    assert_eq!(membership.status, MembershipStatus::Approved);
}

#[tokio::test]
async fn test_remove_owner_always_fails() {
    let service = create_test_service();
    let owner = register_test_user(&service, "Owner", "owner@example.com").await;
    let member = register_test_user(&service, "Member", "member@example.com").await;

    let group = service
        .create_group("Bouncers".to_string(), None, true, &owner)
        .await
        .unwrap();
    service.join_group(&group.slug, &member).await.unwrap();
    service.change_role(&group.slug, &member.id, Role::Admin, &owner).await.unwrap();

    let result = service.remove_user(&group.slug, &owner.id, &member).await;
    assert!(matches!(result, Err(HuddleError::CannotRemoveOwner)));
}

#[tokio::test]
async fn test_inviting_the_owner_is_refused() {
    let service = create_test_service();
    let owner = register_test_user(&service, "Owner", "owner@example.com").await;
    let admin = register_test_user(&service, "Admin", "admin@example.com").await;

    let group = service
        .create_group("No Self Invites".to_string(), None, true, &owner)
        .await
        .unwrap();
    service.join_group(&group.slug, &admin).await.unwrap();
    service.change_role(&group.slug, &admin.id, Role::Admin, &owner).await.unwrap();

    let result = service.invite_user(&group.slug, "owner@example.com", 240, &admin).await;
    assert!(matches!(result, Err(HuddleError::CannotChangeOwnerRole)));
}

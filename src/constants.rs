use std::time::Duration;

// Invitation tokens
pub const INVITE_TOKEN_LENGTH: usize = 256;
pub const INVITE_EXPIRY_HOURS: i64 = 240;

// Member-list cache
pub const MEMBERS_CACHE_TTL: Duration = Duration::from_secs(60);

// Audit action names
pub const USER_REGISTERED: &str = "user_registered";
pub const GROUP_CREATED: &str = "group_created";
pub const GROUP_UPDATED: &str = "group_updated";
pub const GROUP_IMAGES_UPDATED: &str = "group_images_updated";
pub const GROUP_JOINED: &str = "group_joined";
pub const JOIN_REQUESTED: &str = "join_requested";
pub const MEMBER_INVITED: &str = "member_invited";
pub const INVITATION_ACCEPTED: &str = "invitation_accepted";
pub const INVITATION_DECLINED: &str = "invitation_declined";
pub const REQUEST_APPROVED: &str = "request_approved";
pub const REQUEST_REJECTED: &str = "request_rejected";
pub const ROLE_CHANGED: &str = "role_changed";
pub const MEMBER_REMOVED: &str = "member_removed";
pub const POST_CREATED: &str = "post_created";
pub const PROFILE_QUERIED: &str = "profile_queried";

mod membership_tests;

use crate::core::models::user::User;
use crate::core::services::HuddleService;
use crate::infrastructure::cache::in_memory::InMemoryCache;
use crate::infrastructure::logging::in_memory::InMemoryLogging;
use crate::infrastructure::storage::in_memory::InMemoryStorage;
use uuid::Uuid;

pub fn create_test_service() -> HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache> {
    let storage = InMemoryStorage::new();
    let logging = InMemoryLogging::new();
    let cache = InMemoryCache::new();
    HuddleService::new(storage, logging, cache, "test-secret".to_string())
}

pub async fn register_test_user(
    service: &HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>,
    name: &str,
    email: &str,
) -> User {
    let user = User {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        password: "password123".to_string(),
    };
    service.register_user(user, None).await.unwrap()
}

//! Authenticated caller context

use uuid::Uuid;

/// The authenticated caller of a request
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: Option<String>,
}

impl AuthContext {
    pub fn new(user_id: Uuid, email: Option<String>) -> Self {
        Self { user_id, email }
    }
}

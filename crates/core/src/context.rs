//! # Request Context
//!
//! Explicit request-scoped identity. Every service operation receives the
//! acting user's context instead of reading a global session.

use crate::user::{Role, User};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub actor_id: String,
    pub role: Role,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new(actor_id: &str, role: Role) -> Self {
        Self {
            actor_id: actor_id.to_string(),
            role,
            ip_address: None,
            user_agent: None,
        }
    }

    /// Context for an authenticated user
    pub fn for_user(user: &User) -> Self {
        Self::new(&user.id, user.role)
    }

    pub fn with_ip(mut self, ip: &str) -> Self {
        self.ip_address = Some(ip.to_string());
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins may act on anyone, users only on themselves
    pub fn can_act_on(&self, user_id: &str) -> bool {
        self.is_admin() || self.actor_id == user_id
    }
}

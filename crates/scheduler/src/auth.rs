//! Session identity and auth-token encoding contracts.

use mapflow_common::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Caller identity a scheduler instance acts under.
pub struct Session {
    /// Tenant the job runs for.
    pub customer: String,
    /// Acting user within the tenant.
    pub userid: String,
}

/// Auth collaborator that encodes a session into an API token.
///
/// The token is sent verbatim in the `Authorization: Token {token}` header
/// of result downloads.
pub trait AuthProvider: Send + Sync {
    /// Encode `session` into an API token.
    fn encode_auth_token(&self, session: &Session) -> Result<String>;
}

use serde::{Deserialize, Serialize};

/// A linked Instagram business account whose metrics this engine caches.
/// The surrounding application owns account management; only the local id
/// and the two remote credentials are used here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Local identifier, used as the cache partition key.
    pub id: i64,
    /// The IG user id on the Graph API side.
    pub ig_user_id: String,
    pub access_token: String,
}

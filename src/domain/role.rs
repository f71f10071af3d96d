use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full administrative access, including credit management
    Admin,
    /// Top-level reseller tier
    Master,
    /// Mid-level reseller tier
    Reseller,
    /// End customer
    Client,
    /// No role assigned (or an unrecognized one)
    Unknown,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Master => "master",
            Role::Reseller => "reseller",
            Role::Client => "client",
            Role::Unknown => "unknown",
        }
    }

    /// Strict parse for user input. Returns None for anything outside the
    /// closed role set.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "master" => Some(Role::Master),
            "reseller" => Some(Role::Reseller),
            "client" => Some(Role::Client),
            "unknown" => Some(Role::Unknown),
            _ => None,
        }
    }

    /// Lenient parse for stored values. Anything unrecognized reads as
    /// `Unknown` rather than failing the lookup.
    pub fn from_stored(s: &str) -> Self {
        Self::from_str(s).unwrap_or(Role::Unknown)
    }

    /// Access gate for credit mutations. This is the single policy point
    /// consulted before any balance change; only admins pass.
    pub fn may_manage_credits(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

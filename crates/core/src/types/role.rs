//! User roles stored on profiles.

use serde::{Deserialize, Serialize};

/// Role of a storefront user.
///
/// Roles come from the `get_user_role` remote procedure. Anything other than
/// `admin` is treated as an ordinary customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Full access to the back-office.
    Admin,
    /// Catalog, cart and checkout only.
    #[default]
    Customer,
}

impl UserRole {
    /// Interpret a role string from the backend, defaulting to customer.
    #[must_use]
    pub fn from_backend(role: Option<&str>) -> Self {
        role.and_then(|r| r.parse().ok()).unwrap_or_default()
    }

    /// Whether this role may use the back-office.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Customer => write!(f, "customer"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" => Ok(Self::Admin),
            "customer" | "user" => Ok(Self::Customer),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        assert_eq!("admin".parse::<UserRole>(), Ok(UserRole::Admin));
        assert_eq!(UserRole::Admin.to_string(), "admin");
        assert_eq!(UserRole::Customer.to_string(), "customer");
    }

    #[test]
    fn test_from_backend_defaults_to_customer() {
        assert_eq!(UserRole::from_backend(None), UserRole::Customer);
        assert_eq!(UserRole::from_backend(Some("owner")), UserRole::Customer);
        assert!(UserRole::from_backend(Some("admin")).is_admin());
    }
}

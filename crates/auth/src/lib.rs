//! `aula-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage. It holds the
//! data-shape access control core (rules, rule matching, field filtering)
//! together with the identity primitives the API layer builds on.

pub mod authorize;
pub mod claims;
pub mod filter;
pub mod jwt;
pub mod matcher;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod rule;
pub mod user;

pub use authorize::{authorize, AuthzError, Principal};
pub use claims::{validate_claims, JwtClaims, TokenKind, TokenValidationError};
pub use filter::{filter_fields, filter_pairs, filtered, is_unrestricted};
pub use jwt::{Hs256JwtCodec, JwtError, JwtIssuer, JwtValidator};
pub use matcher::{concrete_route, match_rule};
pub use password::{hash_password, verify_password, PasswordError};
pub use permissions::{permissions_for_roles, Permission};
pub use roles::{Role, RoleName, RoleSummary, RoleUpdate};
pub use rule::{DataIn, DataOut, HttpMethod, Rule};
pub use user::{NewUser, UserAccount, UserProfile};

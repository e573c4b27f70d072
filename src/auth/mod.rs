//! Authentication: password hashing, JWT, Google sign-in and request extractors.

mod extractor;
pub mod google;
pub mod jwt;
pub mod password;

pub use extractor::{AdminUser, AuthUser};
pub use google::{FederatedIdentity, GoogleTokenVerifier, IdentityVerifier};
pub use jwt::{Claims, JwtConfig, JwtError, JwtService};
pub use password::{generate_reset_token, hash_password, verify_password};

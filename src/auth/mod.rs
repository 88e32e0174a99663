pub mod claims;
pub mod exchange;
pub mod guard;
pub mod middleware;
pub mod resolver;
pub mod token_store;

pub use claims::{Identity, RoleClaim};
pub use exchange::TokenExchangeService;
pub use guard::{AccessDecision, AccessGuard};
pub use middleware::{AdminUser, AuthenticatedUser};
pub use resolver::{ClaimTrust, SessionResolver};
pub use token_store::{SecretKind, TokenSet, TokenStore};

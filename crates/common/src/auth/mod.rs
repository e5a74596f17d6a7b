mod token;

pub use token::{TokenError, TokenIssuer, BEARER_SCHEME};

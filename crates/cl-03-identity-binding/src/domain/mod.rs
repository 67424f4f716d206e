pub mod challenge;
pub mod errors;
pub mod identity;
pub mod token;

pub use challenge::{
    generate_nonce, Challenge, ChallengeStore, DEFAULT_CHALLENGE_TTL_SECS, NONCE_LEN,
};
pub use errors::IdentityError;
pub use identity::Identity;
pub use token::SessionCodec;

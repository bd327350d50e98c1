//! Arithmetic human-verification challenge for the contact form.
//!
//! The answer never leaves the server in clear: the signed token carries
//! `sha256(answer:nonce)`. Only the nonces of solved tokens are remembered,
//! until they expire, so each token is accepted once.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distr::{Alphanumeric, SampleString};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

/// How long an issued challenge stays answerable.
pub const CHALLENGE_TTL_MINUTES: i64 = 10;

const CHALLENGE_PURPOSE: &str = "contact-challenge";

#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    #[error("challenge expired or invalid")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("wrong answer")]
    WrongAnswer,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChallengeClaims {
    purpose: String,
    answer_hash: String,
    nonce: String,
    exp: i64,
    iat: i64,
}

/// Proof that a token was answered correctly. Spend it with [`SolvedChallenges::consume`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolvedChallenge {
    pub nonce: String,
    pub expires_at: i64,
}

/// Nonces of tokens already used, kept until the token itself would expire.
#[derive(Debug, Default)]
pub struct SolvedChallenges {
    nonces: RwLock<HashMap<String, i64>>,
}

impl SolvedChallenges {
    /// `false` when the nonce was already spent.
    pub async fn consume(&self, solved: &SolvedChallenge) -> bool {
        let now = Utc::now().timestamp();
        let mut nonces = self.nonces.write().await;
        nonces.retain(|_, expires_at| *expires_at > now);
        if nonces.contains_key(&solved.nonce) {
            return false;
        }
        nonces.insert(solved.nonce.clone(), solved.expires_at);
        true
    }

    pub async fn tracked(&self) -> usize {
        self.nonces.read().await.len()
    }
}

/// What the client renders: the question and the opaque token to echo back.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub question: String,
    pub token: String,
}

fn answer_hash(answer: i64, nonce: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{answer}:{nonce}").as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Issue a "What is a + b?" challenge.
pub fn issue(secret: &str) -> Result<Challenge, ChallengeError> {
    let mut rng = rand::rng();
    let a: i64 = rng.random_range(1..=10);
    let b: i64 = rng.random_range(1..=10);
    let nonce = Alphanumeric.sample_string(&mut rng, 16);
    issue_for(secret, a, b, nonce)
}

fn issue_for(secret: &str, a: i64, b: i64, nonce: String) -> Result<Challenge, ChallengeError> {
    let now = Utc::now();
    let claims = ChallengeClaims {
        purpose: CHALLENGE_PURPOSE.to_string(),
        answer_hash: answer_hash(a + b, &nonce),
        nonce,
        exp: (now + Duration::minutes(CHALLENGE_TTL_MINUTES)).timestamp(),
        iat: now.timestamp(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(Challenge {
        question: format!("What is {a} + {b}?"),
        token,
    })
}

/// Check `answer` against a token from [`issue`].
pub fn verify(secret: &str, token: &str, answer: &str) -> Result<SolvedChallenge, ChallengeError> {
    let claims = decode::<ChallengeClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?
    .claims;

    if claims.purpose != CHALLENGE_PURPOSE {
        return Err(ChallengeError::WrongAnswer);
    }
    let answer: i64 = answer
        .trim()
        .parse()
        .map_err(|_| ChallengeError::WrongAnswer)?;
    if answer_hash(answer, &claims.nonce) != claims.answer_hash {
        return Err(ChallengeError::WrongAnswer);
    }
    Ok(SolvedChallenge {
        nonce: claims.nonce,
        expires_at: claims.exp,
    })
}

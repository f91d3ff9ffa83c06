//! Upload-token issuance and verification.
//!
//! A token is an HS256 JWT bound to one row in the kind's token table. The
//! signature proves the claims were issued here; the row carries expiry,
//! single-use state and the nonce the claims must echo.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleetdesk_core::constants::{upload_token_ttl, UPLOAD_TOKEN_NONCE_BYTES};
use fleetdesk_core::models::{EntityKind, UploadToken};
use fleetdesk_core::{AppError, Config};
use fleetdesk_db::UploadTokenRepository;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::constants::INVALID_UPLOAD_TOKEN;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadClaims {
    /// Entity id.
    pub sub: String,
    /// Token row id.
    pub tid: String,
    /// Row nonce.
    pub jti: String,
    /// Flow discriminator, `client_upload` or `car_upload`.
    pub typ: String,
    pub iat: i64,
    pub exp: i64,
}

/// What the caller intends to do with the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAccess {
    /// Status polling and completion; a consumed token is still accepted.
    Read,
    /// Document upload; requires an unused token.
    Write,
}

/// Why a presented token was refused. Never shown to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationFailure {
    Malformed,
    BadSignature,
    SignatureExpired,
    WrongFlow,
    UnknownToken,
    EntityMismatch,
    AlreadyUsed,
    RowExpired,
}

impl VerificationFailure {
    pub const ALL: [VerificationFailure; 8] = [
        VerificationFailure::Malformed,
        VerificationFailure::BadSignature,
        VerificationFailure::SignatureExpired,
        VerificationFailure::WrongFlow,
        VerificationFailure::UnknownToken,
        VerificationFailure::EntityMismatch,
        VerificationFailure::AlreadyUsed,
        VerificationFailure::RowExpired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationFailure::Malformed => "malformed",
            VerificationFailure::BadSignature => "bad_signature",
            VerificationFailure::SignatureExpired => "signature_expired",
            VerificationFailure::WrongFlow => "wrong_flow",
            VerificationFailure::UnknownToken => "unknown_token",
            VerificationFailure::EntityMismatch => "entity_mismatch",
            VerificationFailure::AlreadyUsed => "already_used",
            VerificationFailure::RowExpired => "row_expired",
        }
    }
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadTokenError {
    #[error("upload token rejected: {0}")]
    Rejected(VerificationFailure),
    #[error(transparent)]
    App(#[from] AppError),
}

impl UploadTokenError {
    pub fn failure(&self) -> Option<VerificationFailure> {
        match self {
            UploadTokenError::Rejected(reason) => Some(*reason),
            UploadTokenError::App(_) => None,
        }
    }
}

impl From<UploadTokenError> for AppError {
    fn from(err: UploadTokenError) -> Self {
        match err {
            UploadTokenError::Rejected(_) => AppError::Unauthorized(INVALID_UPLOAD_TOKEN.to_string()),
            UploadTokenError::App(app) => app,
        }
    }
}

/// A freshly issued token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct UploadTokenService {
    config: Arc<Config>,
    tokens: Arc<dyn UploadTokenRepository>,
}

impl UploadTokenService {
    pub fn new(config: Arc<Config>, tokens: Arc<dyn UploadTokenRepository>) -> Self {
        Self { config, tokens }
    }

    /// Insert a token row for the entity and sign a credential for it.
    pub async fn issue(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AppError> {
        // Resolve the secret before writing anything.
        self.config.upload_token_secret()?;

        let nonce = hex::encode(rand::random::<[u8; UPLOAD_TOKEN_NONCE_BYTES]>());
        let expires_at = now + upload_token_ttl();
        let row = self
            .tokens
            .create(kind, entity_id, &nonce, expires_at)
            .await?;

        let claims = UploadClaims {
            sub: entity_id.to_string(),
            tid: row.id.to_string(),
            jti: row.nonce.clone(),
            typ: kind.token_type().to_string(),
            iat: now.timestamp(),
            exp: row.expires_at.timestamp(),
        };
        let token = self.sign(&claims)?;

        tracing::info!(
            kind = %kind,
            entity_id = %entity_id,
            token_id = %row.id,
            expires_at = %row.expires_at,
            "Upload token issued"
        );

        Ok(IssuedToken {
            token,
            token_id: row.id,
            expires_at: row.expires_at,
        })
    }

    pub fn sign(&self, claims: &UploadClaims) -> Result<String, AppError> {
        let secret = self.config.upload_token_secret()?;
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign upload token: {}", e)))
    }

    /// Check a presented token for the given flow and access mode.
    pub async fn verify(
        &self,
        kind: EntityKind,
        token: &str,
        access: TokenAccess,
        now: DateTime<Utc>,
    ) -> Result<UploadToken, UploadTokenError> {
        match self.check(kind, token, access, now).await {
            Err(UploadTokenError::Rejected(reason)) => {
                tracing::debug!(
                    kind = %kind,
                    access = ?access,
                    reason = %reason,
                    "Upload token rejected"
                );
                Err(UploadTokenError::Rejected(reason))
            }
            other => other,
        }
    }

    async fn check(
        &self,
        kind: EntityKind,
        token: &str,
        access: TokenAccess,
        now: DateTime<Utc>,
    ) -> Result<UploadToken, UploadTokenError> {
        use VerificationFailure::*;

        let claims = self.decode_claims(token)?;

        if claims.typ != kind.token_type() {
            return Err(UploadTokenError::Rejected(WrongFlow));
        }

        let token_id =
            Uuid::parse_str(&claims.tid).map_err(|_| UploadTokenError::Rejected(Malformed))?;
        let entity_id =
            Uuid::parse_str(&claims.sub).map_err(|_| UploadTokenError::Rejected(Malformed))?;

        let row = self
            .tokens
            .get(kind, token_id)
            .await?
            .ok_or(UploadTokenError::Rejected(UnknownToken))?;

        let nonce_matches: bool = row.nonce.as_bytes().ct_eq(claims.jti.as_bytes()).into();
        if !nonce_matches || row.entity_id != entity_id {
            return Err(UploadTokenError::Rejected(EntityMismatch));
        }

        if access == TokenAccess::Write && row.is_used() {
            return Err(UploadTokenError::Rejected(AlreadyUsed));
        }

        if row.is_expired_at(now) {
            return Err(UploadTokenError::Rejected(RowExpired));
        }

        Ok(row)
    }

    fn decode_claims(&self, token: &str) -> Result<UploadClaims, UploadTokenError> {
        let secret = self.config.upload_token_secret()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<UploadClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::InvalidSignature => VerificationFailure::BadSignature,
                ErrorKind::ExpiredSignature => VerificationFailure::SignatureExpired,
                _ => VerificationFailure::Malformed,
            };
            UploadTokenError::Rejected(reason)
        })
    }

    /// Consume the token. Returns false if it had already been consumed.
    pub async fn mark_used(
        &self,
        kind: EntityKind,
        token_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        self.tokens.mark_used(kind, token_id, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fleetdesk_db::test_helpers::InMemoryStore;

    const SECRET: &str = "unit-test-upload-secret-0123456789abcdef";

    fn service(store: &InMemoryStore, secret: Option<&str>) -> UploadTokenService {
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://localhost/fleetdesk".to_string()),
            "UPLOAD_TOKEN_SECRET" => secret.map(str::to_string),
            _ => None,
        })
        .unwrap();
        UploadTokenService::new(Arc::new(config), Arc::new(store.clone()))
    }

    fn rejected(result: Result<UploadToken, UploadTokenError>) -> VerificationFailure {
        result
            .expect_err("token should be rejected")
            .failure()
            .expect("rejection, not an internal error")
    }

    #[tokio::test]
    async fn test_issue_then_verify() {
        let store = InMemoryStore::new();
        let svc = service(&store, Some(SECRET));
        let car_id = Uuid::new_v4();
        let now = Utc::now();

        let issued = svc.issue(EntityKind::Car, car_id, now).await.unwrap();
        assert_eq!(issued.expires_at, now + upload_token_ttl());

        let row = svc
            .verify(EntityKind::Car, &issued.token, TokenAccess::Write, now)
            .await
            .unwrap();
        assert_eq!(row.id, issued.token_id);
        assert_eq!(row.entity_id, car_id);
        assert_eq!(row.nonce.len(), UPLOAD_TOKEN_NONCE_BYTES * 2);
    }

    #[tokio::test]
    async fn test_discriminator_blocks_cross_flow_replay() {
        let store = InMemoryStore::new();
        let svc = service(&store, Some(SECRET));
        let now = Utc::now();

        let issued = svc.issue(EntityKind::Client, Uuid::new_v4(), now).await.unwrap();
        let reason = rejected(
            svc.verify(EntityKind::Car, &issued.token, TokenAccess::Read, now)
                .await,
        );
        assert_eq!(reason, VerificationFailure::WrongFlow);
    }

    #[tokio::test]
    async fn test_each_failure_reason_is_reachable() {
        let store = InMemoryStore::new();
        let svc = service(&store, Some(SECRET));
        let now = Utc::now();
        let kind = EntityKind::Car;
        let issued = svc.issue(kind, Uuid::new_v4(), now).await.unwrap();
        let row = store_row(&store, kind, issued.token_id).await;

        let mut seen = std::collections::HashSet::new();

        seen.insert(rejected(svc.verify(kind, "not-a-jwt", TokenAccess::Read, now).await));

        let other = service(&store, Some("another-secret-that-is-long-enough-xyz"));
        let forged = other
            .sign(&claims_for(&row, kind, now, now + Duration::minutes(5)))
            .unwrap();
        seen.insert(rejected(svc.verify(kind, &forged, TokenAccess::Read, now).await));

        let stale = svc
            .sign(&claims_for(&row, kind, now, now - Duration::minutes(1)))
            .unwrap();
        seen.insert(rejected(svc.verify(kind, &stale, TokenAccess::Read, now).await));

        seen.insert(rejected(
            svc.verify(EntityKind::Client, &issued.token, TokenAccess::Read, now)
                .await,
        ));

        let mut unknown = claims_for(&row, kind, now, now + Duration::minutes(5));
        unknown.tid = Uuid::new_v4().to_string();
        let unknown = svc.sign(&unknown).unwrap();
        seen.insert(rejected(svc.verify(kind, &unknown, TokenAccess::Read, now).await));

        let mut mismatch = claims_for(&row, kind, now, now + Duration::minutes(5));
        mismatch.jti = "0".repeat(64);
        let mismatch = svc.sign(&mismatch).unwrap();
        seen.insert(rejected(svc.verify(kind, &mismatch, TokenAccess::Read, now).await));

        assert!(svc.mark_used(kind, row.id, now).await.unwrap());
        seen.insert(rejected(
            svc.verify(kind, &issued.token, TokenAccess::Write, now).await,
        ));

        store.set_token_expiry(kind, row.id, now - Duration::seconds(1));
        seen.insert(rejected(
            svc.verify(kind, &issued.token, TokenAccess::Read, now).await,
        ));

        assert_eq!(seen.len(), VerificationFailure::ALL.len());
    }

    #[tokio::test]
    async fn test_used_token_keeps_read_access() {
        let store = InMemoryStore::new();
        let svc = service(&store, Some(SECRET));
        let now = Utc::now();
        let issued = svc.issue(EntityKind::Client, Uuid::new_v4(), now).await.unwrap();

        assert!(svc.mark_used(EntityKind::Client, issued.token_id, now).await.unwrap());
        assert!(!svc.mark_used(EntityKind::Client, issued.token_id, now).await.unwrap());

        assert!(svc
            .verify(EntityKind::Client, &issued.token, TokenAccess::Read, now)
            .await
            .is_ok());
        assert_eq!(
            rejected(
                svc.verify(EntityKind::Client, &issued.token, TokenAccess::Write, now)
                    .await
            ),
            VerificationFailure::AlreadyUsed
        );
    }

    #[tokio::test]
    async fn test_missing_secret_is_configuration_error() {
        let store = InMemoryStore::new();
        let svc = service(&store, None);
        let car_id = Uuid::new_v4();
        let err = svc
            .issue(EntityKind::Car, car_id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert_eq!(store.token_count(EntityKind::Car, car_id), 0);

        let err = svc
            .verify(EntityKind::Car, "x.y.z", TokenAccess::Read, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadTokenError::App(AppError::Configuration(_))));
    }

    async fn store_row(store: &InMemoryStore, kind: EntityKind, id: Uuid) -> UploadToken {
        UploadTokenRepository::get(store, kind, id)
            .await
            .unwrap()
            .unwrap()
    }

    fn claims_for(
        row: &UploadToken,
        kind: EntityKind,
        iat: DateTime<Utc>,
        exp: DateTime<Utc>,
    ) -> UploadClaims {
        UploadClaims {
            sub: row.entity_id.to_string(),
            tid: row.id.to_string(),
            jti: row.nonce.clone(),
            typ: kind.token_type().to_string(),
            iat: iat.timestamp(),
            exp: exp.timestamp(),
        }
    }
}

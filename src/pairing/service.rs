use chrono::NaiveTime;

use crate::auth::roles::{DynRoleLookup, Role};
use crate::pairing::domain::{IssuedCode, LinkOutcome, PairingCode, PairingError};
use crate::pairing::repository::DynPairingRepository;

/// Attempts before giving up on finding a code no other user holds.
const MAX_GENERATE_ATTEMPTS: usize = 32;

/// Coordinates code issue and verification over the repository and role lookup.
#[derive(Clone)]
pub struct PairingService {
    repo: DynPairingRepository,
    roles: DynRoleLookup,
}

impl PairingService {
    pub fn new(repo: DynPairingRepository, roles: DynRoleLookup) -> Self {
        Self { repo, roles }
    }

    /// Issue a fresh code for `user_id`, invalidating any earlier one.
    pub async fn generate_code(
        &self,
        user_id: i64,
        now: NaiveTime,
    ) -> Result<IssuedCode, PairingError> {
        self.generate_with(user_id, now, PairingCode::generate).await
    }

    async fn generate_with(
        &self,
        user_id: i64,
        now: NaiveTime,
        mut next_code: impl FnMut() -> PairingCode + Send,
    ) -> Result<IssuedCode, PairingError> {
        for attempt in 1..=MAX_GENERATE_ATTEMPTS {
            let code = next_code();
            if self.repo.replace_code(user_id, &code, now).await? {
                tracing::info!("Issued pairing code for user {}", user_id);
                return Ok(IssuedCode {
                    code,
                    user_id,
                    time: now,
                });
            }
            tracing::debug!(
                "Pairing code collision for user {} (attempt {})",
                user_id,
                attempt
            );
        }

        tracing::error!(
            "No free pairing code for user {} after {} attempts",
            user_id,
            MAX_GENERATE_ATTEMPTS
        );
        Err(PairingError::CodeSpaceExhausted)
    }

    /// Link the verifying user with the issuer of `code_text`.
    ///
    /// Role is resolved before the code is looked up, so a role-less caller
    /// always gets `RoleNotRecognized`. The code stays valid afterwards.
    pub async fn verify_code(
        &self,
        user_id: i64,
        code_text: &str,
    ) -> Result<LinkOutcome, PairingError> {
        let role = self.roles.role_of(user_id).await?;
        if role == Role::Unknown {
            return Err(PairingError::RoleNotRecognized);
        }

        let code = PairingCode::parse(code_text).ok_or(PairingError::CodeNotFound)?;
        let issued = self
            .repo
            .find_code(&code)
            .await?
            .ok_or(PairingError::CodeNotFound)?;

        let (caregiver_user, recipient_user) = match role {
            Role::Caregiver => (user_id, issued.user_id),
            _ => (issued.user_id, user_id),
        };

        let caregiver_id = self
            .repo
            .caregiver_profile(caregiver_user)
            .await?
            .ok_or(PairingError::CounterpartMissing)?;
        let recipient_id = self
            .repo
            .recipient_profile(recipient_user)
            .await?
            .ok_or(PairingError::CounterpartMissing)?;

        let newly_linked = self.repo.link(caregiver_id, recipient_id).await?;

        tracing::info!(
            "Linked caregiver {} with recipient {} (new: {})",
            caregiver_id,
            recipient_id,
            newly_linked
        );
        if !newly_linked {
            tracing::warn!("Pairing code reused by user {}", user_id);
        }

        Ok(LinkOutcome {
            caregiver_id,
            recipient_id,
            newly_linked,
        })
    }
}

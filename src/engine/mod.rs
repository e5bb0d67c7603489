mod cancel;
mod error;
#[cfg(test)]
mod tests;
mod validate;

pub use cancel::CANCEL_LEAD_MINUTES;
pub use error::EngineError;

use std::sync::Arc;

use tracing::{debug, info};
use ulid::Ulid;

use crate::clock::Clock;
use crate::model::{Machine, NewUser, Requester, Reservation, Role, User};
use crate::observability;
use crate::registry::MachineRegistry;
use crate::store::{ReservationFilter, ReservationStore, UserStore};

/// Which scheduling-key shape this deployment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Weekly {day, slot} bookings (laundry rooms).
    Recurring,
    /// One-off {date, start, end} bookings (printers).
    Dated,
}

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub mode: Mode,
    /// When set, only admins may create accounts.
    pub registration_admin_only: bool,
}

impl EngineConfig {
    pub fn new(mode: Mode) -> EngineConfig {
        EngineConfig {
            mode,
            registration_admin_only: false,
        }
    }
}

/// Decides whether a requested reservation may be created and whether an
/// existing one may be cancelled. Stores and clock are injected; the engine
/// never parses credentials or talks to a transport.
pub struct Engine {
    reservations: Arc<dyn ReservationStore>,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    pub registry: MachineRegistry,
    config: EngineConfig,
}

impl Engine {
    pub fn new(
        reservations: Arc<dyn ReservationStore>,
        users: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Engine {
        Engine {
            reservations,
            users,
            clock,
            registry: MachineRegistry::new(),
            config,
        }
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    // ── Conflict & eligibility ───────────────────────────────

    /// Accept a reservation request or reject it with a reason.
    ///
    /// Checks run in a fixed order: field/domain validation, past-date,
    /// the global fairness rule, then per-machine overlap. The fairness rule
    /// wins over the per-class overlap rule: a user holding any reservation
    /// is rejected before slots are even inspected.
    pub async fn try_reserve(
        &self,
        req: &crate::model::ReserveRequest,
        requester: &Requester,
    ) -> Result<Reservation, EngineError> {
        let result = self.reserve_inner(req, requester).await;
        match &result {
            Ok(reservation) => {
                info!(reservation = %reservation.id, user = %requester.id, "reservation accepted");
                metrics::counter!(observability::RESERVE_DECISIONS_TOTAL, "outcome" => "accepted")
                    .increment(1);
                metrics::gauge!(observability::RESERVATIONS_ACTIVE).increment(1.0);
            }
            Err(e) => {
                debug!(user = %requester.id, "reservation rejected: {e}");
                metrics::counter!(observability::RESERVE_DECISIONS_TOTAL, "outcome" => e.label())
                    .increment(1);
            }
        }
        result
    }

    async fn reserve_inner(
        &self,
        req: &crate::model::ReserveRequest,
        requester: &Requester,
    ) -> Result<Reservation, EngineError> {
        let today = self.clock.now().date_naive();
        let booking = validate::validate_request(self.config.mode, req, today)?;

        // Fairness pre-check: one active reservation per user, globally.
        let existing = self
            .reservations
            .find(&ReservationFilter::owner(requester.id))
            .await?;
        if !existing.is_empty() {
            return Err(EngineError::DuplicateBooking);
        }

        // Overlap pre-check, per targeted machine.
        for machine in booking.machines() {
            let candidates = self
                .reservations
                .find(&ReservationFilter {
                    machine: Some(machine),
                    ..Default::default()
                })
                .await?;
            if candidates.iter().any(|c| c.booking.conflicts_with(&booking)) {
                return Err(EngineError::SlotTaken);
            }
        }

        // Both pre-checks are advisory; the insert below re-checks them in
        // one critical section and its conflict errors are authoritative.
        let reservation = Reservation {
            id: Ulid::new(),
            user_id: requester.id,
            booking,
        };
        let saved = self.reservations.insert(reservation).await?;
        Ok(saved)
    }

    pub async fn list_reservations(&self) -> Result<Vec<Reservation>, EngineError> {
        Ok(self.reservations.find(&ReservationFilter::default()).await?)
    }

    /// Admin bulk-clear of every reservation. Returns the number removed.
    pub async fn clear_all_reservations(&self, requester: &Requester) -> Result<usize, EngineError> {
        if requester.role != Role::Admin {
            return Err(EngineError::PermissionDenied);
        }
        let cleared = self.reservations.delete_all().await?;
        info!(by = %requester.id, "admin cleared {cleared} reservations");
        metrics::gauge!(observability::RESERVATIONS_ACTIVE).set(0.0);
        Ok(cleared)
    }

    // ── Accounts ─────────────────────────────────────────────

    /// Create an account. `requester` is `None` for open self-registration;
    /// deployments with `registration_admin_only` require an admin.
    pub async fn register_user(
        &self,
        new_user: NewUser,
        requester: Option<&Requester>,
    ) -> Result<User, EngineError> {
        if self.config.registration_admin_only
            && requester.map(|r| r.role) != Some(Role::Admin)
        {
            return Err(EngineError::PermissionDenied);
        }
        let username = new_user
            .username
            .ok_or(EngineError::MissingFields("username"))?;
        let email = new_user
            .email
            .ok_or(EngineError::MissingFields("email"))?;
        if username.len() < 3 {
            return Err(EngineError::InvalidValue(
                "username must be at least 3 characters",
            ));
        }
        if !plausible_email(&email) {
            return Err(EngineError::InvalidValue("email"));
        }

        let user = User {
            id: Ulid::new(),
            username,
            email,
            name: new_user.name,
            role: new_user.role,
            reservations: Vec::new(),
        };
        let saved = self.users.insert_user(user).await?;
        info!(user = %saved.id, username = %saved.username, "user registered");
        Ok(saved)
    }

    /// Admin-only account deletion. The user's reservations go first, then
    /// the user row — an explicit two-step cascade rather than a storage
    /// hook, so the ordering is visible here.
    pub async fn delete_user(
        &self,
        user_id: Ulid,
        requester: &Requester,
    ) -> Result<(), EngineError> {
        if requester.role != Role::Admin {
            return Err(EngineError::PermissionDenied);
        }
        if self.users.find_user(user_id).await?.is_none() {
            return Err(EngineError::NotFound(user_id));
        }

        let cascaded = self.reservations.delete_by_owner(user_id).await?;
        self.users.delete_user(user_id).await?;
        info!(user = %user_id, by = %requester.id, "user deleted, {cascaded} reservations cascaded");
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<User>, EngineError> {
        Ok(self.users.list_users().await?)
    }

    // ── Machine registry ─────────────────────────────────────

    pub fn register_machine(
        &self,
        name: &str,
        requester: &Requester,
    ) -> Result<Machine, EngineError> {
        if requester.role != Role::Admin {
            return Err(EngineError::PermissionDenied);
        }
        let name = crate::model::MachineName::parse(name)
            .ok_or(EngineError::InvalidValue("machine"))?;
        let machine = self
            .registry
            .register(name)
            .ok_or(EngineError::AlreadyExists("machine"))?;
        info!(machine = %machine.name, "machine registered");
        Ok(machine)
    }

    pub fn remove_machine(&self, id: Ulid, requester: &Requester) -> Result<Machine, EngineError> {
        if requester.role != Role::Admin {
            return Err(EngineError::PermissionDenied);
        }
        let machine = self.registry.remove(id).ok_or(EngineError::NotFound(id))?;
        info!(machine = %machine.name, "machine removed");
        Ok(machine)
    }

    pub fn list_machines(&self) -> Vec<Machine> {
        self.registry.list()
    }
}

/// Loose plausibility check: something@something.something.
fn plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains(char::is_whitespace) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => {
            !host.is_empty()
                && !tld.is_empty()
                && !domain.contains(char::is_whitespace)
        }
        None => false,
    }
}

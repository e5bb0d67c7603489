use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::{Booking, MachineName, Reservation, User, Weekday};

/// Query shape for `ReservationStore::find`. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    pub owner: Option<Ulid>,
    pub machine: Option<MachineName>,
    pub day: Option<Weekday>,
    pub date: Option<NaiveDate>,
}

impl ReservationFilter {
    pub fn owner(user_id: Ulid) -> ReservationFilter {
        ReservationFilter {
            owner: Some(user_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, reservation: &Reservation) -> bool {
        if let Some(owner) = self.owner {
            if reservation.user_id != owner {
                return false;
            }
        }
        if let Some(machine) = &self.machine {
            if !reservation.booking.targets_machine(machine) {
                return false;
            }
        }
        if let Some(day) = self.day {
            match &reservation.booking {
                Booking::Recurring { day: d, .. } if *d == day => {}
                _ => return false,
            }
        }
        if let Some(date) = self.date {
            match &reservation.booking {
                Booking::Dated { date: d, .. } if *d == date => {}
                _ => return false,
            }
        }
        true
    }
}

#[derive(Debug)]
pub enum StoreError {
    /// The owner already holds an active reservation (fairness uniqueness).
    OwnerConflict,
    /// The machine slot or interval is already held.
    SlotConflict,
    /// A unique key (username, email) is already in use.
    DuplicateKey(&'static str),
    /// The backing store could not be reached.
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::OwnerConflict => write!(f, "owner already has an active reservation"),
            StoreError::SlotConflict => write!(f, "slot already reserved"),
            StoreError::DuplicateKey(key) => write!(f, "{key} must be unique"),
            StoreError::Unavailable(e) => write!(f, "store unavailable: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Durable collection of reservation records.
///
/// `insert` is the authority for the fairness and overlap invariants: it
/// re-checks both under its own critical section, so the engine's pre-checks
/// stay advisory and a racing pair of requests cannot both commit.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn find(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, StoreError>;
    async fn find_by_id(&self, id: Ulid) -> Result<Option<Reservation>, StoreError>;
    async fn insert(&self, reservation: Reservation) -> Result<Reservation, StoreError>;
    async fn delete_by_id(&self, id: Ulid) -> Result<Option<Reservation>, StoreError>;
    async fn delete_by_owner(&self, user_id: Ulid) -> Result<usize, StoreError>;
    async fn delete_all(&self) -> Result<usize, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: Ulid) -> Result<Option<User>, StoreError>;
    /// Enforces username and email uniqueness.
    async fn insert_user(&self, user: User) -> Result<User, StoreError>;
    async fn delete_user(&self, id: Ulid) -> Result<Option<User>, StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
}

#[derive(Default)]
struct Tables {
    reservations: HashMap<Ulid, Reservation>,
    /// Fairness uniqueness index: user -> their single active reservation.
    by_owner: HashMap<Ulid, Ulid>,
    users: HashMap<Ulid, User>,
}

/// In-memory store behind the `ReservationStore`/`UserStore` contracts.
/// One lock over all tables, so an insert commits the reservation row, the
/// owner index and the user's back-reference as a single unit.
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            tables: RwLock::new(Tables::default()),
        }
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn find(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reservations
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Ulid) -> Result<Option<Reservation>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.reservations.get(&id).cloned())
    }

    async fn insert(&self, reservation: Reservation) -> Result<Reservation, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.by_owner.contains_key(&reservation.user_id) {
            return Err(StoreError::OwnerConflict);
        }
        if tables
            .reservations
            .values()
            .any(|existing| existing.booking.conflicts_with(&reservation.booking))
        {
            return Err(StoreError::SlotConflict);
        }

        tables.by_owner.insert(reservation.user_id, reservation.id);
        if let Some(user) = tables.users.get_mut(&reservation.user_id) {
            user.reservations.push(reservation.id);
        }
        tables.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn delete_by_id(&self, id: Ulid) -> Result<Option<Reservation>, StoreError> {
        let mut tables = self.tables.write().await;
        let removed = tables.reservations.remove(&id);
        if let Some(reservation) = &removed {
            tables.by_owner.remove(&reservation.user_id);
            if let Some(user) = tables.users.get_mut(&reservation.user_id) {
                user.reservations.retain(|rid| *rid != id);
            }
        }
        Ok(removed)
    }

    async fn delete_by_owner(&self, user_id: Ulid) -> Result<usize, StoreError> {
        let mut tables = self.tables.write().await;
        let doomed: Vec<Ulid> = tables
            .reservations
            .values()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.id)
            .collect();
        for id in &doomed {
            tables.reservations.remove(id);
        }
        tables.by_owner.remove(&user_id);
        if let Some(user) = tables.users.get_mut(&user_id) {
            user.reservations.retain(|rid| !doomed.contains(rid));
        }
        Ok(doomed.len())
    }

    async fn delete_all(&self) -> Result<usize, StoreError> {
        let mut tables = self.tables.write().await;
        let count = tables.reservations.len();
        tables.reservations.clear();
        tables.by_owner.clear();
        // User rows are left untouched; the back-reference list is
        // informational and goes stale across a sweep.
        Ok(count)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: Ulid) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::DuplicateKey("username"));
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateKey("email"));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: Ulid) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.remove(&id))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }
}

use chrono::{DateTime, Datelike, Duration, FixedOffset, Timelike};
use tracing::{debug, info};
use ulid::Ulid;

use crate::model::{Booking, Requester};
use crate::observability;

use super::{Engine, EngineError};

/// Cancellations with this much lead time or less are refused, so a slot is
/// never vacated moments before it starts.
pub const CANCEL_LEAD_MINUTES: i64 = 30;

/// Minutes from `now` until the booking's resolved start instant. Negative
/// once the start has passed.
///
/// Recurring bookings carry no absolute date; their {day, slot} is always
/// projected onto the current ISO week (Monday-start) in the reference
/// timezone. Cancelling a Monday booking on a Wednesday therefore resolves
/// to a start that already passed.
pub(super) fn lead_minutes(booking: &Booking, now: DateTime<FixedOffset>) -> i64 {
    let start_date = match booking {
        Booking::Recurring { day, .. } => {
            let monday = now.date_naive()
                - Duration::days(now.weekday().num_days_from_monday() as i64);
            monday + Duration::days(day.days_from_monday())
        }
        Booking::Dated { date, .. } => *date,
    };
    let day_diff = start_date
        .signed_duration_since(now.date_naive())
        .num_days();
    let now_minute = now.time().num_seconds_from_midnight() as i64 / 60;
    day_diff * 24 * 60 + booking.start_minute_of_day() - now_minute
}

impl Engine {
    /// The cancellation gate: owner-only, and only with more than
    /// [`CANCEL_LEAD_MINUTES`] of lead before the reservation starts.
    pub async fn try_cancel(&self, id: Ulid, requester: &Requester) -> Result<(), EngineError> {
        let result = self.cancel_inner(id, requester).await;
        match &result {
            Ok(()) => {
                info!(reservation = %id, user = %requester.id, "reservation cancelled");
                metrics::counter!(observability::CANCEL_DECISIONS_TOTAL, "outcome" => "cancelled")
                    .increment(1);
                metrics::gauge!(observability::RESERVATIONS_ACTIVE).decrement(1.0);
            }
            Err(e) => {
                debug!(reservation = %id, user = %requester.id, "cancellation rejected: {e}");
                metrics::counter!(observability::CANCEL_DECISIONS_TOTAL, "outcome" => e.label())
                    .increment(1);
            }
        }
        result
    }

    async fn cancel_inner(&self, id: Ulid, requester: &Requester) -> Result<(), EngineError> {
        let reservation = self
            .reservations
            .find_by_id(id)
            .await?
            .ok_or(EngineError::NotFound(id))?;

        // Owner only — admins go through the bulk clear instead.
        if reservation.user_id != requester.id {
            return Err(EngineError::PermissionDenied);
        }

        let lead = lead_minutes(&reservation.booking, self.clock.now());
        if lead <= CANCEL_LEAD_MINUTES {
            return Err(EngineError::TooLateToCancel { lead_minutes: lead });
        }

        self.reservations.delete_by_id(id).await?;
        Ok(())
    }
}

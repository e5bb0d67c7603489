use chrono::{NaiveDate, NaiveTime};

use crate::model::{Booking, MachineClass, MachineName, ReserveRequest, SlotTime, Weekday};

use super::{EngineError, Mode};

/// Turn a raw transport request into a typed booking, or reject it before
/// the store is ever touched.
///
/// Rejection order: missing fields, then domain validation, then the
/// past-date check (dated mode, day granularity).
pub(super) fn validate_request(
    mode: Mode,
    req: &ReserveRequest,
    today: NaiveDate,
) -> Result<Booking, EngineError> {
    match mode {
        Mode::Recurring => validate_recurring(req),
        Mode::Dated => validate_dated(req, today),
    }
}

fn validate_recurring(req: &ReserveRequest) -> Result<Booking, EngineError> {
    let day = req
        .day
        .as_deref()
        .ok_or(EngineError::MissingFields("day"))?;
    let time = req
        .time
        .as_deref()
        .ok_or(EngineError::MissingFields("time"))?;
    if req.washing_machine.is_none() && req.dryer_machine.is_none() {
        return Err(EngineError::MissingFields(
            "at least one of washingMachine, dryerMachine",
        ));
    }

    let day = Weekday::parse(day).ok_or(EngineError::InvalidValue("day"))?;
    let slot = SlotTime::parse(time).ok_or(EngineError::InvalidValue("time"))?;
    let washer = parse_machine_of_class(
        req.washing_machine.as_deref(),
        MachineClass::Washer,
        "washingMachine",
    )?;
    let dryer = parse_machine_of_class(
        req.dryer_machine.as_deref(),
        MachineClass::Dryer,
        "dryerMachine",
    )?;

    Ok(Booking::Recurring {
        day,
        slot,
        washer,
        dryer,
    })
}

fn validate_dated(req: &ReserveRequest, today: NaiveDate) -> Result<Booking, EngineError> {
    let machine = req
        .machine
        .as_deref()
        .ok_or(EngineError::MissingFields("machine"))?;
    let date = req
        .date
        .as_deref()
        .ok_or(EngineError::MissingFields("date"))?;
    let start = req
        .time_start
        .as_deref()
        .ok_or(EngineError::MissingFields("timeStart"))?;
    let end = req
        .time_end
        .as_deref()
        .ok_or(EngineError::MissingFields("timeEnd"))?;

    let machine = MachineName::parse(machine).ok_or(EngineError::InvalidValue("machine"))?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| EngineError::InvalidValue("date"))?;
    let start = NaiveTime::parse_from_str(start, "%H:%M")
        .map_err(|_| EngineError::InvalidValue("timeStart"))?;
    let end = NaiveTime::parse_from_str(end, "%H:%M")
        .map_err(|_| EngineError::InvalidValue("timeEnd"))?;
    if start >= end {
        return Err(EngineError::InvalidValue("timeStart must be before timeEnd"));
    }

    // Day granularity: a booking later today is fine even if the start time
    // has already passed.
    if date < today {
        return Err(EngineError::PastDate);
    }

    Ok(Booking::Dated {
        machine,
        date,
        start,
        end,
    })
}

fn parse_machine_of_class(
    raw: Option<&str>,
    class: MachineClass,
    field: &'static str,
) -> Result<Option<MachineName>, EngineError> {
    match raw {
        None => Ok(None),
        Some(s) => {
            let name = MachineName::parse(s).ok_or(EngineError::InvalidValue(field))?;
            if name.class != class {
                return Err(EngineError::InvalidValue(field));
            }
            Ok(Some(name))
        }
    }
}

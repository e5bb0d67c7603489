use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Day of week, ISO numbering (Monday=1..Sunday=7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Parse a full English day name. Abbreviations are rejected.
    pub fn parse(s: &str) -> Option<Weekday> {
        match s {
            "Monday" => Some(Weekday::Monday),
            "Tuesday" => Some(Weekday::Tuesday),
            "Wednesday" => Some(Weekday::Wednesday),
            "Thursday" => Some(Weekday::Thursday),
            "Friday" => Some(Weekday::Friday),
            "Saturday" => Some(Weekday::Saturday),
            "Sunday" => Some(Weekday::Sunday),
            _ => None,
        }
    }

    pub fn days_from_monday(self) -> i64 {
        match self {
            Weekday::Monday => 0,
            Weekday::Tuesday => 1,
            Weekday::Wednesday => 2,
            Weekday::Thursday => 3,
            Weekday::Friday => 4,
            Weekday::Saturday => 5,
            Weekday::Sunday => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub const SLOT_FIRST_HOUR: u8 = 8;
pub const SLOT_LAST_HOUR: u8 = 22;

/// One of the fixed hourly booking slots (08:00 through 22:00).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotTime {
    hour: u8,
}

impl SlotTime {
    pub fn new(hour: u8) -> Option<SlotTime> {
        if (SLOT_FIRST_HOUR..=SLOT_LAST_HOUR).contains(&hour) {
            Some(SlotTime { hour })
        } else {
            None
        }
    }

    /// Parse `"8:00"` or `"08:00"`. Only on-the-hour slots in range are valid.
    pub fn parse(s: &str) -> Option<SlotTime> {
        let (h, m) = s.split_once(':')?;
        if m != "00" {
            return None;
        }
        SlotTime::new(h.parse().ok()?)
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    /// Minutes since midnight at the slot's start.
    pub fn minute_of_day(self) -> i64 {
        self.hour as i64 * 60
    }
}

impl std::fmt::Display for SlotTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:00", self.hour)
    }
}

impl TryFrom<String> for SlotTime {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        SlotTime::parse(&s).ok_or_else(|| format!("invalid slot time: {s}"))
    }
}

impl From<SlotTime> for String {
    fn from(t: SlotTime) -> String {
        t.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineClass {
    Washer,
    Dryer,
    Printer,
}

impl MachineClass {
    /// The name prefix each class uses ("Washing 3", "Dryer 1", "Printer3D 2").
    pub fn prefix(self) -> &'static str {
        match self {
            MachineClass::Washer => "Washing",
            MachineClass::Dryer => "Dryer",
            MachineClass::Printer => "Printer3D",
        }
    }
}

/// A machine identity, parsed from its class-specific naming pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MachineName {
    pub class: MachineClass,
    pub number: u32,
}

impl MachineName {
    pub fn new(class: MachineClass, number: u32) -> MachineName {
        MachineName { class, number }
    }

    /// Parse `Washing \d+`, `Dryer \d+` or `Printer3D \d+`. Exactly one space,
    /// no trailing garbage.
    pub fn parse(s: &str) -> Option<MachineName> {
        for class in [MachineClass::Washer, MachineClass::Dryer, MachineClass::Printer] {
            if let Some(rest) = s.strip_prefix(class.prefix()) {
                let digits = rest.strip_prefix(' ')?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                return Some(MachineName {
                    class,
                    number: digits.parse().ok()?,
                });
            }
        }
        None
    }
}

impl std::fmt::Display for MachineName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.class.prefix(), self.number)
    }
}

impl TryFrom<String> for MachineName {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        MachineName::parse(&s).ok_or_else(|| format!("invalid machine name: {s}"))
    }
}

impl From<MachineName> for String {
    fn from(m: MachineName) -> String {
        m.to_string()
    }
}

/// A registered machine in the shared pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub id: Ulid,
    pub name: MachineName,
}

/// The scheduling key of a reservation. Which shape is in use is a
/// deployment-wide choice, not per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Booking {
    /// Recurs conceptually every week at the same slot. At least one machine
    /// is present; washer and dryer occupy their slots independently.
    Recurring {
        day: Weekday,
        slot: SlotTime,
        washer: Option<MachineName>,
        dryer: Option<MachineName>,
    },
    /// One-off half-open interval `[start, end)` on a single calendar date.
    Dated {
        machine: MachineName,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    },
}

impl Booking {
    /// The machines this booking occupies.
    pub fn machines(&self) -> Vec<MachineName> {
        match self {
            Booking::Recurring { washer, dryer, .. } => {
                washer.iter().chain(dryer.iter()).copied().collect()
            }
            Booking::Dated { machine, .. } => vec![*machine],
        }
    }

    pub fn targets_machine(&self, name: &MachineName) -> bool {
        match self {
            Booking::Recurring { washer, dryer, .. } => {
                washer.as_ref() == Some(name) || dryer.as_ref() == Some(name)
            }
            Booking::Dated { machine, .. } => machine == name,
        }
    }

    /// Whether two bookings contend for the same machine time.
    ///
    /// Recurring: same day, same slot, same machine of the same class.
    /// Dated: same machine, same date, intervals overlap. Half-open, so
    /// back-to-back intervals (one ends exactly when the other starts) do
    /// not conflict.
    pub fn conflicts_with(&self, other: &Booking) -> bool {
        match (self, other) {
            (
                Booking::Recurring { day: d1, slot: t1, washer: w1, dryer: r1 },
                Booking::Recurring { day: d2, slot: t2, washer: w2, dryer: r2 },
            ) => {
                if d1 != d2 || t1 != t2 {
                    return false;
                }
                let washer_clash = w1.is_some() && w1 == w2;
                let dryer_clash = r1.is_some() && r1 == r2;
                washer_clash || dryer_clash
            }
            (
                Booking::Dated { machine: m1, date: d1, start: s1, end: e1 },
                Booking::Dated { machine: m2, date: d2, start: s2, end: e2 },
            ) => m1 == m2 && d1 == d2 && s1 < e2 && s2 < e1,
            // Mixed shapes never meet in one deployment.
            _ => false,
        }
    }

    /// Minutes since midnight at which the booking starts.
    pub fn start_minute_of_day(&self) -> i64 {
        match self {
            Booking::Recurring { slot, .. } => slot.minute_of_day(),
            Booking::Dated { start, .. } => start.num_seconds_from_midnight() as i64 / 60,
        }
    }
}

/// An active reservation. Deletion is physical; there is no soft state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Ulid,
    pub user_id: Ulid,
    #[serde(flatten)]
    pub booking: Booking,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// A registered account. The `reservations` list is an informational
/// back-reference only; the Reservation row is the source of truth for
/// ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Ulid,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub reservations: Vec<Ulid>,
}

/// The already-resolved identity the surrounding transport hands us.
/// Credential parsing never happens in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub id: Ulid,
    pub role: Role,
}

/// Raw reservation request as the transport delivers it. Which fields are
/// mandatory depends on the deployment mode; the engine rejects the rest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReserveRequest {
    pub day: Option<String>,
    pub time: Option<String>,
    pub washing_machine: Option<String>,
    pub dryer_machine: Option<String>,
    pub machine: Option<String>,
    pub date: Option<String>,
    pub time_start: Option<String>,
    pub time_end: Option<String>,
}

/// Registration input. Username and email stay optional here so the engine
/// can reject their absence itself; password/credential material stays with
/// the external identity provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Role,
}

use chrono::{DateTime, TimeZone, Utc};
use syncer_core::{Address, AddressId};

/// Midnight UTC on the given day
pub fn utc_date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("invalid test date {year}-{month}-{day}"))
}

/// Fixed instant used as "now" in reconciliation tests
pub fn reference_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 3, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("invalid reference instant"))
}

pub fn address(id: AddressId, street: &str, zip: &str, city: &str) -> Address {
    Address {
        id,
        street: Some(street.to_string()),
        zip: Some(zip.to_string()),
        city: Some(city.to_string()),
    }
}

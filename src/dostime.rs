//! DOS date/time packing for ZIP headers.
//!
//! ZIP records carry modification times as the packed 16-bit MS-DOS
//! date/time pair, expressed in local civil time:
//!
//! - date: `(year - 1980) << 9 | month << 5 | day`
//! - time: `hour << 11 | minute << 5 | second / 2`
//!
//! The 2-second time resolution truncates odd seconds. Years outside the
//! representable 1980..=2107 window clamp to the nearest bound rather
//! than wrapping.

use std::time::SystemTime;

use chrono::{DateTime, Datelike, Local, Timelike};

/// 1980-01-01, the earliest representable DOS date.
const EPOCH_DATE: u16 = 1 << 5 | 1;

/// 2107-12-31 23:59:58, the latest representable DOS date/time.
const MAX_DATE: u16 = 127 << 9 | 12 << 5 | 31;
const MAX_TIME: u16 = 23 << 11 | 59 << 5 | 29;

/// Convert a modification time to the packed `(dos_date, dos_time)` pair
/// using the system's local UTC offset.
pub fn to_dos_date_time(mtime: SystemTime) -> (u16, u16) {
    let local: DateTime<Local> = mtime.into();
    let year = local.year();
    if year < 1980 {
        return (EPOCH_DATE, 0);
    }
    if year > 2107 {
        return (MAX_DATE, MAX_TIME);
    }
    let date = ((year - 1980) as u16) << 9 | (local.month() as u16) << 5 | local.day() as u16;
    let time =
        (local.hour() as u16) << 11 | (local.minute() as u16) << 5 | (local.second() as u16) >> 1;
    (date, time)
}

/// Unpack a DOS date into `(year, month, day)`.
pub fn decode_date(date: u16) -> (u16, u8, u8) {
    let day = (date & 0x1F) as u8;
    let month = ((date >> 5) & 0x0F) as u8;
    let year = (date >> 9) + 1980;
    (year, month, day)
}

/// Unpack a DOS time into `(hour, minute, second)`.
pub fn decode_time(time: u16) -> (u8, u8, u8) {
    let second = ((time & 0x1F) * 2) as u8;
    let minute = ((time >> 5) & 0x3F) as u8;
    let hour = ((time >> 11) & 0x1F) as u8;
    (hour, minute, second)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local_time(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> SystemTime {
        Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap().into()
    }

    #[test]
    fn packs_local_civil_fields() {
        let (date, time) = to_dos_date_time(local_time(2020, 5, 17, 13, 44, 32));
        assert_eq!(decode_date(date), (2020, 5, 17));
        assert_eq!(decode_time(time), (13, 44, 32));
    }

    #[test]
    fn odd_seconds_truncate() {
        let (_, time) = to_dos_date_time(local_time(2020, 5, 17, 13, 44, 33));
        assert_eq!(decode_time(time), (13, 44, 32));
    }

    #[test]
    fn encoding_is_idempotent_over_decoded_values() {
        let (date, time) = to_dos_date_time(local_time(1999, 12, 31, 23, 59, 59));
        let (y, mo, d) = decode_date(date);
        let (h, mi, s) = decode_time(time);
        let (date2, time2) =
            to_dos_date_time(local_time(y as i32, mo as u32, d as u32, h as u32, mi as u32, s as u32));
        assert_eq!((date, time), (date2, time2));
    }

    #[test]
    fn pre_1980_clamps_to_dos_epoch() {
        let (date, time) = to_dos_date_time(local_time(1970, 6, 1, 12, 0, 0));
        assert_eq!(decode_date(date), (1980, 1, 1));
        assert_eq!(decode_time(time), (0, 0, 0));
    }
}

use time::{Date, OffsetDateTime, UtcOffset};

/// The calendar date quota windows are evaluated against. Tenants carry no
/// timezone of their own; a per-deployment offset stands in for it.
pub fn local_today(now: OffsetDateTime, utc_offset_minutes: i32) -> Date {
	let offset = UtcOffset::from_whole_seconds(utc_offset_minutes.saturating_mul(60))
		.unwrap_or(UtcOffset::UTC);

	now.to_offset(offset).date()
}

/// The daily window rolls over once the local date moves past the recorded
/// reset date. A reset date in the future (clock skew) keeps the window
/// closed rather than refilling it.
pub fn daily_window_expired(reset_on: Date, today: Date) -> bool {
	today > reset_on
}

/// The monthly window rolls over when the local date enters a later calendar
/// month than the recorded reset date.
pub fn monthly_window_expired(reset_on: Date, today: Date) -> bool {
	(today.year(), today.month() as u8) > (reset_on.year(), reset_on.month() as u8)
}

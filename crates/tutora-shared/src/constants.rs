/// Application name
pub const APP_NAME: &str = "Tutora";

/// Shortest bookable lesson in minutes
pub const MIN_BOOKING_MINUTES: u32 = 15;

/// Longest bookable lesson in minutes (8 hours)
pub const MAX_BOOKING_MINUTES: u32 = 480;

/// Maximum length of any booking note field
pub const MAX_NOTES_LEN: usize = 500;

/// Maximum length of a review text
pub const MAX_REVIEW_LEN: usize = 1000;

/// Review rating bounds (inclusive)
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Minutes in a day; a booking must end strictly before this
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Default and maximum page sizes for list endpoints
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Number of entries in the popular-subjects ranking
pub const POPULAR_SUBJECTS_LIMIT: u32 = 10;

/// Number of teachers in the admin overview ranking
pub const TOP_TEACHERS_LIMIT: u32 = 5;

/// Window used for "recent registrations" in the admin overview
pub const RECENT_REGISTRATION_DAYS: i64 = 30;

/// Registration rules
pub const MIN_NAME_LEN: usize = 2;
pub const MIN_PASSWORD_LEN: usize = 6;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 5000;

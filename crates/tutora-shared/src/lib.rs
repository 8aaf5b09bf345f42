//! # tutora-shared
//!
//! Domain vocabulary shared by the store, the server and the client:
//! roles, booking statuses and their transitions, wall-clock times of day,
//! booking windows and pagination. Nothing in here performs I/O.

pub mod constants;
pub mod error;
pub mod schedule;
pub mod types;

pub use error::{FieldErrors, ParseEnumError, ValidationError};
pub use schedule::{BookingWindow, TimeOfDay};
pub use types::{BookingStatus, PageInfo, PageRequest, Role};

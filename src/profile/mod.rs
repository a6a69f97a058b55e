//! Arrival rate profiles.
//!
//! A profile is an ordered list of `(time offset, target rate)` points relative
//! to the start of the measurement. Profiles are read from LIMBO-style files on
//! the director and travel to load generators as plain text lines.
mod loader;
mod tuple;


pub use loader::{bucket_request_timestamps, load_profile_file, parse_request_timestamps};
pub use tuple::{ArrivalRateTuple, REQUEST_TIMESTAMP_RATE, format_f64, parse_tuple_line, parse_tuples};

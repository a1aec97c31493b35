//! Conversions from raw field values to typed values.

pub mod date;

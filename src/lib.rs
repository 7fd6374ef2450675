//! Environment-validated service skeleton: typed configuration, leveled
//! logging, and a periodic processing loop that keeps health counters.

pub mod modimpl;

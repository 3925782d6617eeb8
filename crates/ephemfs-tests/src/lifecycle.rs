//! End-to-end lifecycle tests: save, sweep, schedule.

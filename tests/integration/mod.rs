//! Integration tests for the context guard

mod config_integration;

#[cfg(any(feature = "release-tracking", all(feature = "tracking", debug_assertions)))]
mod cross_thread;
#[cfg(any(feature = "release-tracking", all(feature = "tracking", debug_assertions)))]
mod guard_scenarios;

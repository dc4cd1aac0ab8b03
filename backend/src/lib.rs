//! Routine Alarm Backend Library
//!
//! Core of the routine/alarm tracking service:
//! - Routines (habits with a goal, duration or deadline)
//! - Alarms that bundle ordered routines and repeat on weekdays
//! - Execution logs recording how each alarm firing went
//! - Aggregate views (dashboard, per-routine stats, calendar, weekly feedback)

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod schema;
pub mod services;

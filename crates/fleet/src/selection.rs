//! Greedy vehicle / driver matching.

use chrono::NaiveDate;

use wareflow_orders::VehicleClass;

use crate::driver::Driver;
use crate::vehicle::Vehicle;

/// Prefer the first available vehicle of the suggested class, else the first
/// available one of any class.
pub fn select_vehicle(candidates: &[Vehicle], suggested: VehicleClass) -> Option<&Vehicle> {
    let mut available = candidates.iter().filter(|v| v.is_available_for_route());
    let fallback = available.clone().next();
    available.find(|v| v.class == suggested).or(fallback)
}

/// Drivers are interchangeable: first available wins.
pub fn select_driver(candidates: &[Driver], today: NaiveDate) -> Option<&Driver> {
    candidates.iter().find(|d| d.is_available_for_route(today))
}

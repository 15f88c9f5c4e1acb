pub mod history;

pub use history::{MaintenanceEvent, MaintenanceOperation, maintenance_events};

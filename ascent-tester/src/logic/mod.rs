pub mod reports;
pub mod scenarios;
pub mod simulation;
pub mod tester;

pub use scenarios::{all_scenarios, get_scenario};
pub use tester::{ScenarioResult, ScenarioRunner};

pub mod decision;
pub mod health;
pub mod history;
pub mod validator;

pub use decision::DecisionEngine;
pub use health::HealthMonitor;
pub use history::RollingHistory;
pub use validator::Validator;

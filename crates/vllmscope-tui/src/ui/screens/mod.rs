//! Screen implementations

mod inventory;
mod logs;
mod metrics;
mod overview;
mod profiles;
mod settings;

pub use inventory::InventoryScreen;
pub use logs::{LogsScreen, refresh_filtered as refresh_filtered_logs};
pub use metrics::MetricsScreen;
pub use overview::OverviewScreen;
pub use profiles::ProfilesScreen;
pub use settings::SettingsScreen;

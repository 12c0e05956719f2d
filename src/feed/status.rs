use crate::feed::client::ConnectionState;
use crate::traits::StatusDisplay;

/// Status display that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatus;

impl StatusDisplay for LogStatus {
    fn connection_changed(&self, state: ConnectionState) {
        log::info!("live feed {}", state);
    }

    fn label(&self, text: &str) {
        log::info!("recorder status: {}", text);
    }
}

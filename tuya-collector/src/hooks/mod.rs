use tuyaapi::DeviceData;

use crate::{Config, Result};

mod csv_export;
mod plot;

pub use csv_export::CsvExportHook;
pub use plot::{render_chart, PlotHook, Series};

/// Consumer of the device records of one poll.
pub trait Hook {
    fn name(&self) -> &str;

    fn apply(&mut self, devices: &[DeviceData]) -> Result<()>;

    /// Called after the config file was reloaded.
    fn reconfigure(&mut self, _config: &Config) {}
}

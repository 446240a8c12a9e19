use chrono::{DateTime, Utc};
use flume::Sender;
use tuyaapi::{find_device, DeviceData};

use super::Hook;
use crate::config::{Config, DeviceConfig, PlotConfig};
use crate::Result;

const MARKERS: [char; 7] = ['*', '+', 'o', 'x', '#', '@', '%'];
const AXIS_WIDTH: usize = 8;

/// Values of one configured status code over time.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub device_id: String,
    pub label: String,
    pub marker: char,
    pub points: Vec<(DateTime<Utc>, f64)>,
}

struct Snapshot {
    series: Vec<Series>,
    settings: PlotConfig,
}

/// Collects the configured value of each device per poll and redraws a text
/// chart on a background thread.
pub struct PlotHook {
    devices: Vec<DeviceConfig>,
    settings: PlotConfig,
    series: Vec<Series>,
    render_tx: Sender<Snapshot>,
}

impl PlotHook {
    /// Draws to stdout.
    pub fn new(devices: Vec<DeviceConfig>, settings: PlotConfig) -> Self {
        Self::with_output(devices, settings, |chart| println!("{chart}"))
    }

    pub fn with_output(
        devices: Vec<DeviceConfig>,
        settings: PlotConfig,
        mut output: impl FnMut(String) + Send + 'static,
    ) -> Self {
        let (render_tx, render_rx) = flume::unbounded::<Snapshot>();

        let _render_thread = std::thread::spawn(move || {
            while let Ok(mut snapshot) = render_rx.recv() {
                // only the latest state is worth drawing
                while let Ok(newer) = render_rx.try_recv() {
                    snapshot = newer;
                }
                output(render_chart(&snapshot.series, &snapshot.settings));
            }
            debug!("plot thread exiting");
        });

        Self {
            devices,
            settings,
            series: Vec::new(),
            render_tx,
        }
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    fn series_mut(&mut self, device_id: &str) -> &mut Series {
        let index = match self.series.iter().position(|s| s.device_id == device_id) {
            Some(index) => index,
            None => {
                let marker = MARKERS[self.series.len() % MARKERS.len()];
                self.series.push(Series {
                    device_id: device_id.to_string(),
                    label: device_id.to_string(),
                    marker,
                    points: Vec::new(),
                });
                self.series.len() - 1
            }
        };
        &mut self.series[index]
    }

    fn record(&mut self, devices: &[DeviceData]) {
        for DeviceConfig {
            device_id,
            param_name,
        } in self.devices.clone()
        {
            let device = match find_device(devices, &device_id) {
                Some(device) => device,
                None => {
                    warn!("device {device_id} missing from poll result, not plotting it");
                    continue;
                }
            };
            let value = match device.find_status(&param_name).and_then(|s| s.as_f64()) {
                Some(value) => value,
                None => {
                    warn!("device {device_id} has no numeric {param_name:?}, not plotting it");
                    continue;
                }
            };
            let series = self.series_mut(&device_id);
            series.label = device.name.clone();
            series.points.push((device.time, value));
        }
    }
}

impl Hook for PlotHook {
    fn name(&self) -> &str {
        "plot"
    }

    fn apply(&mut self, devices: &[DeviceData]) -> Result<()> {
        self.record(devices);
        let snapshot = Snapshot {
            series: self.series.clone(),
            settings: self.settings.clone(),
        };
        if self.render_tx.send(snapshot).is_err() {
            warn!("plot thread is gone, chart is not updated");
        }
        Ok(())
    }

    /// Recorded values are kept.
    fn reconfigure(&mut self, config: &Config) {
        self.devices = config.devices_config.clone();
        self.settings = config.plot.clone();
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

/// Draws all series into a `width` x `height` character grid. Values outside
/// `y_min..=y_max` are not drawn. The x axis spans the first to the last sample.
pub fn render_chart(series: &[Series], settings: &PlotConfig) -> String {
    let width = settings.width.max(2);
    let height = settings.height.max(2);
    let (y_min, y_max) = (settings.y_min, settings.y_max);

    let times: Vec<DateTime<Utc>> = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(t, _)| *t))
        .collect();
    let (t_min, t_max) = match (times.iter().min(), times.iter().max()) {
        (Some(t_min), Some(t_max)) => (*t_min, *t_max),
        _ => return "(no data yet)\n".to_string(),
    };
    let t_span = (t_max - t_min).num_milliseconds() as f64;

    let mut grid = vec![vec![' '; width]; height];
    for s in series {
        for (t, value) in &s.points {
            if !(y_min..=y_max).contains(value) {
                continue;
            }
            let x = if t_span > 0.0 {
                ((*t - t_min).num_milliseconds() as f64 / t_span * (width - 1) as f64).round()
            } else {
                0.0
            };
            let y = ((y_max - value) / (y_max - y_min) * (height - 1) as f64).round();
            grid[y as usize][x as usize] = s.marker;
        }
    }

    let mut out = String::new();
    for (row, cells) in grid.iter().enumerate() {
        let label = if row == 0 {
            format!("{:>width$.1}", y_max, width = AXIS_WIDTH)
        } else if row == height - 1 {
            format!("{:>width$.1}", y_min, width = AXIS_WIDTH)
        } else {
            " ".repeat(AXIS_WIDTH)
        };
        out.push_str(&format!("{} |{}\n", label, cells.iter().collect::<String>()));
    }
    out.push_str(&format!("{} +{}\n", " ".repeat(AXIS_WIDTH), "-".repeat(width)));

    let first = t_min.format("%H:%M").to_string();
    let last = t_max.format("%H:%M").to_string();
    out.push_str(&format!(
        "{}  {:<gap$}{}\n",
        " ".repeat(AXIS_WIDTH),
        first,
        last,
        gap = width.saturating_sub(last.len())
    ));

    for s in series {
        out.push_str(&format!("  {} {}\n", s.marker, s.label));
    }
    out
}

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use tuyaapi::DeviceData;

use super::Hook;
use crate::Result;

const NAME_PREFIX_LEN: usize = 50;
const FIELD_SEPARATOR: &str = ", ";
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Appends every poll to `<history>/<id> - <name>/<date>.csv`.
#[derive(Debug)]
pub struct CsvExportHook {
    history_dir: PathBuf,
}

impl CsvExportHook {
    pub fn new(history_dir: impl AsRef<Path>) -> Self {
        Self {
            history_dir: history_dir.as_ref().to_path_buf(),
        }
    }

    /// Directory of a device. An existing directory named after the device id
    /// is reused, so renaming a device keeps its history in one place.
    pub fn device_dir(&self, device: &DeviceData) -> Result<PathBuf> {
        if let Some(existing) = self.existing_device_dir(&device.id)? {
            return Ok(existing);
        }
        let path = self
            .history_dir
            .join(format!("{} - {}", device.id, name_prefix(&device.name)));
        fs::create_dir_all(&path)?;
        debug!("created history directory {:?}", path);
        Ok(path)
    }

    fn existing_device_dir(&self, id: &str) -> Result<Option<PathBuf>> {
        if !self.history_dir.is_dir() {
            return Ok(None);
        }
        let mut candidates = Vec::new();
        for entry in fs::read_dir(&self.history_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_device_dir_name(&name, id) && entry.path().is_dir() {
                candidates.push(entry.path());
            }
        }
        candidates.sort();
        Ok(candidates.into_iter().next())
    }

    /// One file per UTC day.
    pub fn log_path(&self, device: &DeviceData) -> Result<PathBuf> {
        let date = device.time.date_naive().format("%Y-%m-%d");
        Ok(self.device_dir(device)?.join(format!("{date}.csv")))
    }

    fn append(&self, device: &DeviceData) -> Result<()> {
        let path = self.log_path(device)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut lines = String::new();
        if file.metadata()?.len() == 0 {
            lines.push_str(&csv_line(header_record(device))?);
        }
        lines.push_str(&csv_line(value_record(device))?);
        file.write_all(lines.as_bytes())?;
        Ok(())
    }
}

impl Hook for CsvExportHook {
    fn name(&self) -> &str {
        "csv"
    }

    fn apply(&mut self, devices: &[DeviceData]) -> Result<()> {
        for device in devices {
            self.append(device)?;
        }
        Ok(())
    }
}

fn header_record(device: &DeviceData) -> Vec<String> {
    std::iter::once("time".to_string())
        .chain(device.status_codes().into_iter().map(ToString::to_string))
        .collect()
}

fn value_record(device: &DeviceData) -> Vec<String> {
    std::iter::once(device.time.format(TIME_FORMAT).to_string())
        .chain(
            device
                .status_map()
                .into_values()
                .map(|status| status.value_string()),
        )
        .collect()
}

fn is_device_dir_name(dir_name: &str, id: &str) -> bool {
    dir_name == id
        || dir_name
            .strip_prefix(id)
            .map_or(false, |rest| rest.starts_with(" - "))
}

/// Fields separated by `", "`, each one quoted by the csv rules if needed.
fn csv_line(fields: Vec<String>) -> Result<String> {
    let escaped = fields
        .iter()
        .map(|field| escape_field(field))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("{}\n", escaped.join(FIELD_SEPARATOR)))
}

fn escape_field(field: &str) -> Result<String> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_field(field)?;
    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// First characters of the device name, usable as part of a file name.
fn name_prefix(name: &str) -> String {
    lazy_static! {
        static ref NOT_IN_FILE_NAMES: Regex = Regex::new(r#"[/\\:*?"<>|\x00-\x1F]"#).unwrap();
    }
    let prefix: String = name.chars().take(NAME_PREFIX_LEN).collect();
    NOT_IN_FILE_NAMES.replace_all(&prefix, "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tuyaapi::DeviceStatus;

    fn device(id: &str, name: &str, day: u32) -> DeviceData {
        DeviceData {
            id: id.to_string(),
            name: name.to_string(),
            status: vec![
                DeviceStatus::new("switch_1", true),
                DeviceStatus::new("cur_power", 1250),
                DeviceStatus::new("mode", "eco, night"),
            ],
            time: Utc.with_ymd_and_hms(2024, 3, day, 12, 30, 5).unwrap(),
        }
    }

    #[test]
    fn writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut hook = CsvExportHook::new(dir.path());

        hook.apply(&[device("bf01", "Plug", 1)]).unwrap();
        hook.apply(&[device("bf01", "Plug", 1)]).unwrap();

        let path = dir.path().join("bf01 - Plug").join("2024-03-01.csv");
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(
            content,
            "time, cur_power, mode, switch_1\n\
             2024-03-01 12:30:05.000000, 1250, \"eco, night\", true\n\
             2024-03-01 12:30:05.000000, 1250, \"eco, night\", true\n"
        );
    }

    #[test]
    fn one_file_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let mut hook = CsvExportHook::new(dir.path());

        hook.apply(&[device("bf01", "Plug", 1), device("bf02", "Lamp", 1)])
            .unwrap();
        hook.apply(&[device("bf01", "Plug", 2)]).unwrap();

        assert!(dir.path().join("bf01 - Plug/2024-03-01.csv").is_file());
        assert!(dir.path().join("bf01 - Plug/2024-03-02.csv").is_file());
        assert!(dir.path().join("bf02 - Lamp/2024-03-01.csv").is_file());

        let second_day = fs::read_to_string(dir.path().join("bf01 - Plug/2024-03-02.csv")).unwrap();
        assert!(second_day.starts_with("time, cur_power, "));
    }

    #[test]
    fn reuses_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("bf01 - Old name")).unwrap();
        let hook = CsvExportHook::new(dir.path());

        let path = hook.log_path(&device("bf01", "New name", 1)).unwrap();
        assert_eq!(path, dir.path().join("bf01 - Old name").join("2024-03-01.csv"));
    }

    #[test]
    fn ignores_directories_of_longer_ids() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("bf012 - Other plug")).unwrap();
        fs::create_dir(dir.path().join("bf01x")).unwrap();
        let hook = CsvExportHook::new(dir.path());

        let path = hook.log_path(&device("bf01", "Plug", 1)).unwrap();
        assert_eq!(path, dir.path().join("bf01 - Plug").join("2024-03-01.csv"));

        fs::create_dir(dir.path().join("bf02")).unwrap();
        let path = hook.log_path(&device("bf02", "Lamp", 1)).unwrap();
        assert_eq!(path, dir.path().join("bf02").join("2024-03-01.csv"));
    }

    #[test]
    fn escapes_fields() {
        let fields = vec!["a", "b, c", "say \"hi\""];
        let line = csv_line(fields.into_iter().map(String::from).collect()).unwrap();
        assert_eq!(line, "a, \"b, c\", \"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn sanitizes_directory_names() {
        assert_eq!(name_prefix("Living room: TV/Hifi"), "Living room_ TV_Hifi");
        let long = "x".repeat(80);
        assert_eq!(name_prefix(&long).len(), NAME_PREFIX_LEN);
    }
}

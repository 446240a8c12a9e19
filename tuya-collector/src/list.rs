use prettytable::{format, Cell, Row, Table};
use tuyaapi::DeviceData;

fn create_table() -> Table {
    let mut table = Table::new();
    let fmt = format::FormatBuilder::new()
        .padding(1, 1)
        .separator(
            format::LinePosition::Title,
            format::LineSeparator::new('-', '+', '+', '+'),
        )
        .column_separator('|')
        .build();
    table.set_format(fmt);
    table
}

/// One row per device with its status values sorted by code.
pub fn device_table(devices: &[DeviceData]) -> Table {
    let mut table = create_table();
    table.set_titles(Row::new(vec![
        Cell::new_align("id", format::Alignment::CENTER),
        Cell::new_align("name", format::Alignment::CENTER),
        Cell::new_align("status", format::Alignment::CENTER),
    ]));

    for device in devices {
        let status = device
            .status_map()
            .into_iter()
            .map(|(code, status)| format!("{}={}", code, status.value_string()))
            .collect::<Vec<_>>()
            .join("\n");
        table.add_row(Row::new(vec![
            Cell::new(&device.id),
            Cell::new(&device.name),
            Cell::new(&status),
        ]));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tuyaapi::DeviceStatus;

    #[test]
    fn lists_devices() {
        let devices = vec![DeviceData {
            id: "bf01".to_string(),
            name: "Boiler plug".to_string(),
            status: vec![
                DeviceStatus::new("switch_1", true),
                DeviceStatus::new("cur_power", 1250),
            ],
            time: Utc::now(),
        }];

        let table = device_table(&devices);
        assert_eq!(table.len(), 1);

        let rendered = table.to_string();
        assert!(rendered.contains("Boiler plug"));
        assert!(rendered.contains("cur_power=1250"));
        assert!(rendered.find("cur_power").unwrap() < rendered.find("switch_1").unwrap());
    }
}

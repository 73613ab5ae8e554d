//! Test data builders for creating model objects without going through XML

use curvescope::types::{
    AxisInfo, ChannelId, CoordSystem, CurveChannel, ElementGroup, FileId, ImportedFile, ValueRow,
    WindowElement, RAW_STATUS_DEACTIVATED,
};
use curvescope::types::map_value_status;

/// Builder for test channels
pub struct ChannelBuilder {
    channel: CurveChannel,
}

impl ChannelBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            channel: CurveChannel {
                id: ChannelId::from(id),
                description: id.to_string(),
                line_thickness: 1.0,
                is_line_visible: true,
                ..Default::default()
            },
        }
    }

    pub fn axes(mut self, x: &str, y: &str) -> Self {
        self.channel.x_axis = AxisInfo {
            name: x.to_string(),
            ..Default::default()
        };
        self.channel.y_axis = AxisInfo {
            name: y.to_string(),
            ..Default::default()
        };
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.channel.description = description.to_string();
        self
    }

    pub fn points(mut self, xs: &[f64], ys: &[f64]) -> Self {
        self.channel.points_x = xs.to_vec();
        self.channel.points_y = ys.to_vec();
        self
    }

    pub fn bounds(mut self, min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        self.channel.coord_system = CoordSystem {
            min_x,
            max_x,
            min_y,
            max_y,
            ..Default::default()
        };
        self
    }

    pub fn window(mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        self.channel.graphics.window_groups.push(ElementGroup {
            items: vec![WindowElement {
                x1,
                y1,
                x2,
                y2,
                ..Default::default()
            }],
            ..Default::default()
        });
        self
    }

    pub fn build(self) -> CurveChannel {
        self.channel
    }
}

/// Builder for test files; channels get the file's id
pub struct FileBuilder {
    file: ImportedFile,
}

impl FileBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            file: ImportedFile {
                id: FileId::from(id),
                filename: format!("{id}.xml"),
                ..Default::default()
            },
        }
    }

    pub fn channel(mut self, channel: CurveChannel) -> Self {
        self.file.channels.push(CurveChannel {
            file_id: self.file.id.clone(),
            ..channel
        });
        self
    }

    pub fn set_value(mut self, row_number: i64, value: &str) -> Self {
        self.file.set_values.push(value_row(row_number, value));
        self
    }

    pub fn actual_value(mut self, row_number: i64, value: &str) -> Self {
        self.file.actual_values.push(value_row(row_number, value));
        self
    }

    pub fn deactivated_set_value(mut self, row_number: i64, value: &str) -> Self {
        self.file.set_values.push(ValueRow {
            status: map_value_status(RAW_STATUS_DEACTIVATED),
            ..value_row(row_number, value)
        });
        self
    }

    pub fn build(self) -> ImportedFile {
        self.file
    }
}

pub fn value_row(row_number: i64, value: &str) -> ValueRow {
    ValueRow {
        description: format!("Row {row_number}"),
        row_number,
        value: value.to_string(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_builder_assigns_file_id() {
        let file = FileBuilder::new("f")
            .channel(ChannelBuilder::new("c").axes("Time", "Force").build())
            .set_value(1, "2.5")
            .build();

        assert_eq!(file.channels[0].file_id, FileId::from("f"));
        assert_eq!(file.channels[0].y_axis.name, "Force");
        assert_eq!(file.set_values[0].numeric_value(), Some(2.5));
    }
}

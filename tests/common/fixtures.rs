//! On-disk fixtures: measurement documents written as XML or zipped XML

use std::io::Write;
use std::path::{Path, PathBuf};

/// One `<curve>` of a generated document
pub struct CurveFixture {
    pub description: &'static str,
    pub x_name: &'static str,
    pub y_name: &'static str,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub bounds: (f64, f64, f64, f64),
}

impl CurveFixture {
    pub fn new(description: &'static str, x_name: &'static str, y_name: &'static str) -> Self {
        Self {
            description,
            x_name,
            y_name,
            xs: Vec::new(),
            ys: Vec::new(),
            bounds: (0.0, 1.0, 0.0, 1.0),
        }
    }

    pub fn points(mut self, xs: &[f64], ys: &[f64]) -> Self {
        self.xs = xs.to_vec();
        self.ys = ys.to_vec();
        self
    }

    pub fn bounds(mut self, min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        self.bounds = (min_x, max_x, min_y, max_y);
        self
    }

    fn to_xml(&self) -> String {
        let points: String = self
            .xs
            .iter()
            .zip(&self.ys)
            .map(|(x, y)| format!(r#"<point x="{x}" y="{y}"/>"#))
            .collect();
        let (min_x, max_x, min_y, max_y) = self.bounds;
        format!(
            r#"<curve description="{}" xName="{}" yName="{}" noOfPoints="{}">
      <coordSystem minX="{min_x}" maxX="{max_x}" minY="{min_y}" maxY="{max_y}"/>
      <points>{points}</points>
    </curve>"#,
            self.description,
            self.x_name,
            self.y_name,
            self.xs.len(),
        )
    }
}

/// Full measurement document with the given curves and set values
pub fn document(title: &str, curves: &[CurveFixture], set_values: &[(i64, &str)]) -> String {
    let curves: String = curves.iter().map(CurveFixture::to_xml).collect();
    let rows: String = set_values
        .iter()
        .map(|(row, value)| {
            format!(r#"<setValue description="Row {row}" rowNumber="{row}" value="{value}"/>"#)
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<data>
  <body>
    <header><title>{title}</title><date>2024-03-01 10:00:00</date></header>
    <curves>{curves}</curves>
    <setValues><plc>{rows}</plc></setValues>
  </body>
</data>"#
    )
}

pub fn write_xml(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write xml fixture");
    path
}

/// Zip holding `content` under `entry`
pub fn zip_bytes(entry: &str, content: &str) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        zip.start_file(entry, zip::write::SimpleFileOptions::default())
            .expect("start zip entry");
        zip.write_all(content.as_bytes()).expect("write zip entry");
        zip.finish().expect("finish zip");
    }
    cursor.into_inner()
}

pub fn write_zip(dir: &Path, name: &str, entry: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, zip_bytes(entry, content)).expect("write zip fixture");
    path
}

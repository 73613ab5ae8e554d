//! Measurement document parser
//!
//! Turns the value tree produced by [`parse_xml_tree`] into an
//! [`ImportedFile`]. Two historical document shapes are accepted: the
//! current one with everything below `data/body`, and an older one where the
//! body (or its content) sits at the document root.
//!
//! Styles are never inherited: every curve, element group and element carries
//! its own color and description as written in the file.

use crate::error::Result;
use crate::parser::ids::IdSource;
use crate::parser::points::decode_points;
use crate::parser::xml_tree::{parse_xml_tree, XmlNode};
use crate::types::{
    map_value_status, AxisInfo, ChannelId, CircleElement, CoordSystem, CurveChannel,
    ElementGroup, ElementStyle, FileId, GraphicElements, HeaderInfo, ImportedFile, LineElement,
    ValueRow, WindowElement, DEFAULT_BACKGROUND_COLOR, DEFAULT_TEXT_COLOR, RAW_STATUS_OK,
};

/// Parse document text into an [`ImportedFile`].
///
/// Fails only when the XML itself is malformed; missing fields fall back to
/// their defaults.
pub fn parse_document(text: &str, filename: &str, ids: &mut dyn IdSource) -> Result<ImportedFile> {
    let tree = parse_xml_tree(text)?;
    let doc = XmlNode(&tree);
    let body = locate_body(doc);

    let file_id = FileId::new(ids.next_id());
    let header = parse_header(body.get("header").unwrap_or(body));

    let channels: Vec<CurveChannel> = body
        .get("curves")
        .map(|curves| curves.items("curve"))
        .unwrap_or_default()
        .into_iter()
        .map(|curve| parse_curve(curve, &file_id, ids))
        .collect();

    let set_values = parse_value_rows(body, "setValues", "setValue");
    let actual_values = parse_value_rows(body, "actualValues", "actualValue");

    tracing::debug!(
        "Parsed {}: {} channels, {} set values, {} actual values",
        filename,
        channels.len(),
        set_values.len(),
        actual_values.len()
    );

    Ok(ImportedFile {
        id: file_id,
        filename: filename.to_string(),
        header,
        channels,
        set_values,
        actual_values,
    })
}

/// `data/body`, then `body`, then the document root itself
fn locate_body(doc: XmlNode<'_>) -> XmlNode<'_> {
    doc.at(&["data", "body"])
        .or_else(|| doc.get("body"))
        .or_else(|| doc.get("data"))
        .unwrap_or(doc)
}

fn parse_header(node: XmlNode<'_>) -> HeaderInfo {
    HeaderInfo {
        machine_description: node.str_field("machineDescription"),
        module_description: node.str_field("moduleDescription"),
        measuring_point: node.str_field("measuringPoint"),
        ident_string: node.str_field("identString"),
        type_name: node.str_field("type"),
        variant: node.str_field("variant"),
        ok_nok_enabled: node.bool_field("okNokEnabled", false),
        marked_as_nok: node.bool_field("markedAsNok", false),
        data_possibly_incorrect: node.bool_field("dataPossiblyIncorrect", false),
        title: node.str_field("title"),
        date: node.str_field("date"),
    }
}

fn parse_axis(node: XmlNode<'_>, prefix: &str) -> AxisInfo {
    AxisInfo {
        name: node.str_field(&format!("{prefix}Name")),
        unit: node.str_field(&format!("{prefix}Unit")),
        precision: node.i32_field(&format!("{prefix}Precision"), 0),
    }
}

fn parse_coord_system(node: Option<XmlNode<'_>>) -> CoordSystem {
    let Some(node) = node else {
        return CoordSystem::default();
    };
    CoordSystem {
        min_x: node.f64_field("minX", 0.0),
        max_x: node.f64_field("maxX", 0.0),
        min_y: node.f64_field("minY", 0.0),
        max_y: node.f64_field("maxY", 0.0),
        origin_x: node.f64_field("originX", 0.0),
        origin_y: node.f64_field("originY", 0.0),
    }
}

fn parse_curve(curve: XmlNode<'_>, file_id: &FileId, ids: &mut dyn IdSource) -> CurveChannel {
    let points_node = curve.get("points");
    let declared = curve
        .field_text("noOfPoints")
        .or_else(|| points_node.and_then(|p| p.field_text("noOfPoints")))
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let points = decode_points(points_node.and_then(|p| p.text()), declared);

    CurveChannel {
        id: ChannelId::new(ids.next_id()),
        file_id: file_id.clone(),
        description: curve.str_field("description"),
        group_description: curve.str_field("groupDescription"),
        x_axis: parse_axis(curve, "x"),
        y_axis: parse_axis(curve, "y"),
        z_axis: parse_axis(curve, "z"),
        color: curve.color_field("color", 0),
        line_style: curve.i32_field("lineStyle", 0),
        line_thickness: curve.f64_field("lineThickness", 1.0),
        is_line_visible: curve.bool_field("isLineVisible", true),
        is_point_visible: curve.bool_field("isPointVisible", false),
        coord_system: parse_coord_system(curve.get("coordSystem")),
        points_x: points.xs,
        points_y: points.ys,
        graphics: parse_graphics(curve.get("graphicElements").unwrap_or(curve)),
    }
}

fn parse_style(group: XmlNode<'_>) -> ElementStyle {
    ElementStyle {
        color: group.color_field("color", 0),
        thickness: group.f64_field("thickness", 1.0),
        line_style: group.i32_field("lineStyle", 0),
        fill: group.bool_field("fill", false),
        fill_color: group.color_field("fillColor", 0),
    }
}

fn parse_groups<T>(
    container: XmlNode<'_>,
    group_key: &str,
    list_key: &str,
    item_key: &str,
    parse_item: impl Fn(XmlNode<'_>) -> T,
) -> Vec<ElementGroup<T>> {
    container
        .items(group_key)
        .into_iter()
        .map(|group| ElementGroup {
            description: group.str_field("description"),
            style: parse_style(group),
            items: group
                .get(list_key)
                .map(|list| list.items(item_key))
                .unwrap_or_default()
                .into_iter()
                .map(&parse_item)
                .collect(),
        })
        .collect()
}

fn parse_graphics(node: XmlNode<'_>) -> GraphicElements {
    GraphicElements {
        line_groups: parse_groups(node, "linegroup", "lines", "line", |n| LineElement {
            x1: n.f64_field("x1", 0.0),
            y1: n.f64_field("y1", 0.0),
            x2: n.f64_field("x2", 0.0),
            y2: n.f64_field("y2", 0.0),
            description: n.str_field("description"),
            layer: n.opt_i32_field("layer"),
        }),
        window_groups: parse_groups(node, "windowgroup", "windows", "window", |n| {
            WindowElement {
                x1: n.f64_field("x1", 0.0),
                y1: n.f64_field("y1", 0.0),
                x2: n.f64_field("x2", 0.0),
                y2: n.f64_field("y2", 0.0),
                description: n.str_field("description"),
                layer: n.opt_i32_field("layer"),
            }
        }),
        circle_groups: parse_groups(node, "circlegroup", "circles", "circle", |n| {
            CircleElement {
                x: n.f64_field("x", 0.0),
                y: n.f64_field("y", 0.0),
                radius: n.f64_field("radius", 0.0),
                description: n.str_field("description"),
                layer: n.opt_i32_field("layer"),
            }
        }),
    }
}

fn parse_value_row(node: XmlNode<'_>) -> ValueRow {
    ValueRow {
        description: node.str_field("description"),
        row_number: node.i64_field("rowNumber", 0),
        value: node.str_field("value"),
        unit: node.str_field("unit"),
        precision: node.i32_field("precision", 0),
        status: map_value_status(node.i64_field("status", RAW_STATUS_OK)),
        description_text_color: node.color_field("textColorDescription", DEFAULT_TEXT_COLOR),
        description_background_color: node
            .color_field("backgroundColorDescription", DEFAULT_BACKGROUND_COLOR),
        unit_text_color: node.color_field("textColorUnit", DEFAULT_TEXT_COLOR),
        unit_background_color: node.color_field("backgroundColorUnit", DEFAULT_BACKGROUND_COLOR),
        value_text_color: node.color_field("textColorValue", DEFAULT_TEXT_COLOR),
        value_background_color: node
            .color_field("backgroundColorValue", DEFAULT_BACKGROUND_COLOR),
    }
}

/// Rows of `<{table}><plc><{row}/>…</plc></{table}>`, across all plc blocks
fn parse_value_rows(body: XmlNode<'_>, table: &str, row: &str) -> Vec<ValueRow> {
    let Some(table) = body.get(table) else {
        return Vec::new();
    };
    table
        .items("plc")
        .into_iter()
        .flat_map(|plc| plc.items(row))
        .map(parse_value_row)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CurveError;
    use crate::parser::ids::{MockIdSource, SequentialIds};
    use crate::types::{STATUS_DEACTIVATED, STATUS_NOK, STATUS_OK};

    const FULL_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<data>
  <body>
    <header>
      <machineDescription>Press 4</machineDescription>
      <moduleDescription>Module A</moduleDescription>
      <measuringPoint>MP1</measuringPoint>
      <identString>SN-001</identString>
      <type>T1</type>
      <variant>V2</variant>
      <okNokEnabled>TRUE</okNokEnabled>
      <markedAsNok>false</markedAsNok>
      <title>Press fit</title>
      <date>2024-03-01 10:00:00</date>
    </header>
    <curves>
      <curve description="Force" groupDescription="Main" xName="Distance" xUnit="mm"
             yName="Force" yUnit="kN" color="255" lineStyle="1" lineThickness="2"
             noOfPoints="3">
        <coordSystem minX="0" maxX="10" minY="-1" maxY="50" originX="0" originY="0"/>
        <points><point x="0" y="0"/><point x="1" y="10"/><point x="2" y="20"/></points>
        <graphicElements>
          <linegroup description="Limits" color="65280">
            <lines><line x1="0" y1="5" x2="2" y2="5" description="L1" layer="2"/></lines>
          </linegroup>
          <windowgroup description="Win" color="16711680" fill="true">
            <windows>
              <window x1="2" y1="30" x2="1" y2="10" description="W1"/>
              <window x1="0" y1="0" x2="1" y2="1" description="W2"/>
            </windows>
          </windowgroup>
          <circlegroup description="Circ">
            <circles><circle x="1" y="10" radius="0.5"/></circles>
          </circlegroup>
        </graphicElements>
      </curve>
    </curves>
    <setValues>
      <plc>
        <setValue description="Target" rowNumber="1" value="12.5" unit="kN" status="0"/>
        <setValue description="Off" rowNumber="2" value="3" status="1"/>
      </plc>
    </setValues>
    <actualValues>
      <plc>
        <actualValue description="Peak" rowNumber="1" value="20" status="2"
                     backgroundColorValue="255"/>
      </plc>
    </actualValues>
  </body>
</data>"#;

    #[test]
    fn test_parse_full_document() {
        let mut ids = SequentialIds::new("id");
        let file = parse_document(FULL_DOC, "a.xml", &mut ids).unwrap();

        assert_eq!(file.id.as_str(), "id-1");
        assert_eq!(file.filename, "a.xml");
        assert_eq!(file.header.machine_description, "Press 4");
        assert_eq!(file.header.ident_string, "SN-001");
        assert!(file.header.ok_nok_enabled);
        assert!(!file.header.marked_as_nok);
        assert!(!file.header.data_possibly_incorrect);
        assert_eq!(file.header.date, "2024-03-01 10:00:00");

        assert_eq!(file.channels.len(), 1);
        let ch = &file.channels[0];
        assert_eq!(ch.id.as_str(), "id-2");
        assert_eq!(ch.file_id, file.id);
        assert_eq!(ch.x_axis.name, "Distance");
        assert_eq!(ch.y_axis.unit, "kN");
        assert_eq!(ch.color, 255);
        assert!(ch.is_line_visible);
        assert!(!ch.is_point_visible);
        assert_eq!(ch.points_x, vec![0.0, 1.0, 2.0]);
        assert_eq!(ch.points_y, vec![0.0, 10.0, 20.0]);
        assert_eq!(ch.coord_system.max_y, 50.0);

        let g = &ch.graphics;
        assert_eq!(g.line_groups.len(), 1);
        assert_eq!(g.line_groups[0].style.color, 65280);
        assert_eq!(g.line_groups[0].items[0].layer, Some(2));
        assert_eq!(g.window_groups[0].items.len(), 2);
        assert!(g.window_groups[0].style.fill);
        assert_eq!(g.window_groups[0].items[0].x1, 2.0);
        assert_eq!(g.circle_groups[0].items[0].radius, 0.5);
        assert_eq!(g.circle_groups[0].items[0].layer, None);

        assert_eq!(file.set_values.len(), 2);
        assert_eq!(file.set_values[0].status, STATUS_OK);
        assert_eq!(file.set_values[1].status, STATUS_DEACTIVATED);
        assert_eq!(file.set_values[0].value_background_color, 0xFFFFFF);
        assert_eq!(file.set_values[0].value_text_color, 0);
        assert_eq!(file.actual_values[0].status, STATUS_NOK);
        assert_eq!(file.actual_values[0].value_background_color, 255);
    }

    #[test]
    fn test_flat_document_shape() {
        let doc = r#"<body>
            <title>Flat</title>
            <curves><curve><description>C</description><noOfPoints>1</noOfPoints>
              <points><point x="5" y="6"/></points></curve></curves>
          </body>"#;
        let mut ids = SequentialIds::new("f");
        let file = parse_document(doc, "flat.xml", &mut ids).unwrap();
        assert_eq!(file.header.title, "Flat");
        assert_eq!(file.channels[0].description, "C");
        assert_eq!(file.channels[0].points_x, vec![5.0]);
    }

    #[test]
    fn test_defaults_when_fields_missing() {
        let doc = "<data><body><curves><curve/></curves></body></data>";
        let mut ids = SequentialIds::new("f");
        let file = parse_document(doc, "empty.xml", &mut ids).unwrap();
        let ch = &file.channels[0];
        assert_eq!(ch.description, "");
        assert!(ch.is_line_visible);
        assert_eq!(ch.no_of_points(), 0);
        assert!(ch.graphics.is_empty());
        assert!(file.set_values.is_empty());
    }

    #[test]
    fn test_multiple_plc_blocks() {
        let doc = r#"<data><body><setValues>
            <plc><setValue rowNumber="1" value="1"/></plc>
            <plc><setValue rowNumber="2" value="2"/></plc>
          </setValues></body></data>"#;
        let mut ids = SequentialIds::new("f");
        let file = parse_document(doc, "plc.xml", &mut ids).unwrap();
        let rows: Vec<_> = file.set_values.iter().map(|r| r.row_number).collect();
        assert_eq!(rows, vec![1, 2]);
    }

    #[test]
    fn test_truncated_points_tolerated() {
        let doc = r#"<data><body><curves><curve noOfPoints="10">
            <points><point x="1" y="1"/><point x="2" y="2"/></points>
          </curve></curves></body></data>"#;
        let mut ids = SequentialIds::new("f");
        let file = parse_document(doc, "t.xml", &mut ids).unwrap();
        assert_eq!(file.channels[0].points_x, vec![1.0, 2.0]);
        assert_eq!(file.channels[0].points_y.len(), 2);
    }

    #[test]
    fn test_malformed_xml_is_error() {
        let mut ids = SequentialIds::new("f");
        let result = parse_document("<data><body></data>", "bad.xml", &mut ids);
        assert!(matches!(result, Err(CurveError::Xml(_))));
    }

    #[test]
    fn test_ids_drawn_from_source() {
        let mut ids = MockIdSource::new();
        let mut n = 0;
        ids.expect_next_id().times(3).returning(move || {
            n += 1;
            format!("m{n}")
        });
        let doc = "<data><body><curves><curve/><curve/></curves></body></data>";
        let file = parse_document(doc, "m.xml", &mut ids).unwrap();
        assert_eq!(file.id.as_str(), "m1");
        assert_eq!(file.channels[0].id.as_str(), "m2");
        assert_eq!(file.channels[1].id.as_str(), "m3");
    }
}

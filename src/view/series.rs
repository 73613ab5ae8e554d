//! Render-ready series for one channel instance

use super::visibility::{ChannelVisibility, ElementKind, RenderTuple, VisibilityMap};
use crate::analysis::lttb;
use crate::config::PlotConfig;
use crate::types::{ElementGroup, FileId, GraphicElements};

/// Everything a renderer needs to draw one channel instance
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    pub file_id: FileId,
    /// Legend label, `<filename>: <description>`
    pub label: String,
    pub x_axis: String,
    pub y_axis: String,
    pub color: u32,
    pub line_style: i32,
    pub line_thickness: f64,
    pub show_line: bool,
    pub show_points: bool,
    /// Shifted and downsampled points
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    /// Point count before downsampling
    pub source_points: usize,
    /// Shifted elements, hidden groups and items removed
    pub graphics: GraphicElements,
}

fn visible_groups<T: Clone>(
    groups: &[ElementGroup<T>],
    kind: ElementKind,
    vis: &ChannelVisibility,
) -> Vec<ElementGroup<T>> {
    groups
        .iter()
        .enumerate()
        .filter(|(g, _)| vis.shows_group(kind, *g))
        .map(|(g, group)| ElementGroup {
            description: group.description.clone(),
            style: group.style.clone(),
            items: group
                .items
                .iter()
                .enumerate()
                .filter(|(i, _)| vis.shows_item(kind, g, *i))
                .map(|(_, item)| item.clone())
                .collect(),
        })
        .collect()
}

/// Drop element groups and items hidden in `vis`
pub fn filter_graphics(graphics: &GraphicElements, vis: &ChannelVisibility) -> GraphicElements {
    GraphicElements {
        line_groups: visible_groups(&graphics.line_groups, ElementKind::Lines, vis),
        window_groups: visible_groups(&graphics.window_groups, ElementKind::Windows, vis),
        circle_groups: visible_groups(&graphics.circle_groups, ElementKind::Circles, vis),
    }
}

/// Build the series for `tuple` with its file's sync offset applied
pub fn build_series(
    tuple: &RenderTuple<'_>,
    offset: f64,
    config: &PlotConfig,
    visibility: &VisibilityMap,
) -> PlotSeries {
    let channel = tuple.channel;
    let vis = visibility.get(&tuple.key());

    let (xs, ys) = match config.threshold() {
        Some(threshold) => lttb::downsample_points(&channel.points_x, &channel.points_y, threshold),
        None => (channel.points_x.clone(), channel.points_y.clone()),
    };
    let xs = if offset == 0.0 {
        xs
    } else {
        xs.into_iter().map(|x| x + offset).collect()
    };

    PlotSeries {
        file_id: tuple.file.id.clone(),
        label: format!("{}: {}", tuple.file.filename, channel.description),
        x_axis: channel.x_axis.label(),
        y_axis: channel.y_axis.label(),
        color: channel.color,
        line_style: channel.line_style,
        line_thickness: channel.line_thickness,
        show_line: channel.is_line_visible,
        show_points: channel.is_point_visible,
        xs,
        ys,
        source_points: channel.no_of_points(),
        graphics: filter_graphics(&channel.graphics.shifted_x(offset), &vis),
    }
}

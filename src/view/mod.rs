//! Render-time resolution of what to draw
//!
//! [`visibility`] decides which channel instances are drawn, [`series`]
//! turns each instance into shifted, downsampled, filtered plot data.

pub mod series;
pub mod visibility;

pub use series::{build_series, PlotSeries};
pub use visibility::{
    resolve_visible_channels, ChannelGroup, ChannelRef, ChannelVisibility, ElementKind, GroupKey,
    RenderTuple, TriState, VisibilityKey, VisibilityMap,
};

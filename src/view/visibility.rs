//! Channel groups and per-instance visibility
//!
//! A physical channel can appear in several groups at once. Each appearance
//! is its own render instance with its own visibility entry, addressed by a
//! [`VisibilityKey`] of `(group, file, channel)`. The map is sparse: an
//! instance without an entry is fully visible.
//!
//! Group and file level toggles never store a flag of their own. They write
//! one entry per member instance, and the checkbox state shown for a group or
//! file is folded back from those entries with [`VisibilityMap::tri_state`].

use crate::types::{ChannelId, CurveChannel, FileId, GroupId, ImportedFile};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// Reference to one channel of one file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelRef {
    pub file_id: FileId,
    pub channel_id: ChannelId,
}

impl ChannelRef {
    pub fn new(file_id: FileId, channel_id: ChannelId) -> Self {
        Self {
            file_id,
            channel_id,
        }
    }
}

/// User defined, independently activatable collection of channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelGroup {
    pub id: GroupId,
    pub name: String,
    pub channels: Vec<ChannelRef>,
    pub is_active: bool,
}

impl ChannelGroup {
    pub fn new(id: GroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            channels: Vec::new(),
            is_active: true,
        }
    }

    /// Add a channel unless it is already a member
    pub fn add(&mut self, channel: ChannelRef) {
        if !self.channels.contains(&channel) {
            self.channels.push(channel);
        }
    }

    pub fn remove_file(&mut self, file_id: &FileId) {
        self.channels.retain(|c| &c.file_id != file_id);
    }
}

/// Grouping context of a render instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupKey {
    /// Selected directly, outside any group
    Ungrouped,
    Group(GroupId),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Ungrouped => f.write_str("ungrouped"),
            GroupKey::Group(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VisibilityKey {
    pub group: GroupKey,
    pub file_id: FileId,
    pub channel_id: ChannelId,
}

impl VisibilityKey {
    pub fn new(group: GroupKey, file_id: FileId, channel_id: ChannelId) -> Self {
        Self {
            group,
            file_id,
            channel_id,
        }
    }

    pub fn for_ref(group: GroupKey, channel: &ChannelRef) -> Self {
        Self::new(group, channel.file_id.clone(), channel.channel_id.clone())
    }
}

/// Kinds of graphic element a channel can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Lines,
    Windows,
    Circles,
}

impl ElementKind {
    fn prefix(self) -> &'static str {
        match self {
            ElementKind::Lines => "lines",
            ElementKind::Windows => "windows",
            ElementKind::Circles => "circles",
        }
    }

    /// Key addressing a whole element group, e.g. `windows-2`
    pub fn group_key(self, group: usize) -> String {
        format!("{}-{}", self.prefix(), group)
    }

    /// Key addressing one item of a group, e.g. `windows-2-0`
    pub fn item_key(self, group: usize, item: usize) -> String {
        format!("{}-{}-{}", self.prefix(), group, item)
    }
}

/// Visibility of one render instance and its graphic elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelVisibility {
    pub visible: bool,
    pub show_lines: bool,
    pub show_windows: bool,
    pub show_circles: bool,
    /// Element group and item keys hidden individually
    pub hidden_elements: BTreeSet<String>,
}

impl Default for ChannelVisibility {
    fn default() -> Self {
        Self {
            visible: true,
            show_lines: true,
            show_windows: true,
            show_circles: true,
            hidden_elements: BTreeSet::new(),
        }
    }
}

impl ChannelVisibility {
    pub fn shows_kind(&self, kind: ElementKind) -> bool {
        match kind {
            ElementKind::Lines => self.show_lines,
            ElementKind::Windows => self.show_windows,
            ElementKind::Circles => self.show_circles,
        }
    }

    fn set_kind(&mut self, kind: ElementKind, visible: bool) {
        match kind {
            ElementKind::Lines => self.show_lines = visible,
            ElementKind::Windows => self.show_windows = visible,
            ElementKind::Circles => self.show_circles = visible,
        }
    }

    /// Element group `group` is drawn
    pub fn shows_group(&self, kind: ElementKind, group: usize) -> bool {
        self.shows_kind(kind) && !self.hidden_elements.contains(&kind.group_key(group))
    }

    /// Item `item` of element group `group` is drawn
    pub fn shows_item(&self, kind: ElementKind, group: usize, item: usize) -> bool {
        self.shows_group(kind, group)
            && !self.hidden_elements.contains(&kind.item_key(group, item))
    }
}

/// Folded visibility of several instances, for checkbox rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriState {
    AllVisible,
    NoneVisible,
    Mixed,
}

/// Sparse visibility store
#[derive(Debug, Clone, Default)]
pub struct VisibilityMap {
    entries: HashMap<VisibilityKey, ChannelVisibility>,
}

impl VisibilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `key`, or the all-visible default
    pub fn get(&self, key: &VisibilityKey) -> ChannelVisibility {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    pub fn is_visible(&self, key: &VisibilityKey) -> bool {
        self.entries.get(key).map_or(true, |v| v.visible)
    }

    fn entry(&mut self, key: VisibilityKey) -> &mut ChannelVisibility {
        self.entries.entry(key).or_default()
    }

    pub fn set_channel_visible(&mut self, key: VisibilityKey, visible: bool) {
        self.entry(key).visible = visible;
    }

    pub fn set_element_kind_visible(
        &mut self,
        key: VisibilityKey,
        kind: ElementKind,
        visible: bool,
    ) {
        self.entry(key).set_kind(kind, visible);
    }

    /// Hide or show one element group or item by its key
    pub fn set_element_hidden(
        &mut self,
        key: VisibilityKey,
        element: impl Into<String>,
        hidden: bool,
    ) {
        let entry = self.entry(key);
        let element = element.into();
        if hidden {
            entry.hidden_elements.insert(element);
        } else {
            entry.hidden_elements.remove(&element);
        }
    }

    pub fn is_element_visible(
        &self,
        key: &VisibilityKey,
        kind: ElementKind,
        group: usize,
        item: Option<usize>,
    ) -> bool {
        let vis = self.get(key);
        match item {
            Some(i) => vis.shows_item(kind, group, i),
            None => vis.shows_group(kind, group),
        }
    }

    /// Write one entry per member of `group`
    pub fn set_group_visible(&mut self, group: &ChannelGroup, visible: bool) {
        let group_key = GroupKey::Group(group.id.clone());
        for channel in &group.channels {
            self.set_channel_visible(VisibilityKey::for_ref(group_key.clone(), channel), visible);
        }
    }

    /// Write one entry per channel of `file` within one grouping context
    pub fn set_file_visible(&mut self, group: GroupKey, file: &ImportedFile, visible: bool) {
        for channel in &file.channels {
            self.set_channel_visible(
                VisibilityKey::new(group.clone(), file.id.clone(), channel.id.clone()),
                visible,
            );
        }
    }

    /// Fold the visibility of `keys`; an empty set counts as all visible
    pub fn tri_state<'k>(&self, keys: impl IntoIterator<Item = &'k VisibilityKey>) -> TriState {
        let (mut any_visible, mut any_hidden) = (false, false);
        for key in keys {
            if self.is_visible(key) {
                any_visible = true;
            } else {
                any_hidden = true;
            }
            if any_visible && any_hidden {
                return TriState::Mixed;
            }
        }
        if any_hidden {
            TriState::NoneVisible
        } else {
            TriState::AllVisible
        }
    }

    pub fn group_tri_state(&self, group: &ChannelGroup) -> TriState {
        let group_key = GroupKey::Group(group.id.clone());
        let keys: Vec<_> = group
            .channels
            .iter()
            .map(|c| VisibilityKey::for_ref(group_key.clone(), c))
            .collect();
        self.tri_state(&keys)
    }

    pub fn file_tri_state(&self, group: &GroupKey, file: &ImportedFile) -> TriState {
        let keys: Vec<_> = file
            .channels
            .iter()
            .map(|c| VisibilityKey::new(group.clone(), file.id.clone(), c.id.clone()))
            .collect();
        self.tri_state(&keys)
    }

    /// Drop every entry belonging to a removed file
    pub fn remove_file(&mut self, file_id: &FileId) {
        self.entries.retain(|k, _| &k.file_id != file_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A channel eligible for rendering in a given grouping context
#[derive(Debug, Clone)]
pub struct RenderTuple<'a> {
    pub channel: &'a CurveChannel,
    pub file: &'a ImportedFile,
    pub group: GroupKey,
}

impl RenderTuple<'_> {
    pub fn key(&self) -> VisibilityKey {
        VisibilityKey::new(
            self.group.clone(),
            self.file.id.clone(),
            self.channel.id.clone(),
        )
    }
}

fn find_channel<'a>(
    files: &'a [ImportedFile],
    channel: &ChannelRef,
) -> Option<(&'a ImportedFile, &'a CurveChannel)> {
    let file = files.iter().find(|f| f.id == channel.file_id)?;
    let ch = file.channel(&channel.channel_id)?;
    Some((file, ch))
}

/// Ordered list of channel instances to draw.
///
/// Active groups come first in list order, each expanding its refs in order.
/// Ungrouped selections follow in file and channel order, skipping channels
/// an active group already renders. Refs to missing files or channels are
/// dropped and hidden instances are filtered out.
pub fn resolve_visible_channels<'a>(
    files: &'a [ImportedFile],
    groups: &[ChannelGroup],
    selection: &HashSet<ChannelRef>,
    visibility: &VisibilityMap,
) -> Vec<RenderTuple<'a>> {
    let mut seen: HashSet<VisibilityKey> = HashSet::new();
    let mut grouped: HashSet<ChannelRef> = HashSet::new();
    let mut tuples = Vec::new();

    for group in groups.iter().filter(|g| g.is_active) {
        let group_key = GroupKey::Group(group.id.clone());
        for channel_ref in &group.channels {
            let Some((file, channel)) = find_channel(files, channel_ref) else {
                tracing::debug!(
                    "Dropping dangling ref {}/{} in group '{}'",
                    channel_ref.file_id,
                    channel_ref.channel_id,
                    group.name
                );
                continue;
            };
            let tuple = RenderTuple {
                channel,
                file,
                group: group_key.clone(),
            };
            if seen.insert(tuple.key()) {
                grouped.insert(channel_ref.clone());
                tuples.push(tuple);
            }
        }
    }

    for file in files {
        for channel in &file.channels {
            let channel_ref = ChannelRef::new(file.id.clone(), channel.id.clone());
            if !selection.contains(&channel_ref) || grouped.contains(&channel_ref) {
                continue;
            }
            let tuple = RenderTuple {
                channel,
                file,
                group: GroupKey::Ungrouped,
            };
            if seen.insert(tuple.key()) {
                tuples.push(tuple);
            }
        }
    }

    tuples.retain(|t| visibility.is_visible(&t.key()));
    tuples
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str, channels: &[&str]) -> ImportedFile {
        ImportedFile {
            id: FileId::from(id),
            filename: format!("{id}.xml"),
            channels: channels
                .iter()
                .map(|c| CurveChannel {
                    id: ChannelId::from(*c),
                    file_id: FileId::from(id),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn cref(file: &str, channel: &str) -> ChannelRef {
        ChannelRef::new(FileId::from(file), ChannelId::from(channel))
    }

    fn group(id: &str, refs: &[(&str, &str)]) -> ChannelGroup {
        let mut g = ChannelGroup::new(GroupId::from(id), id);
        for (f, c) in refs {
            g.add(cref(f, c));
        }
        g
    }

    fn ids(tuples: &[RenderTuple<'_>]) -> Vec<(String, String, String)> {
        tuples
            .iter()
            .map(|t| {
                (
                    t.group.to_string(),
                    t.file.id.to_string(),
                    t.channel.id.to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn test_default_visible() {
        let map = VisibilityMap::new();
        let key = VisibilityKey::new(GroupKey::Ungrouped, FileId::from("f"), ChannelId::from("c"));
        assert!(map.is_visible(&key));
        assert_eq!(map.get(&key), ChannelVisibility::default());
        assert!(map.is_empty());
    }

    #[test]
    fn test_hidden_channel_excluded() {
        let files = [file("f", &["a", "b"])];
        let selection: HashSet<_> = [cref("f", "a"), cref("f", "b")].into_iter().collect();
        let mut map = VisibilityMap::new();
        map.set_channel_visible(
            VisibilityKey::new(GroupKey::Ungrouped, FileId::from("f"), ChannelId::from("a")),
            false,
        );
        let tuples = resolve_visible_channels(&files, &[], &selection, &map);
        assert_eq!(ids(&tuples), vec![("ungrouped".into(), "f".into(), "b".into())]);
    }

    #[test]
    fn test_group_order_and_dedup() {
        let files = [file("f", &["a", "b", "c"])];
        let mut g1 = group("g1", &[("f", "b"), ("f", "missing"), ("x", "a")]);
        g1.channels.push(cref("f", "b"));
        let groups = [g1, group("g2", &[("f", "b"), ("f", "a")])];
        let selection: HashSet<_> = [cref("f", "a"), cref("f", "c")].into_iter().collect();
        let tuples = resolve_visible_channels(&files, &groups, &selection, &VisibilityMap::new());
        assert_eq!(
            ids(&tuples),
            vec![
                ("g1".into(), "f".into(), "b".into()),
                ("g2".into(), "f".into(), "b".into()),
                ("g2".into(), "f".into(), "a".into()),
                ("ungrouped".into(), "f".into(), "c".into()),
            ]
        );
    }

    #[test]
    fn test_inactive_group_skipped() {
        let files = [file("f", &["a"])];
        let mut g = group("g1", &[("f", "a")]);
        g.is_active = false;
        let groups = [g];
        let selection: HashSet<_> = [cref("f", "a")].into_iter().collect();
        let tuples = resolve_visible_channels(&files, &groups, &selection, &VisibilityMap::new());
        assert_eq!(ids(&tuples), vec![("ungrouped".into(), "f".into(), "a".into())]);
    }

    #[test]
    fn test_group_toggle_writes_per_channel_entries() {
        let g1 = group("g1", &[("f", "a"), ("f", "b")]);
        let g2 = group("g2", &[("f", "a")]);
        let mut map = VisibilityMap::new();
        let g2_key = VisibilityKey::new(
            GroupKey::Group(GroupId::from("g2")),
            FileId::from("f"),
            ChannelId::from("a"),
        );
        map.set_channel_visible(g2_key.clone(), true);

        map.set_group_visible(&g1, false);
        assert_eq!(map.len(), 3);
        assert_eq!(map.group_tri_state(&g1), TriState::NoneVisible);
        assert!(map.is_visible(&g2_key));
        assert_eq!(map.group_tri_state(&g2), TriState::AllVisible);

        let g1_b = VisibilityKey::for_ref(GroupKey::Group(GroupId::from("g1")), &cref("f", "b"));
        map.set_channel_visible(g1_b, true);
        assert_eq!(map.group_tri_state(&g1), TriState::Mixed);
    }

    #[test]
    fn test_file_toggle_and_remove() {
        let f = file("f", &["a", "b"]);
        let mut map = VisibilityMap::new();
        map.set_file_visible(GroupKey::Ungrouped, &f, false);
        assert_eq!(map.file_tri_state(&GroupKey::Ungrouped, &f), TriState::NoneVisible);
        assert_eq!(
            map.file_tri_state(&GroupKey::Group(GroupId::from("g")), &f),
            TriState::AllVisible
        );

        map.remove_file(&FileId::from("f"));
        assert!(map.is_empty());
    }

    #[test]
    fn test_element_visibility() {
        let key = VisibilityKey::new(GroupKey::Ungrouped, FileId::from("f"), ChannelId::from("a"));
        let mut map = VisibilityMap::new();
        assert!(map.is_element_visible(&key, ElementKind::Windows, 2, Some(0)));

        map.set_element_hidden(key.clone(), ElementKind::Windows.item_key(2, 0), true);
        assert!(!map.is_element_visible(&key, ElementKind::Windows, 2, Some(0)));
        assert!(map.is_element_visible(&key, ElementKind::Windows, 2, Some(1)));
        assert!(map.is_element_visible(&key, ElementKind::Windows, 2, None));

        map.set_element_hidden(key.clone(), "windows-2", true);
        assert!(!map.is_element_visible(&key, ElementKind::Windows, 2, Some(1)));

        map.set_element_kind_visible(key.clone(), ElementKind::Lines, false);
        assert!(!map.is_element_visible(&key, ElementKind::Lines, 0, None));
        assert!(map.is_visible(&key));

        map.set_element_hidden(key.clone(), "windows-2", false);
        assert!(map.is_element_visible(&key, ElementKind::Windows, 2, Some(1)));
    }

    #[test]
    fn test_tri_state_empty() {
        let keys: Vec<VisibilityKey> = Vec::new();
        assert_eq!(VisibilityMap::new().tri_state(&keys), TriState::AllVisible);
    }

    #[test]
    fn test_element_keys() {
        assert_eq!(ElementKind::Windows.group_key(2), "windows-2");
        assert_eq!(ElementKind::Windows.item_key(2, 0), "windows-2-0");
        assert_eq!(ElementKind::Circles.group_key(1), "circles-1");
    }
}

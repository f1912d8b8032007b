//! Path registry.
//!
//! The complete static namespace of the run, built once at construction:
//!
//! ```text
//! /                                   pseudo-root
//! /{root}                             group
//! /{root}/{crowdField}                group, one per partition
//! /{root}/{crowdField}/{prefix}{id}   entity
//!     Geometry                        group
//!         [LOD{n}]                    lod group (dynamic LOD mode only)
//!             {alias}/.../{leaf}      groups, then a mesh or fur node
//!     SkelAnim                        skeleton (optional)
//! ```
//!
//! Alias hierarchies are built idempotently: the first sub-asset that
//! needs an intermediate group creates it and later ones attach under it.
//! Clashing leaf names are made unique with `_1`, `_2`... in insertion
//! order. Sub-assets of unavailable templates get no nodes.

use std::collections::HashMap;

use crate::frame::{EntityInfo, LodMode};
use crate::schema::SchemaKind;
use crate::sim::{Character, SubAssetKind};
use crate::template::{SubAssetTemplate, TemplateCache};
use crate::util::sanitize_identifier;

/// Name of the per-entity geometry group.
pub const GEOMETRY_GROUP: &str = "Geometry";
/// Name of the per-entity skeleton node.
pub const SKELETON_NODE: &str = "SkelAnim";

/// Index of a node in the registry.
pub type NodeId = usize;

/// What a node addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Group,
    Entity { entity: usize },
    Lod { entity: usize, variant: usize },
    Mesh { entity: usize, variant: usize, sub: usize },
    Fur { entity: usize, variant: usize, sub: usize },
    Skel { entity: usize },
}

impl NodeKind {
    pub fn schema_kind(&self) -> SchemaKind {
        match self {
            Self::Group => SchemaKind::Group,
            Self::Entity { .. } => SchemaKind::Entity,
            Self::Lod { .. } => SchemaKind::Lod,
            Self::Mesh { .. } => SchemaKind::Mesh,
            Self::Fur { .. } => SchemaKind::Fur,
            Self::Skel { .. } => SchemaKind::Skel,
        }
    }

    /// Entity this node belongs to, for entity-level and deeper nodes.
    pub fn entity(&self) -> Option<usize> {
        match *self {
            Self::Group => None,
            Self::Entity { entity }
            | Self::Lod { entity, .. }
            | Self::Mesh { entity, .. }
            | Self::Fur { entity, .. }
            | Self::Skel { entity } => Some(entity),
        }
    }
}

/// A registry node.
#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
}

/// Namespace options.
#[derive(Clone, Copy, Debug)]
pub struct Layout<'a> {
    pub root_name: &'a str,
    pub lod_mode: LodMode,
    pub skeleton: bool,
    pub fur: bool,
}

/// Bidirectional path <-> node mapping.
#[derive(Clone, Debug, Default)]
pub struct PathRegistry {
    nodes: Vec<Node>,
    paths: Vec<String>,
    by_path: HashMap<String, NodeId>,
    by_kind: HashMap<NodeKind, NodeId>,
}

impl PathRegistry {
    /// Registry without any path, not even the pseudo-root.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the namespace of a run.
    ///
    /// `partitions` are partition names, `entities` are indexed by entity
    /// index and reference partitions by index.
    pub fn build(
        layout: &Layout<'_>,
        partitions: &[String],
        entities: &[EntityInfo],
        characters: &[Character],
        templates: &TemplateCache,
    ) -> Self {
        let mut reg = Self::default();
        let pseudo_root = reg.push(None, String::new(), NodeKind::Group);
        let root = reg.push(Some(pseudo_root), sanitize_identifier(layout.root_name), NodeKind::Group);

        let partition_nodes: Vec<NodeId> = partitions
            .iter()
            .map(|name| {
                let name = reg.unique_child_name(root, &sanitize_identifier(name));
                reg.push(Some(root), name, NodeKind::Group)
            })
            .collect();

        for (index, info) in entities.iter().enumerate() {
            let Some(&parent) = partition_nodes.get(info.partition) else {
                debug_assert!(false, "entity {} references missing partition {}", info.id, info.partition);
                continue;
            };
            let name = reg.unique_child_name(parent, &info.name);
            let node = reg.push(Some(parent), name, NodeKind::Entity { entity: index });

            let geometry = reg.push(Some(node), GEOMETRY_GROUP.to_string(), NodeKind::Group);
            match layout.lod_mode {
                LodMode::Static => {
                    if let Some(t) = templates.get(info.character, info.default_variant) {
                        reg.add_sub_assets(geometry, index, info.default_variant, &t.sub_assets, layout.fur);
                    }
                }
                LodMode::Dynamic => {
                    let count = characters.get(info.character).map_or(0, |c| c.variants.len());
                    for variant in 0..count {
                        let Some(t) = templates.get(info.character, variant) else {
                            continue;
                        };
                        let lod = reg.push(
                            Some(geometry),
                            format!("LOD{variant}"),
                            NodeKind::Lod { entity: index, variant },
                        );
                        reg.add_sub_assets(lod, index, variant, &t.sub_assets, layout.fur);
                    }
                }
            }

            if layout.skeleton {
                reg.push(Some(node), SKELETON_NODE.to_string(), NodeKind::Skel { entity: index });
            }
        }
        reg
    }

    fn add_sub_assets(&mut self, parent: NodeId, entity: usize, variant: usize, subs: &[SubAssetTemplate], fur: bool) {
        for (sub, template) in subs.iter().enumerate() {
            let kind = match template.kind {
                SubAssetKind::Mesh => NodeKind::Mesh { entity, variant, sub },
                SubAssetKind::Fur if fur => NodeKind::Fur { entity, variant, sub },
                SubAssetKind::Fur => continue,
            };

            let source = if template.alias.is_empty() { &template.name } else { &template.alias };
            let mut segments: Vec<String> = source
                .split(['/', '|'])
                .filter(|s| !s.is_empty())
                .map(sanitize_identifier)
                .collect();
            let leaf = segments.pop().unwrap_or_else(|| template.name.clone());

            let mut at = parent;
            for segment in segments {
                at = self.group_child(at, &segment);
            }
            let name = self.unique_child_name(at, &leaf);
            self.push(Some(at), name, kind);
        }
    }

    /// Existing group child named `name`, or a new one.
    fn group_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        let path = child_path(&self.paths[parent], name);
        if let Some(&id) = self.by_path.get(&path) {
            if self.nodes[id].kind == NodeKind::Group {
                return id;
            }
        }
        let name = self.unique_child_name(parent, name);
        self.push(Some(parent), name, NodeKind::Group)
    }

    fn unique_child_name(&self, parent: NodeId, base: &str) -> String {
        let parent_path = &self.paths[parent];
        if !self.by_path.contains_key(&child_path(parent_path, base)) {
            return base.to_string();
        }
        (1usize..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !self.by_path.contains_key(&child_path(parent_path, candidate)))
            .unwrap_or_else(|| base.to_string())
    }

    fn push(&mut self, parent: Option<NodeId>, name: String, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        let path = match parent {
            Some(p) => child_path(&self.paths[p], &name),
            None => "/".to_string(),
        };
        if let Some(p) = parent {
            self.nodes[p].children.push(id);
        }
        debug_assert!(!self.by_path.contains_key(&path), "duplicate path {path}");
        self.by_path.insert(path.clone(), id);
        if kind != NodeKind::Group {
            self.by_kind.insert(kind, id);
        }
        self.paths.push(path);
        self.nodes.push(Node { name, parent, children: Vec::new(), kind });
        id
    }

    /// Node at a prim path. A trailing `/` is ignored.
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        let trimmed = if path.len() > 1 { path.trim_end_matches('/') } else { path };
        self.by_path.get(trimmed).copied()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    #[inline]
    pub fn path_of(&self, id: NodeId) -> Option<&str> {
        self.paths.get(id).map(String::as_str)
    }

    pub fn is_pseudo_root(&self, id: NodeId) -> bool {
        id == 0 && !self.nodes.is_empty()
    }

    /// Child names of the node at `path`, in creation order.
    pub fn children(&self, path: &str) -> Vec<String> {
        self.lookup(path)
            .and_then(|id| self.nodes.get(id))
            .map(|node| node.children.iter().map(|&c| self.nodes[c].name.clone()).collect())
            .unwrap_or_default()
    }

    /// Node addressing `kind`. Groups are not indexed.
    pub fn node_for(&self, kind: &NodeKind) -> Option<NodeId> {
        self.by_kind.get(kind).copied()
    }

    /// Node of an entity.
    pub fn entity_node(&self, entity: usize) -> Option<NodeId> {
        self.node_for(&NodeKind::Entity { entity })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

mod blend_shapes;

pub use blend_shapes::BlendShapeTable;

use bevy::{platform::collections::HashMap, reflect::Reflect, transform::components::Transform};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use uuid::Uuid;

/// Identity of a loaded rig. Two rigs built from the same asset load share nothing but their
/// bone names, so the animator keys its per-rig state on this id.
#[derive(Reflect, Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct RigId(Uuid);

impl RigId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RigId {
    fn default() -> Self {
        Self::new()
    }
}

/// What a rig node is, as far as animation and the safety pass care.
#[derive(Reflect, Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum NodeKind {
    /// Joint of the skeleton.
    #[default]
    Bone,
    /// Mesh node deformed by the skeleton. These are the nodes a bad track makes disappear.
    SkinnedMesh,
    /// Any other node in the hierarchy (scene root, armature container, props).
    Group,
}

#[derive(Clone, Debug)]
pub struct Bone {
    name: String,
    parent: Option<usize>,
    kind: NodeKind,
    rest: Transform,
    pub transform: Transform,
    pub visible: bool,
}

impl Bone {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_skinned(&self) -> bool {
        self.kind == NodeKind::SkinnedMesh
    }

    /// Transform the node had when the rig was loaded.
    pub fn rest(&self) -> Transform {
        self.rest
    }
}

/// Bone hierarchy of a loaded character plus its optional facial blend shapes.
///
/// Nodes are stored in insertion order and referred to by index. The order never changes once
/// the rig is handed to the animator.
#[derive(Clone, Default)]
pub struct Rig {
    id: RigId,
    bones: Vec<Bone>,
    name_to_index: HashMap<String, usize>,
    children: Vec<Vec<usize>>,
    blend_shapes: Option<BlendShapeTable>,
}

impl Rig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: RigId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Appends a node and returns its index. A parent index that does not refer to an already
    /// added node is treated as no parent.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        parent: Option<usize>,
        kind: NodeKind,
        rest: Transform,
    ) -> usize {
        let index = self.bones.len();
        let name = name.into();
        let parent = parent.filter(|p| *p < index);

        if let Some(parent) = parent {
            self.children[parent].push(index);
        }
        self.name_to_index.entry(name.clone()).or_insert(index);
        self.children.push(vec![]);
        self.bones.push(Bone {
            name,
            parent,
            kind,
            rest,
            transform: rest,
            visible: true,
        });

        index
    }

    pub fn add_bone(&mut self, name: impl Into<String>, parent: Option<usize>) -> usize {
        self.add_node(name, parent, NodeKind::Bone, Transform::IDENTITY)
    }

    pub fn with_blend_shapes(mut self, table: BlendShapeTable) -> Self {
        self.blend_shapes = Some(table);
        self
    }

    pub fn set_blend_shapes(&mut self, table: Option<BlendShapeTable>) {
        self.blend_shapes = table;
    }

    pub fn id(&self) -> RigId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bones_mut(&mut self) -> &mut [Bone] {
        &mut self.bones
    }

    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    pub fn bone_mut(&mut self, index: usize) -> Option<&mut Bone> {
        self.bones.get_mut(index)
    }

    /// Index of the first node with exactly this name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn bone_names(&self) -> impl Iterator<Item = &str> {
        self.bones.iter().map(|b| b.name.as_str())
    }

    pub fn children(&self, index: usize) -> &[usize] {
        self.children.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.bones.get(index).and_then(|b| b.parent)
    }

    /// First node without a parent.
    pub fn root(&self) -> Option<usize> {
        self.bones.iter().position(|b| b.parent.is_none())
    }

    pub fn skinned_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_skinned())
            .map(|(i, _)| i)
    }

    pub fn blend_shapes(&self) -> Option<&BlendShapeTable> {
        self.blend_shapes.as_ref()
    }

    pub fn blend_shapes_mut(&mut self) -> Option<&mut BlendShapeTable> {
        self.blend_shapes.as_mut()
    }

    /// Puts every node back into its rest transform and makes it visible.
    pub fn reset_to_rest(&mut self) {
        for bone in &mut self.bones {
            bone.transform = bone.rest;
            bone.visible = true;
        }
    }

    fn indent(f: &mut std::fmt::Formatter<'_>, level: u32) -> std::fmt::Result {
        if level == 0 {
            return Ok(());
        }
        for _ in 0..(level - 1) {
            write!(f, "┃ ")?;
        }
        write!(f, "┣━")?;
        Ok(())
    }

    fn fmt_level(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        level: u32,
        nodes: &[usize],
    ) -> std::fmt::Result {
        for &index in nodes {
            let bone = &self.bones[index];
            Self::indent(f, level)?;
            let marker = match bone.kind {
                NodeKind::Bone => "🦴",
                NodeKind::SkinnedMesh => "🧍",
                NodeKind::Group => "📦",
            };
            writeln!(f, "{marker} {:?} [{index}]", bone.name)?;
            self.fmt_level(f, level + 1, &self.children[index])?;
        }
        Ok(())
    }
}

impl Debug for Rig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Rig hierarchy:")?;
        let roots: Vec<usize> = self
            .bones
            .iter()
            .enumerate()
            .filter(|(_, b)| b.parent.is_none())
            .map(|(i, _)| i)
            .collect();
        self.fmt_level(f, 0, &roots)?;
        if let Some(table) = &self.blend_shapes {
            writeln!(f, "Blend shapes: {:?}", table.names().collect::<Vec<_>>())?;
        }
        Ok(())
    }
}

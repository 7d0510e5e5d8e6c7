use nalgebra::Vector3;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            position: Vector3::zeros(),
            rotation: Vector3::zeros(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Transform {
            position: Vector3::new(x, y, z),
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Style {
    Solid,
    Wireframe,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeShape {
    /// Instance of a model held by the model library.
    Model { key: String, style: Style },
    /// Plain colored box, used for the minigame obstacles.
    Cuboid { size: Vector3<f32> },
}

#[derive(Clone, Debug)]
pub struct Node {
    pub shape: NodeShape,
    pub transform: Transform,
    pub color: (f32, f32, f32),
    pub visible: bool,
}

impl Node {
    pub fn new(shape: NodeShape, transform: Transform, color: (f32, f32, f32)) -> Self {
        Node { shape, transform, color, visible: true }
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn from_center_size(center: Vector3<f32>, size: Vector3<f32>) -> Self {
        let half = size / 2.0;
        Aabb { min: center - half, max: center + half }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }
}

/// The scene service the simulation talks to. Nodes are owned by the scene;
/// callers keep `NodeId` handles.
pub trait Scene {
    fn add_node(&mut self, node: Node) -> NodeId;
    fn remove_node(&mut self, id: NodeId);
    fn node(&self, id: NodeId) -> Option<&Node>;
    fn transform_mut(&mut self, id: NodeId) -> Option<&mut Transform>;
    fn set_visible(&mut self, id: NodeId, visible: bool);

    fn set_transform(&mut self, id: NodeId, transform: Transform) {
        if let Some(t) = self.transform_mut(id) {
            *t = transform;
        }
    }

    fn transform(&self, id: NodeId) -> Option<Transform> {
        self.node(id).map(|n| n.transform)
    }
}

/// Retained node store. The renderer walks it once per frame.
#[derive(Default)]
pub struct SceneGraph {
    nodes: BTreeMap<NodeId, Node>,
    next_id: u32,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }
}

impl Scene for SceneGraph {
    fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    fn remove_node(&mut self, id: NodeId) {
        self.nodes.remove(&id);
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn transform_mut(&mut self, id: NodeId) -> Option<&mut Transform> {
        self.nodes.get_mut(&id).map(|n| &mut n.transform)
    }

    fn set_visible(&mut self, id: NodeId, visible: bool) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.visible = visible;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cuboid() -> Node {
        Node::new(
            NodeShape::Cuboid { size: Vector3::new(2.0, 2.0, 2.0) },
            Transform::default(),
            (1.0, 1.0, 0.0),
        )
    }

    #[test]
    fn removed_nodes_are_gone_and_ids_are_not_reused() {
        let mut scene = SceneGraph::new();
        let a = scene.add_node(cuboid());
        scene.remove_node(a);
        let b = scene.add_node(cuboid());
        assert_ne!(a, b);
        assert!(!scene.contains(a));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn set_transform_on_missing_node_is_ignored() {
        let mut scene = SceneGraph::new();
        let a = scene.add_node(cuboid());
        scene.remove_node(a);
        scene.set_transform(a, Transform::at(1.0, 2.0, 3.0));
        assert!(scene.transform(a).is_none());
    }

    #[test]
    fn boxes_touching_on_a_face_intersect() {
        let a = Aabb::from_center_size(Vector3::zeros(), Vector3::new(2.0, 2.0, 2.0));
        let b = Aabb::from_center_size(Vector3::new(2.0, 0.0, 0.0), Vector3::new(2.0, 2.0, 2.0));
        let c = Aabb::from_center_size(Vector3::new(2.1, 0.0, 0.0), Vector3::new(2.0, 2.0, 2.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}

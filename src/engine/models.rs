use crate::engine::mesh::Mesh;
use crate::engine::scene::{Node, NodeId, NodeShape, Scene, Style, Transform};
use crate::error::GameError;
use std::collections::HashMap;
use std::rc::Rc;

/// A loaded model. Cloning shares the mesh, so instancing is cheap.
#[derive(Clone)]
pub struct Model {
    pub mesh: Rc<Mesh>,
    pub color: (f32, f32, f32),
    pub wire_color: (f32, f32, f32),
}

impl Model {
    pub fn new(mesh: Mesh, color: (f32, f32, f32), wire_color: (f32, f32, f32)) -> Self {
        Model { mesh: Rc::new(mesh), color, wire_color }
    }

    pub fn from_gltf(bytes: &[u8], color: (f32, f32, f32), wire_color: (f32, f32, f32)) -> Result<Self, GameError> {
        Ok(Model::new(Mesh::from_gltf(bytes)?, color, wire_color))
    }
}

/// Paired handles for a model instance and its wireframe twin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodePair {
    pub visual: NodeId,
    pub wireframe: NodeId,
}

impl NodePair {
    pub fn remove(&self, scene: &mut dyn Scene) {
        scene.remove_node(self.visual);
        scene.remove_node(self.wireframe);
    }

    /// Copies the visual's transform onto the wireframe twin.
    pub fn sync(&self, scene: &mut dyn Scene) {
        if let Some(t) = scene.transform(self.visual) {
            scene.set_transform(self.wireframe, t);
        }
    }

    pub fn set_visibility(&self, scene: &mut dyn Scene, visual: bool, wireframe: bool) {
        scene.set_visible(self.visual, visual);
        scene.set_visible(self.wireframe, wireframe);
    }
}

#[derive(Default)]
pub struct ModelLibrary {
    models: HashMap<String, Model>,
}

impl ModelLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, model: Model) {
        log::info!("Model '{}' ready", key);
        self.models.insert(key.to_string(), model);
    }

    pub fn get_model(&self, key: &str) -> Option<&Model> {
        self.models.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.models.contains_key(key)
    }

    /// Adds one instance of `key` to the scene.
    pub fn create_instance(
        &self,
        scene: &mut dyn Scene,
        key: &str,
        style: Style,
        transform: Transform,
    ) -> Option<NodeId> {
        let Some(model) = self.models.get(key) else {
            log::error!("Model {} not found", key);
            return None;
        };
        let color = match style {
            Style::Solid => model.color,
            Style::Wireframe => model.wire_color,
        };
        let shape = NodeShape::Model { key: key.to_string(), style };
        Some(scene.add_node(Node::new(shape, transform, color)))
    }

    /// Adds a solid instance and its wireframe twin with identical transforms.
    pub fn create_pair(&self, scene: &mut dyn Scene, key: &str, transform: Transform) -> Option<NodePair> {
        let visual = self.create_instance(scene, key, Style::Solid, transform)?;
        let Some(wireframe) = self.create_instance(scene, key, Style::Wireframe, transform) else {
            scene.remove_node(visual);
            return None;
        };
        Some(NodePair { visual, wireframe })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scene::SceneGraph;

    fn library() -> ModelLibrary {
        let mut models = ModelLibrary::new();
        models.insert("palm", Model::new(Mesh::cube(1.0, 1.0, 1.0, 1.0), (0.3, 0.6, 1.0), (1.0, 0.9, 0.5)));
        models
    }

    #[test]
    fn pair_shares_transform_and_uses_style_colors() {
        let models = library();
        let mut scene = SceneGraph::new();
        let pair = models.create_pair(&mut scene, "palm", Transform::at(11.0, 0.0, -100.0)).unwrap();

        let visual = scene.node(pair.visual).unwrap();
        let wire = scene.node(pair.wireframe).unwrap();
        assert_eq!(visual.transform, wire.transform);
        assert_eq!(visual.color, (0.3, 0.6, 1.0));
        assert_eq!(wire.color, (1.0, 0.9, 0.5));
    }

    #[test]
    fn unknown_model_creates_nothing() {
        let models = library();
        let mut scene = SceneGraph::new();
        assert!(models.create_pair(&mut scene, "rocksm", Transform::default()).is_none());
        assert!(scene.is_empty());
    }

    #[test]
    fn sync_copies_visual_onto_wireframe() {
        let models = library();
        let mut scene = SceneGraph::new();
        let pair = models.create_pair(&mut scene, "palm", Transform::default()).unwrap();
        scene.set_transform(pair.visual, Transform::at(0.0, 0.0, 42.0));
        pair.sync(&mut scene);
        assert_eq!(scene.transform(pair.wireframe).unwrap().position.z, 42.0);
    }
}

use wgpu::Device;

use crate::gfx::{
    camera::camera_utils::CameraManager,
    lighting::LightingRig,
    resources::material::{Material, MaterialManager},
};

use super::object::Object;

/// Scene root owning every visual element for the session lifetime
///
/// Objects, materials, lights, and the camera live here. The loaded asset
/// is attached exactly once, after normalization; before that the scene is
/// simply the lit, empty stage.
pub struct Scene {
    pub camera_manager: CameraManager,
    pub objects: Vec<Object>,
    pub material_manager: MaterialManager,
    pub lighting: LightingRig,
}

impl Scene {
    /// Creates a new scene with the given camera manager
    pub fn new(camera_manager: CameraManager) -> Self {
        Self {
            camera_manager,
            objects: Vec::new(),
            material_manager: MaterialManager::new(),
            lighting: LightingRig::default(),
        }
    }

    /// Per-frame update: camera damping step and refreshed matrices
    pub fn update(&mut self) {
        self.camera_manager.update();
    }

    /// Attaches a normalized asset's objects and materials in one step
    ///
    /// Callers normalize before attaching; once this returns, the next
    /// frame sees the complete asset.
    pub fn attach_objects(&mut self, objects: Vec<Object>, materials: Vec<Material>) {
        for material in materials {
            self.material_manager.add_material(material);
        }
        for mut object in objects {
            object.name = self.ensure_unique_name(&object.name);
            self.objects.push(object);
        }
    }

    /// Initializes GPU resources for all objects and materials
    ///
    /// Must be called after the GPU context is available and before
    /// rendering newly attached content.
    pub fn init_gpu_resources(&mut self, device: &Device, queue: &wgpu::Queue) {
        for object in self.objects.iter_mut() {
            if object.gpu_resources.is_none() {
                object.init_gpu_resources(device);
            }
        }
        self.material_manager.update_all_gpu_resources(device, queue);
    }

    /// Gets material for rendering an object
    pub fn get_material_for_object(&self, object: &Object) -> &Material {
        self.material_manager
            .get_material_for_object(object.get_material_id())
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn ensure_unique_name(&self, desired_name: &str) -> String {
        let base = if desired_name.is_empty() {
            "object"
        } else {
            desired_name
        };
        let mut counter = 0;
        let mut test_name = base.to_string();

        while self.objects.iter().any(|obj| obj.name == test_name) {
            counter += 1;
            test_name = format!("{} ({})", base, counter);
        }

        test_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::{CameraController, CameraManager, OrbitCamera};
    use crate::gfx::scene::object::Mesh;

    fn test_scene() -> Scene {
        let camera = OrbitCamera::new(1.0);
        let controller = CameraController::new(0.005, 0.1);
        Scene::new(CameraManager::new(camera, controller))
    }

    fn triangle_object(name: &str) -> Object {
        let mesh = Mesh::new(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            vec![],
            vec![],
            vec![0, 1, 2],
        );
        let mut object = Object::new(vec![mesh]);
        object.set_name(name);
        object
    }

    #[test]
    fn attach_adds_objects_and_materials() {
        let mut scene = test_scene();
        let material = Material::new("body", [1.0, 0.0, 0.0, 1.0], 0.0, 0.5);
        scene.attach_objects(vec![triangle_object("mesh")], vec![material]);

        assert_eq!(scene.object_count(), 1);
        assert!(scene.material_manager.get_material("body").is_some());
    }

    #[test]
    fn colliding_names_are_made_unique() {
        let mut scene = test_scene();
        scene.attach_objects(vec![triangle_object("part")], vec![]);
        scene.attach_objects(vec![triangle_object("part")], vec![]);

        assert_eq!(scene.objects[0].name, "part");
        assert_eq!(scene.objects[1].name, "part (1)");
    }

    #[test]
    fn empty_scene_stays_valid_after_update() {
        let mut scene = test_scene();
        scene.update();
        assert_eq!(scene.object_count(), 0);
    }
}

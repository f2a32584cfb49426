//! Asset normalization
//!
//! Every loaded asset is recentered on the origin and scaled so its largest
//! dimension spans a fixed viewing size, exactly once, before it is
//! attached to the scene. The correction is applied as an incremental
//! world-space transform, so it stays correct whatever transforms the
//! asset's nodes already carry.

use cgmath::{Matrix4, Vector3, Vector4};

use crate::gfx::scene::object::Object;

/// Canonical size the largest asset dimension is scaled to
pub const NORMALIZED_EXTENT: f32 = 3.0;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn from_points(points: impl IntoIterator<Item = Vector3<f32>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut aabb = Aabb {
            min: first,
            max: first,
        };
        for p in iter {
            aabb.expand(p);
        }
        Some(aabb)
    }

    pub fn expand(&mut self, p: Vector3<f32>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) / 2.0
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Largest extent along any axis
    pub fn max_extent(&self) -> f32 {
        let size = self.size();
        size.x.max(size.y).max(size.z)
    }
}

/// What normalization did to the asset
#[derive(Debug, Clone, Copy)]
pub struct NormalizeReport {
    pub offset: Vector3<f32>,
    pub scale: f32,
}

/// World-space bounding box over every vertex of every object
pub fn world_aabb(objects: &[Object]) -> Option<Aabb> {
    let points = objects.iter().flat_map(|object| {
        object.meshes.iter().flat_map(move |mesh| {
            mesh.vertices().iter().map(move |vertex| {
                let p = object.transform
                    * Vector4::new(
                        vertex.position[0],
                        vertex.position[1],
                        vertex.position[2],
                        1.0,
                    );
                Vector3::new(p.x, p.y, p.z)
            })
        })
    });
    Aabb::from_points(points)
}

/// Centers the objects on the origin and scales them to the canonical size
///
/// The translation is applied first, then a uniform scale of
/// `NORMALIZED_EXTENT / max_extent` about the origin. A degenerate extent
/// (zero, or not finite) skips the scale step entirely; the offset still
/// applies. Returns `None` when there is no geometry at all.
pub fn normalize_objects(objects: &mut [Object]) -> Option<NormalizeReport> {
    let aabb = world_aabb(objects)?;
    let center = aabb.center();
    let extent = aabb.max_extent();

    let offset = -center;
    for object in objects.iter_mut() {
        object.apply_transform(Matrix4::from_translation(offset));
    }

    let scale = if extent.is_finite() && extent > 0.0 {
        NORMALIZED_EXTENT / extent
    } else {
        log::warn!("degenerate asset bounds (extent {}), skipping scale", extent);
        1.0
    };
    if scale != 1.0 {
        for object in objects.iter_mut() {
            object.apply_transform(Matrix4::from_scale(scale));
        }
    }

    Some(NormalizeReport { offset, scale })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::scene::object::Mesh;
    use cgmath::InnerSpace;

    /// Box mesh with the given center and size, as flat position data
    fn box_object(center: [f32; 3], size: [f32; 3]) -> Object {
        let h = [size[0] / 2.0, size[1] / 2.0, size[2] / 2.0];
        let mut positions = Vec::new();
        for sx in [-1.0f32, 1.0] {
            for sy in [-1.0f32, 1.0] {
                for sz in [-1.0f32, 1.0] {
                    positions.push(center[0] + sx * h[0]);
                    positions.push(center[1] + sy * h[1]);
                    positions.push(center[2] + sz * h[2]);
                }
            }
        }
        // Index data irrelevant for bounds; a couple of faces suffice.
        let indices = vec![0, 1, 2, 2, 1, 3, 4, 5, 6, 6, 5, 7];
        Object::new(vec![Mesh::new(positions, vec![], vec![], indices)])
    }

    #[test]
    fn aabb_from_vertices() {
        let object = box_object([1.0, 2.0, 3.0], [2.0, 4.0, 6.0]);
        let aabb = world_aabb(&[object]).unwrap();
        assert_eq!(aabb.min, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(aabb.max, Vector3::new(2.0, 4.0, 6.0));
        assert_eq!(aabb.max_extent(), 6.0);
    }

    #[test]
    fn normalizes_center_and_extent() {
        // Raw bounds: center (10, 5, -2), size (4, 2, 8).
        let mut objects = vec![box_object([10.0, 5.0, -2.0], [4.0, 2.0, 8.0])];

        let report = normalize_objects(&mut objects).unwrap();

        assert!((report.scale - 0.375).abs() < 1e-6);
        assert!((report.offset - Vector3::new(-10.0, -5.0, 2.0)).magnitude() < 1e-6);

        let aabb = world_aabb(&objects).unwrap();
        assert!(aabb.center().magnitude() < 1e-5);
        assert!((aabb.max_extent() - NORMALIZED_EXTENT).abs() < 1e-5);
    }

    #[test]
    fn normalization_is_incremental_over_existing_transforms() {
        let mut object = box_object([0.0, 0.0, 0.0], [2.0, 2.0, 2.0]);
        // The asset arrives with a node transform already applied.
        object.translate(Vector3::new(100.0, 0.0, 0.0));
        let mut objects = vec![object];

        normalize_objects(&mut objects).unwrap();

        let aabb = world_aabb(&objects).unwrap();
        assert!(aabb.center().magnitude() < 1e-4);
        assert!((aabb.max_extent() - NORMALIZED_EXTENT).abs() < 1e-4);
    }

    #[test]
    fn degenerate_extent_skips_scaling() {
        // A single point has zero extent in every axis.
        let mesh = Mesh::new(vec![7.0, -3.0, 2.0], vec![], vec![], vec![]);
        let mut objects = vec![Object::new(vec![mesh])];

        let report = normalize_objects(&mut objects).unwrap();

        assert_eq!(report.scale, 1.0);
        let aabb = world_aabb(&objects).unwrap();
        assert!(aabb.center().magnitude() < 1e-6);
        // Transforms stay finite.
        let m: [[f32; 4]; 4] = objects[0].transform.into();
        assert!(m.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn empty_input_yields_no_report() {
        let mut objects: Vec<Object> = Vec::new();
        assert!(normalize_objects(&mut objects).is_none());
        let mut no_geometry = vec![Object::new(vec![])];
        assert!(normalize_objects(&mut no_geometry).is_none());
    }

    #[test]
    fn spans_multiple_objects() {
        let mut objects = vec![
            box_object([-4.0, 0.0, 0.0], [2.0, 2.0, 2.0]),
            box_object([4.0, 0.0, 0.0], [2.0, 2.0, 2.0]),
        ];
        // Combined bounds: x in [-5, 5] -> extent 10.
        let report = normalize_objects(&mut objects).unwrap();
        assert!((report.scale - 0.3).abs() < 1e-6);

        let aabb = world_aabb(&objects).unwrap();
        assert!((aabb.max_extent() - NORMALIZED_EXTENT).abs() < 1e-5);
    }
}

//! Octree over vertex positions for brush radius queries.
//!
//! Rebuilt per stroke step from the live mesh; the brush asks it for every
//! vertex inside the falloff sphere, and mirroring uses it to find the
//! partner of a reflected position.

use glam::Vec3;
use mesh::geom::Aabb;
use mesh::half_edge::{HalfEdgeMesh, VertexId};

/// Construction limits, passed in explicitly.
#[derive(Debug, Clone)]
pub struct OctreeConfig {
    /// Maximum tree depth before leaves stop splitting
    pub max_depth: u32,
    /// Items a leaf holds before it splits
    pub leaf_capacity: usize,
    /// Smallest node edge length worth splitting
    pub min_node_size: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            leaf_capacity: 16,
            min_node_size: 1e-3,
        }
    }
}

#[derive(Debug)]
struct Node {
    bounds: Aabb,
    items: Vec<(VertexId, Vec3)>,
    children: Option<Box<[Node; 8]>>,
}

/// A spatial octree over vertex positions.
#[derive(Debug)]
pub struct VertexOctree {
    root: Node,
    config: OctreeConfig,
}

impl VertexOctree {
    /// Create an empty octree covering `bounds`.
    pub fn new(bounds: Aabb, config: OctreeConfig) -> Self {
        Self {
            root: Node {
                bounds,
                items: Vec::new(),
                children: None,
            },
            config,
        }
    }

    /// Build an octree over all live vertices of a mesh.
    pub fn from_mesh(mesh: &HalfEdgeMesh) -> Self {
        let mut bounds = mesh.bounds();
        // Pad so vertices on the box faces stay strictly inside
        let padding = bounds.size() * 0.01 + Vec3::splat(1e-4);
        bounds.min -= padding;
        bounds.max += padding;

        let mut octree = Self::new(bounds, OctreeConfig::default());
        for vertex in mesh.vertices() {
            octree.insert(vertex.id, vertex.position);
        }
        octree
    }

    pub fn insert(&mut self, id: VertexId, position: Vec3) {
        Self::insert_into(&mut self.root, id, position, 0, &self.config);
    }

    fn insert_into(node: &mut Node, id: VertexId, position: Vec3, depth: u32, config: &OctreeConfig) {
        if let Some(children) = node.children.as_mut() {
            let octant = octant_index(&node.bounds, position);
            Self::insert_into(&mut children[octant], id, position, depth + 1, config);
            return;
        }

        node.items.push((id, position));

        let splittable = depth < config.max_depth
            && node.bounds.size().min_element() > config.min_node_size * 2.0;
        if node.items.len() > config.leaf_capacity && splittable {
            let children: Vec<Node> = (0..8)
                .map(|octant| Node {
                    bounds: octant_bounds(&node.bounds, octant),
                    items: Vec::new(),
                    children: None,
                })
                .collect();
            let children: Box<[Node; 8]> = match children.try_into() {
                Ok(array) => array,
                Err(_) => return,
            };
            node.children = Some(children);

            let items = std::mem::take(&mut node.items);
            for (item_id, item_position) in items {
                Self::insert_into(node, item_id, item_position, depth, config);
            }
        }
    }

    /// All vertices within `radius` of `center`.
    pub fn query_sphere(&self, center: Vec3, radius: f32) -> Vec<VertexId> {
        let mut result = Vec::new();
        Self::query_node(&self.root, center, radius, &mut result);
        result
    }

    fn query_node(node: &Node, center: Vec3, radius: f32, result: &mut Vec<VertexId>) {
        if !node.bounds.intersects_sphere(center, radius) {
            return;
        }
        let radius_sq = radius * radius;
        for &(id, position) in &node.items {
            if position.distance_squared(center) <= radius_sq {
                result.push(id);
            }
        }
        if let Some(children) = node.children.as_ref() {
            for child in children.iter() {
                Self::query_node(child, center, radius, result);
            }
        }
    }

    /// The vertex closest to `point` within `max_distance`, if any.
    pub fn nearest(&self, point: Vec3, max_distance: f32) -> Option<VertexId> {
        let mut best: Option<(VertexId, f32)> = None;
        Self::nearest_node(&self.root, point, max_distance, &mut best);
        best.map(|(id, _)| id)
    }

    fn nearest_node(node: &Node, point: Vec3, max_distance: f32, best: &mut Option<(VertexId, f32)>) {
        if !node.bounds.intersects_sphere(point, max_distance) {
            return;
        }
        for &(id, position) in &node.items {
            let distance = position.distance(point);
            if distance <= max_distance
                && best.as_ref().map_or(true, |&(_, best_distance)| distance < best_distance)
            {
                *best = Some((id, distance));
            }
        }
        if let Some(children) = node.children.as_ref() {
            for child in children.iter() {
                Self::nearest_node(child, point, max_distance, best);
            }
        }
    }

    pub fn len(&self) -> usize {
        fn count(node: &Node) -> usize {
            node.items.len()
                + node
                    .children
                    .as_ref()
                    .map_or(0, |c| c.iter().map(count).sum())
        }
        count(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn octant_index(bounds: &Aabb, point: Vec3) -> usize {
    let center = bounds.center();
    let mut index = 0;
    if point.x >= center.x {
        index |= 1;
    }
    if point.y >= center.y {
        index |= 2;
    }
    if point.z >= center.z {
        index |= 4;
    }
    index
}

fn octant_bounds(bounds: &Aabb, octant: usize) -> Aabb {
    let center = bounds.center();
    let min = Vec3::new(
        if octant & 1 != 0 { center.x } else { bounds.min.x },
        if octant & 2 != 0 { center.y } else { bounds.min.y },
        if octant & 4 != 0 { center.z } else { bounds.min.z },
    );
    let max = Vec3::new(
        if octant & 1 != 0 { bounds.max.x } else { center.x },
        if octant & 2 != 0 { bounds.max.y } else { center.y },
        if octant & 4 != 0 { bounds.max.z } else { center.z },
    );
    Aabb::new(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_query() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::splat(10.0));
        let mut octree = VertexOctree::new(bounds, OctreeConfig::default());

        octree.insert(VertexId(0), Vec3::splat(1.0));
        octree.insert(VertexId(1), Vec3::splat(2.0));
        octree.insert(VertexId(2), Vec3::splat(8.0));
        assert_eq!(octree.len(), 3);

        let hits = octree.query_sphere(Vec3::splat(1.5), 1.5);
        assert!(hits.contains(&VertexId(0)));
        assert!(hits.contains(&VertexId(1)));
        assert!(!hits.contains(&VertexId(2)));
    }

    #[test]
    fn test_split_preserves_items() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::splat(32.0));
        let mut octree = VertexOctree::new(bounds, OctreeConfig::default());

        // Enough points to force several splits
        for i in 0..200u32 {
            let f = i as f32;
            octree.insert(VertexId(i), Vec3::new(f % 31.0, (f * 0.37) % 31.0, (f * 0.73) % 31.0));
        }
        assert_eq!(octree.len(), 200);

        let all = octree.query_sphere(Vec3::splat(16.0), 100.0);
        assert_eq!(all.len(), 200);
    }

    #[test]
    fn test_from_mesh_covers_all_vertices() {
        let mesh = mesh::half_edge::HalfEdgeMesh::from_faces(
            &[
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.5, 1.0, 0.0),
            ],
            &[vec![0, 1, 2]],
        )
        .unwrap();

        let octree = VertexOctree::from_mesh(&mesh);
        assert_eq!(octree.len(), 3);
        assert_eq!(octree.query_sphere(Vec3::new(0.5, 0.5, 0.0), 2.0).len(), 3);
    }

    #[test]
    fn test_nearest() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::splat(10.0));
        let mut octree = VertexOctree::new(bounds, OctreeConfig::default());
        octree.insert(VertexId(0), Vec3::new(1.0, 0.0, 0.0));
        octree.insert(VertexId(1), Vec3::new(3.0, 0.0, 0.0));

        assert_eq!(octree.nearest(Vec3::new(1.4, 0.0, 0.0), 1.0), Some(VertexId(0)));
        assert_eq!(octree.nearest(Vec3::new(2.6, 0.0, 0.0), 1.0), Some(VertexId(1)));
        assert_eq!(octree.nearest(Vec3::new(6.0, 0.0, 0.0), 1.0), None);
    }
}

//! Ray and sphere intersection queries against the half-edge mesh.
//!
//! Ray tests use the Moller-Trumbore algorithm; quads are tested as two
//! triangles. Tools consume the nearest hit to derive a point of action from
//! pointer input (pointer-to-ray projection happens outside the kernel).

use glam::Vec3;

use crate::half_edge::{FaceId, HalfEdgeMesh, VertexId};

/// Epsilon for floating point comparisons in ray intersection
const EPSILON: f32 = 1e-6;

/// Result of a ray-triangle intersection test
#[derive(Debug, Clone, Copy)]
pub struct TriangleHit {
    /// Distance along the ray to the intersection point
    pub t: f32,
    /// Barycentric coordinate u (weight for vertex 1)
    pub u: f32,
    /// Barycentric coordinate v (weight for vertex 2)
    pub v: f32,
}

/// Nearest intersection against the mesh surface.
#[derive(Debug, Clone, Copy)]
pub struct MeshHit {
    /// Surface position of the hit
    pub position: Vec3,
    /// Interpolated surface normal at the hit
    pub normal: Vec3,
    /// The face that was hit
    pub face: FaceId,
    /// Distance from the query origin (ray origin or sphere center)
    pub distance: f32,
}

/// Moller-Trumbore ray-triangle intersection.
///
/// `ray_dir` should be normalized for consistent `t` values. Returns hits in
/// front of the origin only.
pub fn ray_triangle_intersection(
    ray_origin: Vec3,
    ray_dir: Vec3,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
) -> Option<TriangleHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let pvec = ray_dir.cross(edge2);
    let det = edge1.dot(pvec);

    // Ray lies in the triangle plane or misses entirely
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    let tvec = ray_origin - v0;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(edge1);
    let v = ray_dir.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(qvec) * inv_det;
    if t < EPSILON {
        return None;
    }

    Some(TriangleHit { t, u, v })
}

/// Closest point on a triangle to an arbitrary point.
pub fn closest_point_on_triangle(point: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = point - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = point - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = point - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// Cast a ray against every face and return the nearest hit.
pub fn intersect_ray(mesh: &HalfEdgeMesh, ray_origin: Vec3, ray_dir: Vec3) -> Option<MeshHit> {
    let mut nearest: Option<MeshHit> = None;

    for face in mesh.faces() {
        let loop_verts = mesh.face_vertices(face.id);
        for (a, b, c) in fan_triangles(&loop_verts) {
            let (pa, pb, pc) = match positions(mesh, a, b, c) {
                Some(p) => p,
                None => continue,
            };
            let Some(hit) = ray_triangle_intersection(ray_origin, ray_dir, pa, pb, pc) else {
                continue;
            };
            if nearest.as_ref().is_some_and(|n| n.distance <= hit.t) {
                continue;
            }
            let position = ray_origin + ray_dir * hit.t;
            nearest = Some(MeshHit {
                position,
                normal: interpolated_normal(mesh, (a, b, c), hit.u, hit.v, face.normal),
                face: face.id,
                distance: hit.t,
            });
        }
    }

    nearest
}

/// Nearest point of the mesh surface inside a sphere, or None if the sphere
/// misses the surface.
pub fn intersect_sphere(mesh: &HalfEdgeMesh, center: Vec3, radius: f32) -> Option<MeshHit> {
    let mut nearest: Option<MeshHit> = None;

    for face in mesh.faces() {
        let loop_verts = mesh.face_vertices(face.id);
        for (a, b, c) in fan_triangles(&loop_verts) {
            let (pa, pb, pc) = match positions(mesh, a, b, c) {
                Some(p) => p,
                None => continue,
            };
            let closest = closest_point_on_triangle(center, pa, pb, pc);
            let distance = closest.distance(center);
            if distance > radius {
                continue;
            }
            if nearest.as_ref().is_some_and(|n| n.distance <= distance) {
                continue;
            }
            nearest = Some(MeshHit {
                position: closest,
                normal: face.normal,
                face: face.id,
                distance,
            });
        }
    }

    nearest
}

/// Fan-triangulate a face loop for intersection tests (one triangle for a
/// triangle, two for a quad).
fn fan_triangles(loop_verts: &[VertexId]) -> Vec<(VertexId, VertexId, VertexId)> {
    match loop_verts {
        [a, b, c] => vec![(*a, *b, *c)],
        [a, b, c, d] => vec![(*a, *b, *c), (*a, *c, *d)],
        _ => Vec::new(),
    }
}

fn positions(
    mesh: &HalfEdgeMesh,
    a: VertexId,
    b: VertexId,
    c: VertexId,
) -> Option<(Vec3, Vec3, Vec3)> {
    Some((
        mesh.vertex(a)?.position,
        mesh.vertex(b)?.position,
        mesh.vertex(c)?.position,
    ))
}

fn interpolated_normal(
    mesh: &HalfEdgeMesh,
    triangle: (VertexId, VertexId, VertexId),
    u: f32,
    v: f32,
    fallback: Vec3,
) -> Vec3 {
    let Some((na, nb, nc)) = normals(mesh, triangle) else {
        return fallback;
    };
    let w = 1.0 - u - v;
    let normal = na * w + nb * u + nc * v;
    if normal.length_squared() > EPSILON {
        normal.normalize()
    } else {
        fallback
    }
}

fn normals(
    mesh: &HalfEdgeMesh,
    (a, b, c): (VertexId, VertexId, VertexId),
) -> Option<(Vec3, Vec3, Vec3)> {
    Some((
        mesh.vertex(a)?.normal,
        mesh.vertex(b)?.normal,
        mesh.vertex(c)?.normal,
    ))
}

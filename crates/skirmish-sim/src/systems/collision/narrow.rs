//! Narrow-phase overlap tests.
//!
//! Every test returns the penetration depth and, when it is well defined,
//! the unit normal pointing from `a` towards `b`. A missing normal means the
//! centres coincide; the caller substitutes its fallback axis.

use glam::Vec3;

use skirmish_core::components::ColliderShape;
use skirmish_core::constants::COINCIDENT_EPSILON;

/// A collider shape placed in the world.
#[derive(Debug, Clone, Copy)]
pub struct Placed {
    pub shape: ColliderShape,
    pub center: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub normal: Option<Vec3>,
    /// Positive when overlapping.
    pub depth: f32,
}

/// Y-up swept circle: spheres, cylinders and capsules all reduce to this.
#[derive(Debug, Clone, Copy)]
struct Upright {
    center: Vec3,
    radius: f32,
    /// Half height of the full vertical extent, caps included.
    half_extent: f32,
}

fn upright(p: &Placed) -> Option<Upright> {
    match p.shape {
        ColliderShape::Sphere { radius } => Some(Upright {
            center: p.center,
            radius,
            half_extent: radius,
        }),
        ColliderShape::Cylinder {
            radius,
            half_height,
        } => Some(Upright {
            center: p.center,
            radius,
            half_extent: half_height,
        }),
        ColliderShape::Capsule {
            radius,
            half_height,
        } => Some(Upright {
            center: p.center,
            radius,
            half_extent: half_height + radius,
        }),
        ColliderShape::Box { .. } => None,
    }
}

/// Exact or approximate contact between two placed shapes. None when the
/// shapes are separated.
pub fn contact(a: &Placed, b: &Placed) -> Option<Contact> {
    let c = match (a.shape, b.shape) {
        (ColliderShape::Sphere { radius: ra }, ColliderShape::Sphere { radius: rb }) => {
            sphere_sphere(a.center, ra, b.center, rb)
        }
        (ColliderShape::Box { half_extents: ha }, ColliderShape::Box { half_extents: hb }) => {
            box_box(a.center, ha, b.center, hb)
        }
        (ColliderShape::Sphere { radius }, ColliderShape::Box { half_extents }) => {
            sphere_box(a.center, radius, b.center, half_extents)
        }
        (ColliderShape::Box { half_extents }, ColliderShape::Sphere { radius }) => {
            sphere_box(b.center, radius, a.center, half_extents).map(flip)
        }
        _ => match (upright(a), upright(b)) {
            (Some(ua), Some(ub)) => upright_upright(&ua, &ub),
            // Box against cylinder/capsule: bounding spheres.
            _ => sphere_sphere(
                a.center,
                a.shape.bounding_radius(),
                b.center,
                b.shape.bounding_radius(),
            ),
        },
    }?;
    (c.depth > 0.0).then_some(c)
}

fn flip(c: Contact) -> Contact {
    Contact {
        normal: c.normal.map(|n| -n),
        depth: c.depth,
    }
}

fn direction(d: Vec3) -> Option<Vec3> {
    let len = d.length();
    (len > COINCIDENT_EPSILON).then(|| d / len)
}

pub fn sphere_sphere(ca: Vec3, ra: f32, cb: Vec3, rb: f32) -> Option<Contact> {
    let d = cb - ca;
    let depth = ra + rb - d.length();
    (depth > 0.0).then(|| Contact {
        normal: direction(d),
        depth,
    })
}

/// Axis-aligned boxes; pushes along the axis of least penetration.
pub fn box_box(ca: Vec3, ha: Vec3, cb: Vec3, hb: Vec3) -> Option<Contact> {
    let d = cb - ca;
    let overlap = ha + hb - d.abs();
    if overlap.min_element() <= 0.0 {
        return None;
    }
    let (axis, depth) = least_axis(overlap);
    let sign = d[axis].signum();
    let normal = (d[axis].abs() > COINCIDENT_EPSILON).then(|| unit(axis) * sign);
    Some(Contact { normal, depth })
}

/// Sphere at `cs` against an axis-aligned box at `cb`. Normal points from
/// the sphere towards the box.
pub fn sphere_box(cs: Vec3, radius: f32, cb: Vec3, half: Vec3) -> Option<Contact> {
    let local = cs - cb;
    let closest = local.clamp(-half, half);
    let outside = local - closest;
    let dist = outside.length();

    if dist > COINCIDENT_EPSILON {
        let depth = radius - dist;
        return (depth > 0.0).then(|| Contact {
            normal: Some(-outside / dist),
            depth,
        });
    }

    // Centre inside the box: leave through the nearest face.
    let to_face = half - local.abs();
    let (axis, face) = least_axis(to_face);
    let sign = local[axis].signum();
    let normal = (local[axis].abs() > COINCIDENT_EPSILON).then(|| -unit(axis) * sign);
    Some(Contact {
        normal,
        depth: face + radius,
    })
}

/// Lateral push in XZ, or vertical if the vertical overlap is shallower.
fn upright_upright(a: &Upright, b: &Upright) -> Option<Contact> {
    let d = b.center - a.center;
    let lateral = Vec3::new(d.x, 0.0, d.z);
    let lateral_depth = a.radius + b.radius - lateral.length();
    let vertical_depth = a.half_extent + b.half_extent - d.y.abs();
    if lateral_depth <= 0.0 || vertical_depth <= 0.0 {
        return None;
    }

    if vertical_depth < lateral_depth {
        let normal = (d.y.abs() > COINCIDENT_EPSILON).then(|| Vec3::Y * d.y.signum());
        return Some(Contact {
            normal,
            depth: vertical_depth,
        });
    }
    Some(Contact {
        normal: direction(lateral),
        depth: lateral_depth,
    })
}

fn least_axis(v: Vec3) -> (usize, f32) {
    let mut axis = 0;
    for i in 1..3 {
        if v[i] < v[axis] {
            axis = i;
        }
    }
    (axis, v[axis])
}

fn unit(axis: usize) -> Vec3 {
    match axis {
        0 => Vec3::X,
        1 => Vec3::Y,
        _ => Vec3::Z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn placed(shape: ColliderShape, center: Vec3) -> Placed {
        Placed { shape, center }
    }

    #[test]
    fn spheres_overlap_along_centre_line() {
        let a = placed(ColliderShape::Sphere { radius: 1.0 }, Vec3::ZERO);
        let b = placed(ColliderShape::Sphere { radius: 1.0 }, Vec3::new(1.5, 0.0, 0.0));
        let c = contact(&a, &b).unwrap();
        assert_abs_diff_eq!(c.depth, 0.5, epsilon = 1e-6);
        assert_eq!(c.normal, Some(Vec3::X));
    }

    #[test]
    fn separated_spheres_miss() {
        let a = placed(ColliderShape::Sphere { radius: 1.0 }, Vec3::ZERO);
        let b = placed(ColliderShape::Sphere { radius: 1.0 }, Vec3::new(2.5, 0.0, 0.0));
        assert!(contact(&a, &b).is_none());
    }

    #[test]
    fn coincident_spheres_have_no_normal() {
        let a = placed(ColliderShape::Sphere { radius: 1.0 }, Vec3::ZERO);
        let c = contact(&a, &a).unwrap();
        assert!(c.normal.is_none());
        assert_abs_diff_eq!(c.depth, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn sphere_cylinder_pushes_laterally() {
        let cyl = placed(
            ColliderShape::Cylinder {
                radius: 0.5,
                half_height: 2.0,
            },
            Vec3::ZERO,
        );
        let s = placed(ColliderShape::Sphere { radius: 0.5 }, Vec3::new(0.0, 1.0, 0.8));
        let c = contact(&cyl, &s).unwrap();
        assert_abs_diff_eq!(c.depth, 0.2, epsilon = 1e-5);
        assert_eq!(c.normal, Some(Vec3::Z));
    }

    #[test]
    fn capsule_resting_on_cylinder_pushes_up() {
        let cyl = placed(
            ColliderShape::Cylinder {
                radius: 2.0,
                half_height: 0.5,
            },
            Vec3::ZERO,
        );
        let cap = placed(
            ColliderShape::Capsule {
                radius: 0.4,
                half_height: 0.5,
            },
            Vec3::new(0.3, 1.35, 0.0),
        );
        let c = contact(&cyl, &cap).unwrap();
        assert_abs_diff_eq!(c.depth, 0.05, epsilon = 1e-5);
        assert_eq!(c.normal, Some(Vec3::Y));
    }

    #[test]
    fn boxes_use_least_penetration_axis() {
        let c = box_box(Vec3::ZERO, Vec3::ONE, Vec3::new(1.8, 0.5, 0.0), Vec3::ONE).unwrap();
        assert_abs_diff_eq!(c.depth, 0.2, epsilon = 1e-5);
        assert_eq!(c.normal, Some(Vec3::X));
        assert!(box_box(Vec3::ZERO, Vec3::ONE, Vec3::new(2.5, 0.0, 0.0), Vec3::ONE).is_none());
    }

    #[test]
    fn sphere_against_box_face() {
        let s = placed(ColliderShape::Sphere { radius: 0.5 }, Vec3::new(0.0, 1.3, 0.0));
        let b = placed(
            ColliderShape::Box {
                half_extents: Vec3::ONE,
            },
            Vec3::ZERO,
        );
        let c = contact(&s, &b).unwrap();
        assert_abs_diff_eq!(c.depth, 0.2, epsilon = 1e-5);
        // From sphere towards box: down.
        assert_abs_diff_eq!(c.normal.unwrap().y, -1.0, epsilon = 1e-6);
        let flipped = contact(&b, &s).unwrap();
        assert_abs_diff_eq!(flipped.normal.unwrap().y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn box_against_capsule_falls_back_to_bounding_spheres() {
        let b = placed(
            ColliderShape::Box {
                half_extents: Vec3::splat(0.5),
            },
            Vec3::ZERO,
        );
        let cap = placed(
            ColliderShape::Capsule {
                radius: 0.5,
                half_height: 0.5,
            },
            Vec3::new(1.5, 0.0, 0.0),
        );
        let c = contact(&b, &cap).unwrap();
        let expected = Vec3::splat(0.5).length() + 1.0 - 1.5;
        assert_abs_diff_eq!(c.depth, expected, epsilon = 1e-5);
    }
}

//! Collision shape generation from scene mobjects.

use mphys_scene::math::rotate_vec;
use mphys_scene::{MobjectId, MobjectKind, Point2, Scene, Vec2};
use rapier2d::parry::shape::SharedShape;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PhysicsError, Result};
use crate::space::{BodyPose, FallbackPolicy};

/// Stroke width that maps to a zero-radius segment.
///
/// Line thickness is `stroke_width - SEGMENT_THICKNESS_OFFSET`, floored at 0.
pub const SEGMENT_THICKNESS_OFFSET: f64 = 3.95;

/// Coefficients of a dynamic body's collider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicMaterial {
    /// Restitution, combined multiplicatively with the other collider.
    pub elasticity: f64,
    /// Mass per unit area.
    pub density: f64,
    /// Friction, combined multiplicatively with the other collider.
    pub friction: f64,
}

impl Default for DynamicMaterial {
    fn default() -> Self {
        Self {
            elasticity: 0.8,
            density: 1.0,
            friction: 0.8,
        }
    }
}

impl DynamicMaterial {
    /// Validate coefficients.
    pub fn validate(&self) -> Result<()> {
        check_coefficient("elasticity", self.elasticity)?;
        check_coefficient("friction", self.friction)?;
        if !self.density.is_finite() || self.density <= 0.0 {
            return Err(PhysicsError::InvalidMaterial(format!(
                "density must be > 0, got {}",
                self.density
            )));
        }
        Ok(())
    }
}

/// Coefficients of a static collider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaticMaterial {
    /// Restitution.
    pub elasticity: f64,
    /// Friction.
    pub friction: f64,
}

impl Default for StaticMaterial {
    fn default() -> Self {
        Self {
            elasticity: 1.0,
            friction: 0.8,
        }
    }
}

impl StaticMaterial {
    /// Validate coefficients.
    pub fn validate(&self) -> Result<()> {
        check_coefficient("elasticity", self.elasticity)?;
        check_coefficient("friction", self.friction)
    }
}

fn check_coefficient(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(PhysicsError::InvalidMaterial(format!(
            "{name} must be >= 0, got {value}"
        )));
    }
    Ok(())
}

/// Collider geometry in the body's local frame.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryKind {
    /// Ball of the circle's radius.
    Circle {
        /// Radius.
        radius: f64,
    },
    /// Thick segment along the local X axis.
    Segment {
        /// Half the line length.
        half_length: f64,
        /// Thickness radius.
        radius: f64,
    },
    /// Rectangle box.
    Box {
        /// Half width and half height.
        half_extents: Vec2,
    },
    /// Convex polygon from vertices relative to the centre.
    Polygon {
        /// Local vertices.
        vertices: Vec<Point2>,
    },
    /// Axis-aligned bounding box used for unsupported shapes.
    BoundingBox {
        /// Half width and half height.
        half_extents: Vec2,
    },
}

/// Collider geometry plus the world pose of the body that carries it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColliderGeometry {
    /// Local geometry.
    pub kind: GeometryKind,
    /// World position and angle of the body origin.
    pub pose: BodyPose,
}

/// Derive the collider for a mobject.
///
/// The pose is the mobject's centre and its absolute orientation, so that
/// placing the local geometry at the pose reproduces the mobject.
pub fn derive_geometry(
    scene: &Scene,
    id: MobjectId,
    fallback: FallbackPolicy,
) -> Result<ColliderGeometry> {
    let mobject = scene.mobject(id)?;
    let center = scene.center(id)?;
    let angle = mobject.orientation();
    let pose = BodyPose {
        position: center,
        angle,
    };

    let kind = match mobject.kind() {
        MobjectKind::Circle { radius } => GeometryKind::Circle {
            radius: radius.abs(),
        },
        MobjectKind::Line { stroke_width } => {
            let points = mobject.points();
            GeometryKind::Segment {
                half_length: (points[1] - points[0]).norm() / 2.0,
                radius: (stroke_width - SEGMENT_THICKNESS_OFFSET).max(0.0),
            }
        }
        MobjectKind::Rectangle => {
            let v = mobject.points();
            GeometryKind::Box {
                half_extents: Vec2::new((v[0] - v[1]).norm() / 2.0, (v[1] - v[2]).norm() / 2.0),
            }
        }
        MobjectKind::RegularPolygon { .. } | MobjectKind::Polygon => GeometryKind::Polygon {
            vertices: mobject
                .points()
                .iter()
                .map(|p| Point2::from(rotate_vec(&(p - center), -angle)))
                .collect(),
        },
        MobjectKind::Path | MobjectKind::Group { .. } => {
            return match fallback {
                FallbackPolicy::Reject => Err(PhysicsError::UnsupportedGeometry {
                    mobject: id,
                    reason: "no collider for paths or groups; enable the bounding box fallback"
                        .into(),
                }),
                FallbackPolicy::BoundingBox => {
                    warn!(mobject = ?id, "approximating collider with its bounding box");
                    let bbox = scene.bounding_box(id)?;
                    Ok(ColliderGeometry {
                        kind: GeometryKind::BoundingBox {
                            half_extents: bbox.half_extents(),
                        },
                        pose: BodyPose {
                            position: bbox.center(),
                            angle: 0.0,
                        },
                    })
                }
            };
        }
    };

    Ok(ColliderGeometry { kind, pose })
}

/// Build the Rapier shape for derived geometry.
pub fn build_shape(kind: &GeometryKind, mobject: MobjectId) -> Result<SharedShape> {
    let degenerate = |reason: &str| PhysicsError::CollisionShape {
        mobject,
        reason: reason.to_string(),
    };

    match kind {
        GeometryKind::Circle { radius } => {
            if *radius <= 0.0 {
                return Err(degenerate("zero radius"));
            }
            Ok(SharedShape::ball(*radius as f32))
        }
        GeometryKind::Segment {
            half_length,
            radius,
        } => {
            if *half_length <= 0.0 {
                return Err(degenerate("zero-length line"));
            }
            let a = nalgebra::Point2::new(-*half_length as f32, 0.0);
            let b = nalgebra::Point2::new(*half_length as f32, 0.0);
            if *radius > 0.0 {
                Ok(SharedShape::capsule(a, b, *radius as f32))
            } else {
                Ok(SharedShape::segment(a, b))
            }
        }
        GeometryKind::Box { half_extents } | GeometryKind::BoundingBox { half_extents } => {
            if half_extents.x <= 0.0 || half_extents.y <= 0.0 {
                return Err(degenerate("box has no area"));
            }
            Ok(SharedShape::cuboid(
                half_extents.x as f32,
                half_extents.y as f32,
            ))
        }
        GeometryKind::Polygon { vertices } => {
            if polygon_area(vertices).abs() < 1e-12 {
                return Err(degenerate("degenerate polygon"));
            }
            let points: Vec<nalgebra::Point2<f32>> = vertices
                .iter()
                .map(|p| nalgebra::Point2::new(p.x as f32, p.y as f32))
                .collect();
            SharedShape::convex_hull(&points).ok_or_else(|| degenerate("degenerate polygon"))
        }
    }
}

/// Signed shoelace area.
fn polygon_area(vertices: &[Point2]) -> f64 {
    let n = vertices.len();
    (0..n)
        .map(|i| {
            let (a, b) = (vertices[i], vertices[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mphys_scene::Mobject;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_circle_geometry() {
        let mut scene = Scene::new();
        let id = scene.add(Mobject::circle(Point2::new(1.0, 2.0), 0.5).rotated(0.3));
        let geometry = derive_geometry(&scene, id, FallbackPolicy::Reject).unwrap();

        assert_eq!(geometry.kind, GeometryKind::Circle { radius: 0.5 });
        assert_eq!(geometry.pose.position, Point2::new(1.0, 2.0));
        assert_relative_eq!(geometry.pose.angle, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_line_thickness() {
        let mut scene = Scene::new();
        let ground = scene.add(Mobject::line(Point2::new(-4.0, -3.5), Point2::new(4.0, -3.5)));
        let thin = scene.add(
            Mobject::line(Point2::new(0.0, 0.0), Point2::new(0.0, 2.0)).with_stroke_width(1.0),
        );

        let geometry = derive_geometry(&scene, ground, FallbackPolicy::Reject).unwrap();
        match geometry.kind {
            GeometryKind::Segment {
                half_length,
                radius,
            } => {
                assert_relative_eq!(half_length, 4.0);
                assert_relative_eq!(radius, 0.05, epsilon = 1e-12);
            }
            other => panic!("expected a segment, got {other:?}"),
        }
        assert_eq!(geometry.pose.position, Point2::new(0.0, -3.5));

        let geometry = derive_geometry(&scene, thin, FallbackPolicy::Reject).unwrap();
        assert!(matches!(geometry.kind, GeometryKind::Segment { radius, .. } if radius == 0.0));
        assert_relative_eq!(geometry.pose.angle, FRAC_PI_2);
        assert!(build_shape(&geometry.kind, thin).is_ok());
    }

    #[test]
    fn test_rotated_rectangle_keeps_extents() {
        let mut scene = Scene::new();
        let id = scene.add(Mobject::rectangle(Point2::new(0.0, 1.0), 2.0, 1.0).rotated(0.4));
        let geometry = derive_geometry(&scene, id, FallbackPolicy::Reject).unwrap();

        match geometry.kind {
            GeometryKind::Box { half_extents } => {
                assert_relative_eq!(half_extents.x, 1.0, epsilon = 1e-12);
                assert_relative_eq!(half_extents.y, 0.5, epsilon = 1e-12);
            }
            other => panic!("expected a box, got {other:?}"),
        }
        assert_relative_eq!(geometry.pose.angle, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_polygon_vertices_are_local_and_unrotated() {
        let mut scene = Scene::new();
        let id = scene.add(Mobject::triangle(Point2::new(3.0, 3.0), 1.0).rotated(0.5));
        let geometry = derive_geometry(&scene, id, FallbackPolicy::Reject).unwrap();
        assert_relative_eq!(geometry.pose.angle, 0.5, epsilon = 1e-12);

        let GeometryKind::Polygon { vertices } = geometry.kind else {
            panic!("expected a polygon");
        };
        // Apex of the canonical triangle points straight up.
        assert_relative_eq!(vertices[0].x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(vertices[0].y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_path_fallback_policy() {
        let mut scene = Scene::new();
        let path = scene.add(
            Mobject::path(vec![
                Point2::new(0.0, 0.0),
                Point2::new(2.0, 1.0),
                Point2::new(4.0, 0.0),
            ])
            .unwrap(),
        );

        assert!(matches!(
            derive_geometry(&scene, path, FallbackPolicy::Reject),
            Err(PhysicsError::UnsupportedGeometry { .. })
        ));

        let geometry = derive_geometry(&scene, path, FallbackPolicy::BoundingBox).unwrap();
        assert_eq!(
            geometry.kind,
            GeometryKind::BoundingBox {
                half_extents: Vec2::new(2.0, 0.5)
            }
        );
        assert_eq!(geometry.pose.position, Point2::new(2.0, 0.5));
    }

    #[test]
    fn test_degenerate_shapes() {
        let id = MobjectId::default();
        assert!(build_shape(&GeometryKind::Circle { radius: 0.0 }, id).is_err());
        assert!(build_shape(
            &GeometryKind::Segment {
                half_length: 0.0,
                radius: 0.1
            },
            id
        )
        .is_err());
        let collinear = GeometryKind::Polygon {
            vertices: vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(2.0, 0.0),
            ],
        };
        assert!(matches!(
            build_shape(&collinear, id),
            Err(PhysicsError::CollisionShape { .. })
        ));
    }

    #[test]
    fn test_material_validation() {
        assert!(DynamicMaterial::default().validate().is_ok());
        assert!(StaticMaterial::default().validate().is_ok());

        let heavy_nothing = DynamicMaterial {
            density: 0.0,
            ..DynamicMaterial::default()
        };
        assert!(matches!(
            heavy_nothing.validate(),
            Err(PhysicsError::InvalidMaterial(_))
        ));
        let sticky = StaticMaterial {
            friction: -1.0,
            ..StaticMaterial::default()
        };
        assert!(sticky.validate().is_err());
    }
}

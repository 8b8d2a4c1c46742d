//! Scene collaborator.
//!
//! The post-process core needs three things from a scene: advance it, draw
//! it (either the normal materials or only the post-process ones), and find a
//! named entity's world position. [`DemoScene`] is a small fixed scene that
//! exercises every pass.

use glam::{Mat4, Quat, Vec3};

/// Types of meshes available for instantiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshType {
    Cube,
    Plane,
}

/// Surface shading of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Diffuse lit surface.
    Lit { colour: [f32; 4] },
    /// Post-process material: refracts the captured scene behind it.
    Glass { tint: [f32; 4], distortion: f32 },
}

impl Material {
    /// Whether this material samples the scene capture.
    pub fn is_post_process(&self) -> bool {
        matches!(self, Material::Glass { .. })
    }
}

/// A point light with linear falloff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub colour: [f32; 3],
    /// Colour is multiplied by brightness / distance.
    pub brightness: f32,
}

/// One draw in a scene render.
#[derive(Debug, Clone, PartialEq)]
pub struct Renderable {
    pub mesh: MeshType,
    pub world: Mat4,
    pub material: Material,
}

pub trait Scene {
    /// Advance entity animation by `dt` seconds.
    fn update_all(&mut self, dt: f32);

    /// Draws for a scene render. With `post_process_materials_only` false
    /// this is every entity drawn through the normal material path; with it
    /// true, only entities whose material samples the scene capture.
    fn render_list(&self, post_process_materials_only: bool) -> Vec<Renderable>;

    /// World position of the named entity.
    fn entity_position(&self, name: &str) -> Option<Vec3>;

    fn lights(&self) -> Vec<PointLight>;

    fn has_post_process_materials(&self) -> bool {
        !self.render_list(true).is_empty()
    }
}

/// Entity spin, in degrees per second.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Spin {
    /// About the entity's own axes.
    pub local: Vec3,
    /// About the world Y axis.
    pub world_y: f32,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub mesh: MeshType,
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
    pub material: Material,
    pub spin: Spin,
}

impl Entity {
    pub fn new(name: impl Into<String>, mesh: MeshType, position: Vec3, material: Material) -> Self {
        Self {
            name: name.into(),
            mesh,
            position,
            orientation: Quat::IDENTITY,
            scale: Vec3::ONE,
            material,
            spin: Spin::default(),
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_spin(mut self, spin: Spin) -> Self {
        self.spin = spin;
        self
    }

    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation, self.position)
    }

    fn update(&mut self, dt: f32) {
        let local = self.spin.local * dt;
        if local != Vec3::ZERO {
            self.orientation *= Quat::from_rotation_x(local.x.to_radians())
                * Quat::from_rotation_y(local.y.to_radians())
                * Quat::from_rotation_z(local.z.to_radians());
        }
        if self.spin.world_y != 0.0 {
            self.orientation = Quat::from_rotation_y((self.spin.world_y * dt).to_radians()) * self.orientation;
        }
        self.orientation = self.orientation.normalize();
    }
}

/// A floor, a spinning cube, a glass block and a few static cubes.
#[derive(Debug, Clone)]
pub struct DemoScene {
    entities: Vec<Entity>,
    lights: Vec<PointLight>,
}

impl Default for DemoScene {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoScene {
    /// Light that follows "Cubey".
    const CUBEY_LIGHT: usize = 1;

    pub fn new() -> Self {
        let entities = vec![
            Entity::new(
                "Floor",
                MeshType::Plane,
                Vec3::ZERO,
                Material::Lit { colour: [0.55, 0.55, 0.5, 1.0] },
            )
            .with_scale(Vec3::new(400.0, 1.0, 400.0)),
            Entity::new(
                "Cubey",
                MeshType::Cube,
                Vec3::new(0.0, 15.0, 0.0),
                Material::Lit { colour: [0.9, 0.35, 0.2, 1.0] },
            )
            .with_scale(Vec3::splat(10.0))
            .with_spin(Spin {
                local: Vec3::new(53.0, 0.0, 42.0),
                world_y: 12.0,
            }),
            Entity::new(
                "PostProcessBlock",
                MeshType::Cube,
                Vec3::new(30.0, 12.0, 40.0),
                Material::Glass {
                    tint: [0.8, 0.95, 1.0, 1.0],
                    distortion: 0.02,
                },
            )
            .with_scale(Vec3::new(16.0, 24.0, 4.0))
            .with_spin(Spin {
                local: Vec3::ZERO,
                world_y: 30.0,
            }),
            Entity::new(
                "CrateA",
                MeshType::Cube,
                Vec3::new(-40.0, 6.0, -20.0),
                Material::Lit { colour: [0.3, 0.6, 0.3, 1.0] },
            )
            .with_scale(Vec3::splat(12.0)),
            Entity::new(
                "CrateB",
                MeshType::Cube,
                Vec3::new(45.0, 5.0, -35.0),
                Material::Lit { colour: [0.3, 0.4, 0.8, 1.0] },
            )
            .with_scale(Vec3::splat(10.0)),
        ];

        let lights = vec![
            PointLight {
                position: Vec3::new(-10000.0, 6000.0, 0.0),
                colour: [1.0, 0.8, 0.6],
                brightness: 12000.0,
            },
            PointLight {
                position: Vec3::new(0.0, 15.0, 0.0),
                colour: [0.0, 0.2, 1.0],
                brightness: 50.0,
            },
        ];

        Self { entities, lights }
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }
}

impl Scene for DemoScene {
    fn update_all(&mut self, dt: f32) {
        for entity in &mut self.entities {
            entity.update(dt);
        }
        if let Some(position) = self.entity_position("Cubey") {
            self.lights[Self::CUBEY_LIGHT].position = position;
        }
    }

    fn render_list(&self, post_process_materials_only: bool) -> Vec<Renderable> {
        self.entities
            .iter()
            .filter(|e| e.material.is_post_process() == post_process_materials_only)
            .map(|e| Renderable {
                mesh: e.mesh,
                world: e.world_matrix(),
                material: e.material,
            })
            .collect()
    }

    fn entity_position(&self, name: &str) -> Option<Vec3> {
        self.entity(name).map(|e| e.position)
    }

    fn lights(&self) -> Vec<PointLight> {
        self.lights.clone()
    }
}

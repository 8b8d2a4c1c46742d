//! Interface to the shading stage.
//!
//! The post-process shaders expose a fixed set of named variables. Names are
//! resolved once against the compiled shader library at setup; afterwards
//! values are pushed through [`ParameterSink`] using the typed [`ShaderVar`]
//! handles, so a misspelt name can only fail at startup.

use std::collections::HashMap;

/// Every shader variable the post-process core writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderVar {
    SceneTexture,
    PostProcessMap,
    AreaTopLeft,
    AreaBottomRight,
    AreaDepth,
    TintColour,
    NoiseScale,
    NoiseOffset,
    DistortLevel,
    BurnLevel,
    SpiralTimer,
    HeatHazeTimer,
    SceneTextureWidth,
    SceneTextureHeight,
    RippleTime,
    RipplePosition,
    ShockwaveScale,
    ShockwaveSin,
}

impl ShaderVar {
    pub const ALL: [ShaderVar; 18] = [
        ShaderVar::SceneTexture,
        ShaderVar::PostProcessMap,
        ShaderVar::AreaTopLeft,
        ShaderVar::AreaBottomRight,
        ShaderVar::AreaDepth,
        ShaderVar::TintColour,
        ShaderVar::NoiseScale,
        ShaderVar::NoiseOffset,
        ShaderVar::DistortLevel,
        ShaderVar::BurnLevel,
        ShaderVar::SpiralTimer,
        ShaderVar::HeatHazeTimer,
        ShaderVar::SceneTextureWidth,
        ShaderVar::SceneTextureHeight,
        ShaderVar::RippleTime,
        ShaderVar::RipplePosition,
        ShaderVar::ShockwaveScale,
        ShaderVar::ShockwaveSin,
    ];

    /// Name of the variable in the shader library.
    pub fn name(self) -> &'static str {
        match self {
            ShaderVar::SceneTexture => "SceneTexture",
            ShaderVar::PostProcessMap => "PostProcessMap",
            ShaderVar::AreaTopLeft => "PPAreaTopLeft",
            ShaderVar::AreaBottomRight => "PPAreaBottomRight",
            ShaderVar::AreaDepth => "PPAreaDepth",
            ShaderVar::TintColour => "TintColour",
            ShaderVar::NoiseScale => "NoiseScale",
            ShaderVar::NoiseOffset => "NoiseOffset",
            ShaderVar::DistortLevel => "DistortLevel",
            ShaderVar::BurnLevel => "BurnLevel",
            ShaderVar::SpiralTimer => "SpiralTimer",
            ShaderVar::HeatHazeTimer => "HeatHazeTimer",
            ShaderVar::SceneTextureWidth => "SceneTextureWidth",
            ShaderVar::SceneTextureHeight => "SceneTextureHeight",
            ShaderVar::RippleTime => "RippleTime",
            ShaderVar::RipplePosition => "RipplePosition",
            ShaderVar::ShockwaveScale => "ShockwaveScale",
            ShaderVar::ShockwaveSin => "ShockwaveSin",
        }
    }
}

/// Runtime value for a shader variable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

impl Default for ParamValue {
    fn default() -> Self {
        ParamValue::Float(0.0)
    }
}

impl ParamValue {
    /// Convert to bytes for GPU upload.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ParamValue::Float(v) => bytemuck::cast_slice(&[*v]).to_vec(),
            ParamValue::Vec2(v) => bytemuck::cast_slice(v).to_vec(),
            ParamValue::Vec3(v) => bytemuck::cast_slice(v).to_vec(),
            ParamValue::Vec4(v) => bytemuck::cast_slice(v).to_vec(),
        }
    }

    /// Get as float.
    pub fn as_float(&self) -> f32 {
        match self {
            ParamValue::Float(v) => *v,
            _ => 0.0,
        }
    }

    /// Get as vec2, dropping or zero-filling components.
    pub fn as_vec2(&self) -> [f32; 2] {
        let v = self.as_vec4();
        [v[0], v[1]]
    }

    /// Get as vec4, padding smaller types.
    pub fn as_vec4(&self) -> [f32; 4] {
        match self {
            ParamValue::Float(v) => [*v, 0.0, 0.0, 0.0],
            ParamValue::Vec2(v) => [v[0], v[1], 0.0, 0.0],
            ParamValue::Vec3(v) => [v[0], v[1], v[2], 0.0],
            ParamValue::Vec4(v) => *v,
        }
    }
}

impl From<glam::Vec2> for ParamValue {
    fn from(v: glam::Vec2) -> Self {
        ParamValue::Vec2(v.to_array())
    }
}

/// Auxiliary textures sampled by some post-processes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PostProcessMap {
    Noise,
    Burn,
    Distort,
}

impl PostProcessMap {
    pub const ALL: [PostProcessMap; 3] = [PostProcessMap::Noise, PostProcessMap::Burn, PostProcessMap::Distort];

    /// File name the map is loaded from inside the media folder.
    pub fn file_name(self) -> &'static str {
        match self {
            PostProcessMap::Noise => "Noise.png",
            PostProcessMap::Burn => "Burn.png",
            PostProcessMap::Distort => "Distort.png",
        }
    }
}

/// What a texture variable is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureInput {
    /// Nothing bound.
    Unbound,
    /// The captured scene image.
    SceneCapture,
    /// One of the auxiliary maps.
    Map(PostProcessMap),
}

/// Receiver of shader variable values for the next draw.
pub trait ParameterSink {
    fn set_value(&mut self, var: ShaderVar, value: ParamValue);
    fn set_texture(&mut self, var: ShaderVar, texture: TextureInput);
}

/// CPU-side record of every variable set for a pass.
///
/// Backends translate the block into whatever their pipeline consumes
/// (a uniform buffer and bind-group choice for wgpu).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterBlock {
    values: HashMap<ShaderVar, ParamValue>,
    textures: HashMap<ShaderVar, TextureInput>,
}

impl ParameterBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, var: ShaderVar) -> Option<ParamValue> {
        self.values.get(&var).copied()
    }

    /// Scalar value, zero when unset.
    pub fn float(&self, var: ShaderVar) -> f32 {
        self.value(var).map(|v| v.as_float()).unwrap_or(0.0)
    }

    pub fn texture(&self, var: ShaderVar) -> TextureInput {
        self.textures.get(&var).copied().unwrap_or(TextureInput::Unbound)
    }

    /// Remove every value and texture binding.
    pub fn clear(&mut self) {
        self.values.clear();
        self.textures.clear();
    }
}

impl ParameterSink for ParameterBlock {
    fn set_value(&mut self, var: ShaderVar, value: ParamValue) {
        self.values.insert(var, value);
    }

    fn set_texture(&mut self, var: ShaderVar, texture: TextureInput) {
        self.textures.insert(var, texture);
    }
}

/// Opaque handle to a compiled technique.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TechniqueHandle(pub usize);

/// A compiled shader library that techniques and variables are looked up in.
pub trait ShaderLibrary {
    fn technique_by_name(&self, name: &str) -> Option<TechniqueHandle>;
    fn has_variable(&self, name: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_var_names_unique() {
        let mut names: Vec<_> = ShaderVar::ALL.iter().map(|v| v.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ShaderVar::ALL.len());
    }

    #[test]
    fn test_param_value_bytes() {
        assert_eq!(ParamValue::Float(1.0).to_bytes().len(), 4);
        assert_eq!(ParamValue::Vec3([1.0, 2.0, 3.0]).to_bytes().len(), 12);
        assert_eq!(ParamValue::Vec2([1.0, 2.0]).as_vec4(), [1.0, 2.0, 0.0, 0.0]);
        assert_eq!(ParamValue::Vec3([1.0, 2.0, 3.0]).as_vec2(), [1.0, 2.0]);
    }

    #[test]
    fn test_parameter_block_records_last_write() {
        let mut block = ParameterBlock::new();
        block.set_value(ShaderVar::BurnLevel, ParamValue::Float(0.25));
        block.set_value(ShaderVar::BurnLevel, ParamValue::Float(0.5));
        block.set_texture(ShaderVar::PostProcessMap, TextureInput::Map(PostProcessMap::Burn));
        assert_eq!(block.float(ShaderVar::BurnLevel), 0.5);
        assert_eq!(block.texture(ShaderVar::PostProcessMap), TextureInput::Map(PostProcessMap::Burn));
        assert_eq!(block.texture(ShaderVar::SceneTexture), TextureInput::Unbound);

        block.clear();
        assert_eq!(block.value(ShaderVar::BurnLevel), None);
    }
}

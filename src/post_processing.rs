//! Post-process kinds and the effect catalog.
//!
//! Every post-process is described once, in [`EFFECT_TABLE`]: the technique
//! it renders with, the auxiliary map it samples, and the functions that
//! advance and apply its parameters. The catalog resolves the technique names
//! against the compiled shader library at startup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::effect_params::{self, EffectParams, PassContext};
use crate::render_job::{RenderError, RenderPhase};
use crate::shading::{ParameterSink, PostProcessMap, ShaderLibrary, ShaderVar, TechniqueHandle};

/// The closed set of post-processes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostProcessKind {
    #[default]
    Copy,
    Tint,
    GreyNoise,
    Burn,
    Distort,
    Spiral,
    HeatHaze,
    GaussianBlur,
    Ripple,
    Shockwave,
}

impl PostProcessKind {
    pub const COUNT: usize = 10;

    pub const ALL: [PostProcessKind; Self::COUNT] = [
        PostProcessKind::Copy,
        PostProcessKind::Tint,
        PostProcessKind::GreyNoise,
        PostProcessKind::Burn,
        PostProcessKind::Distort,
        PostProcessKind::Spiral,
        PostProcessKind::HeatHaze,
        PostProcessKind::GaussianBlur,
        PostProcessKind::Ripple,
        PostProcessKind::Shockwave,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The static description of this kind.
    pub fn entry(self) -> &'static EffectEntry {
        &EFFECT_TABLE[self.index()]
    }

    /// Name of the technique in the shader library.
    pub fn technique_name(self) -> &'static str {
        self.entry().technique_name
    }

    /// Human readable name.
    pub fn label(self) -> &'static str {
        self.entry().label
    }

    /// Auxiliary map sampled through `PostProcessMap`, if any.
    pub fn map(self) -> Option<PostProcessMap> {
        self.entry().map
    }
}

impl fmt::Display for PostProcessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for PostProcessKind {
    type Err = String;

    /// Accepts the variant name, the label or the technique name, ignoring
    /// case, spaces and underscores ("grey_noise", "Grey Noise", "PPGreyNoise").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        let wanted = wanted.strip_prefix("pp").unwrap_or(&wanted);

        PostProcessKind::ALL
            .iter()
            .copied()
            .find(|kind| {
                let label: String = kind.label().chars().filter(|c| !c.is_whitespace()).collect();
                label.to_lowercase() == wanted
            })
            .ok_or_else(|| format!("Unknown post-process: {}", s))
    }
}

/// Advances a kind's time-driven state by `dt` seconds.
pub type AdvanceFn = fn(&mut EffectParams, f32);

/// Pushes a kind's current values to the shading stage.
pub type ApplyFn = fn(&mut EffectParams, &PassContext, &mut dyn ParameterSink);

/// Static description of one post-process.
pub struct EffectEntry {
    pub kind: PostProcessKind,
    pub technique_name: &'static str,
    pub label: &'static str,
    pub map: Option<PostProcessMap>,
    pub advance: AdvanceFn,
    pub apply: ApplyFn,
}

/// One entry per kind, in enum order.
pub static EFFECT_TABLE: [EffectEntry; PostProcessKind::COUNT] = [
    EffectEntry {
        kind: PostProcessKind::Copy,
        technique_name: "PPCopy",
        label: "Copy",
        map: None,
        advance: effect_params::advance_none,
        apply: effect_params::apply_none,
    },
    EffectEntry {
        kind: PostProcessKind::Tint,
        technique_name: "PPTint",
        label: "Tint",
        map: None,
        advance: effect_params::advance_tint,
        apply: effect_params::apply_tint,
    },
    EffectEntry {
        kind: PostProcessKind::GreyNoise,
        technique_name: "PPGreyNoise",
        label: "Grey Noise",
        map: Some(PostProcessMap::Noise),
        advance: effect_params::advance_none,
        apply: effect_params::apply_grey_noise,
    },
    EffectEntry {
        kind: PostProcessKind::Burn,
        technique_name: "PPBurn",
        label: "Burn",
        map: Some(PostProcessMap::Burn),
        advance: effect_params::advance_burn,
        apply: effect_params::apply_burn,
    },
    EffectEntry {
        kind: PostProcessKind::Distort,
        technique_name: "PPDistort",
        label: "Distort",
        map: Some(PostProcessMap::Distort),
        advance: effect_params::advance_none,
        apply: effect_params::apply_distort,
    },
    EffectEntry {
        kind: PostProcessKind::Spiral,
        technique_name: "PPSpiral",
        label: "Spiral",
        map: None,
        advance: effect_params::advance_spiral,
        apply: effect_params::apply_spiral,
    },
    EffectEntry {
        kind: PostProcessKind::HeatHaze,
        technique_name: "PPHeatHaze",
        label: "Heat Haze",
        map: None,
        advance: effect_params::advance_heat_haze,
        apply: effect_params::apply_heat_haze,
    },
    EffectEntry {
        kind: PostProcessKind::GaussianBlur,
        technique_name: "PPGaussianBlur",
        label: "Gaussian Blur",
        map: None,
        advance: effect_params::advance_none,
        apply: effect_params::apply_none,
    },
    EffectEntry {
        kind: PostProcessKind::Ripple,
        technique_name: "PPRipple",
        label: "Ripple",
        map: None,
        advance: effect_params::advance_ripple,
        apply: effect_params::apply_ripple,
    },
    EffectEntry {
        kind: PostProcessKind::Shockwave,
        technique_name: "PPShockwave",
        label: "Shockwave",
        map: None,
        advance: effect_params::advance_shockwave,
        apply: effect_params::apply_shockwave,
    },
];

/// Techniques resolved from the shader library, one per kind.
#[derive(Clone, Debug)]
pub struct EffectCatalog {
    techniques: [TechniqueHandle; PostProcessKind::COUNT],
}

impl EffectCatalog {
    /// Look up every technique and shader variable by name.
    ///
    /// Any missing name is a configuration error: the set of names is fixed,
    /// so a library that lacks one cannot run any frame correctly.
    pub fn resolve(library: &impl ShaderLibrary) -> Result<Self, RenderError> {
        for var in ShaderVar::ALL {
            if !library.has_variable(var.name()) {
                return Err(RenderError::new(
                    RenderPhase::BindingLookup,
                    format!("Shader variable '{}' not found in post-process library", var.name()),
                ));
            }
        }

        let mut techniques = [TechniqueHandle(0); PostProcessKind::COUNT];
        for kind in PostProcessKind::ALL {
            let name = kind.technique_name();
            techniques[kind.index()] = library.technique_by_name(name).ok_or_else(|| {
                RenderError::new(
                    RenderPhase::BindingLookup,
                    format!("Technique '{}' not found in post-process library", name),
                )
            })?;
            log::debug!("Resolved technique {} -> {:?}", name, techniques[kind.index()]);
        }

        Ok(Self { techniques })
    }

    pub fn technique(&self, kind: PostProcessKind) -> TechniqueHandle {
        self.techniques[kind.index()]
    }
}

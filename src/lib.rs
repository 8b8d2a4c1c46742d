pub mod gpu;
pub mod input;
pub mod cli;
pub mod config;
pub mod render_job;

// Post-process core
pub mod area;
pub mod capture;
pub mod colour;
pub mod effect_params;
pub mod passes;
pub mod post_processing;
pub mod shading;
pub mod state;

// Scene and presentation
pub mod camera;
pub mod maps;
pub mod overlay;
pub mod scene;

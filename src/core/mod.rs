pub mod settings;
pub mod classifier;
pub mod model_manager;
pub mod inference;
pub mod confidence_gate;
pub mod sequence;
pub mod camera;
pub mod session;

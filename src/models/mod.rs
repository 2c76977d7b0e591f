pub mod frame;
pub mod model;
pub mod pose;

pub mod admission_gate;
pub mod resource_governor;

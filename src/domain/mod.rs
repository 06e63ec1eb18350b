pub mod calcul;
pub mod workflow;

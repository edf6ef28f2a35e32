pub mod plan;
pub mod variable;

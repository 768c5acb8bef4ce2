pub mod bounding_box;
pub mod station;
pub mod variable;

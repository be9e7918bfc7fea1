pub mod draft;
pub mod sections;

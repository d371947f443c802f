pub mod annotations;
pub mod text;

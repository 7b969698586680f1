pub mod engagement;
pub mod video;

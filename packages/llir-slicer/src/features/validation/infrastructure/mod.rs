mod sdg_validator;

pub use sdg_validator::SdgValidator;

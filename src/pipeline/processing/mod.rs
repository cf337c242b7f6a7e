// Processing stages, in pipeline order: normalize, validate, resolve, facts,
// quality.

pub mod facts;
pub mod normalize;
pub mod quality;
pub mod resolve;
pub mod validate;

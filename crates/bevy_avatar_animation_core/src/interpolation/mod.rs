pub mod easing;
pub mod linear;

pub use easing::ease_in_out_cubic;
pub use linear::InterpolateLinear;

pub mod fog;
pub mod movement;
pub mod rules;

pub use fog::*;
pub use movement::*;
pub use rules::*;

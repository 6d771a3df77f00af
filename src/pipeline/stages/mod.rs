pub mod stage0;
pub mod stage1;
pub mod stage2;

pub use stage0::*;
pub use stage1::*;
pub use stage2::*;

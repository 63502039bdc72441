pub mod button;
pub mod input;
pub mod label;
pub mod panels;
pub mod spinner;

pub use button::*;
pub use input::*;
pub use label::*;
pub use panels::*;
pub use spinner::*;

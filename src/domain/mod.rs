mod appointment;
mod clock;
mod slot;
mod validation;

pub use appointment::*;
pub use clock::*;
pub use slot::*;
pub use validation::*;

pub mod account;
pub mod appointment;
pub mod audit;
pub mod enums;
pub mod filters;
pub mod patient;
pub mod payment;
pub mod report;

pub use account::*;
pub use appointment::*;
pub use audit::*;
pub use filters::*;
pub use patient::*;
pub use payment::*;
pub use report::*;

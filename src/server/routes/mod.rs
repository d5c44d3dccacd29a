pub mod console;
pub mod patients;
pub mod system;

pub mod console;
pub mod driver;
pub mod interrupt;
pub mod login;
pub mod runner;
pub mod schedule;
pub mod script;
pub mod session;
pub mod types;

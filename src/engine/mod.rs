pub mod capture;
pub mod expect;
pub mod session;

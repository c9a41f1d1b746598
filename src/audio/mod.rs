pub mod bands;
pub mod capture;
pub mod spectrum;

pub mod check;
pub mod export;
pub mod options;
pub mod plan;

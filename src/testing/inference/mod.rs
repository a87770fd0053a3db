pub mod nonparametric;

pub use nonparametric::mann_whitney;

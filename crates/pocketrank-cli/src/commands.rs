pub mod preprocess;
pub mod train;

pub mod ops_compile;
pub mod output;

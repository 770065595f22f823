pub mod carbon_calculator;
pub mod cost_calculator;
pub mod runtime_calculator;

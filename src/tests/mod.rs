mod families_tests;
mod model_tests;
mod utils;

pub mod results;
pub mod spinner;

pub use results::{print_greeting, print_search_hits};
pub use spinner::{Spinner, with_spinner};

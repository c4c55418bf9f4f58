pub mod menu;
pub mod search;
pub mod token;
pub mod whoami;

pub use menu::run_main_menu;
pub use search::search_graph;
pub use token::display_access_token;
pub use whoami::greet_user;

pub mod api;
pub mod catalog;
pub mod cli;
pub mod import;
pub mod logging;

pub mod util {
    pub mod db;
    pub mod env;
}

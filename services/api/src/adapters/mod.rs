pub mod db;
pub mod rxnav;

pub use db::DbAdapter;
pub use rxnav::RxNavAdapter;

pub mod compare;
pub mod search;
pub mod setup;
pub mod simulate;
pub mod ui;
